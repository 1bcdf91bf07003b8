//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::data::filter::{DateRange, FilterSpec};
use crate::report::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Retail order analytics: KPIs, cohort retention and RFM segments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Order dataset (.csv, .parquet or .json)
    pub input: PathBuf,

    /// First order date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Keep only these regions (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Keep only these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Keep only these order statuses (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// JSON file holding a filter specification; flags above override it
    #[arg(long)]
    pub filters: Option<PathBuf>,

    /// Report sections to print
    #[arg(long = "section", value_enum, default_values_t = [Section::Kpis])]
    pub sections: Vec<Section>,

    /// Output format; `json` prints the whole report regardless of sections
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Also write every printed table as Parquet into this directory
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Number of products in the top-products table
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// List the distinct values of a column instead of reporting
    #[arg(long)]
    pub distinct: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the filter specification from `--filters` and the per-dimension flags.
    pub fn filter_spec(&self) -> Result<FilterSpec> {
        let mut spec = match &self.filters {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading filter file {}", path.display()))?;
                serde_json::from_str::<FilterSpec>(&text)
                    .with_context(|| format!("parsing filter file {}", path.display()))?
            }
            None => FilterSpec::default(),
        };

        if self.start.is_some() || self.end.is_some() {
            let current = spec.date_range.unwrap_or_default();
            spec.date_range = Some(DateRange {
                start: self.start.or(current.start),
                end: self.end.or(current.end),
            });
        }
        if !self.regions.is_empty() {
            spec = spec.with_regions(self.regions.iter().cloned());
        }
        if !self.categories.is_empty() {
            spec = spec.with_categories(self.categories.iter().cloned());
        }
        if !self.statuses.is_empty() {
            spec = spec.with_statuses(self.statuses.iter().cloned());
        }
        Ok(spec)
    }
}
