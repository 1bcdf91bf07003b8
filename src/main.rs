use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use rusty_cohort::cli::{Args, OutputFormat};
use rusty_cohort::report::{export_parquet, render_tables, section_batches, Section};
use rusty_cohort::{list_distinct_values, load, Column, DatasetCache, Report};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let mut cache = DatasetCache::new();
    let dataset = load(&mut cache, &args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    if let Some(name) = &args.distinct {
        let column: Column = name.parse().map_err(anyhow::Error::msg)?;
        for value in list_distinct_values(&dataset, column) {
            println!("{value}");
        }
        return Ok(());
    }

    let spec = args.filter_spec()?;
    let report = Report::build(&dataset, &spec, args.top);
    info!("{} of {} order lines pass the filters", report.rows, dataset.len());

    let sections = if args.sections.contains(&Section::All) {
        vec![Section::All]
    } else {
        args.sections.clone()
    };
    let mut batches = Vec::new();
    for section in sections {
        batches.extend(section_batches(&report, section).context("building result tables")?);
    }

    match args.format {
        OutputFormat::Table => print!("{}", render_tables(&batches)?),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?)
        }
    }

    if let Some(dir) = &args.export {
        export_parquet(dir, &batches)?;
    }
    Ok(())
}
