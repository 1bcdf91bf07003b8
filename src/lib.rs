//! Rusty Cohort: descriptive analytics over a retail order dataset.
//!
//! Load once, filter per query, and aggregate into KPIs, cohort retention,
//! RFM segments and operational breakdowns. Presentation is left to callers
//! of the [`query`] interface.

pub mod analytics;
pub mod cli;
pub mod data;
pub mod error;
pub mod query;
pub mod report;

pub use data::filter::{DateRange, FilterSpec, View};
pub use data::loader::{load_file, DatasetCache};
pub use data::model::{CellValue, Column, Dataset, Order, YearMonth};
pub use error::{DataLoadError, DateParseWarning};
pub use query::{
    apply_filters, compute_cohort, compute_kpis, compute_rfm, list_distinct_values, load, Report,
};
