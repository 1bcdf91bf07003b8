use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Fatal load errors
// ---------------------------------------------------------------------------

/// Failure to construct a [`Dataset`](crate::data::model::Dataset) from a source.
///
/// Only structural problems end up here. Individual bad dates are recovered
/// as [`DateParseWarning`]s and empty views are valid, empty results.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("malformed Parquet file: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: column '{column}' holds non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("{0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Recoverable date problems
// ---------------------------------------------------------------------------

/// A date cell that could not be parsed and was nulled instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParseWarning {
    /// Zero-based data row (header excluded).
    pub row: usize,
    pub column: String,
    pub value: String,
}

impl fmt::Display for DateParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: unparsable {} '{}' treated as missing",
            self.row, self.column, self.value
        )
    }
}
