use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::derive::derive_dataset;
use super::model::{Column, Dataset, RawOrder};
use crate::error::DataLoadError;

type Result<T> = std::result::Result<T, DataLoadError>;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and derive an order dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the schema column names
/// * `.parquet` – one column per schema field (text or numeric types)
/// * `.json`    – `[{ "order_id": ..., "cust_id": ..., ... }, ...]`
///
/// Every call re-reads the source; use [`DatasetCache`] to memoize.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let started = Instant::now();
    let rows = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => return Err(DataLoadError::UnsupportedFormat(other.to_string())),
    };
    let dataset = derive_dataset(rows);

    info!(
        "loaded {} order lines from {} in {:.1?}",
        dataset.len(),
        path.display(),
        started.elapsed()
    );
    Ok(dataset)
}

/// Identity of a data source: its canonical absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(PathBuf);

impl SourceId {
    pub fn resolve(path: &Path) -> Result<Self> {
        path.canonicalize()
            .map(SourceId)
            .map_err(|source| DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Memoizes loaded datasets by [`SourceId`].
///
/// There is no invalidation: a changed file must be loaded under a new identity.
#[derive(Debug, Default)]
pub struct DatasetCache {
    loaded: HashMap<SourceId, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, reading it on first use only.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Dataset>> {
        let id = SourceId::resolve(path)?;
        if let Some(dataset) = self.loaded.get(&id) {
            debug!("dataset cache hit for {}", id.path().display());
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(load_file(id.path())?);
        self.loaded.insert(id, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Number of distinct sources loaded so far.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Header → schema mapping, shared by all formats
// ---------------------------------------------------------------------------

/// Position of each schema column within a source row.
struct ColumnMap {
    positions: HashMap<Column, usize>,
}

impl ColumnMap {
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let mut positions = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(column) = Column::RAW.iter().find(|c| c.name() == header.as_ref().trim()) {
                positions.entry(*column).or_insert(idx);
            }
        }

        let missing: Vec<String> = Column::RAW
            .iter()
            .filter(|c| !c.is_optional() && !positions.contains_key(*c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DataLoadError::MissingColumns(missing));
        }
        if !positions.contains_key(&Column::CustomerSince) {
            warn!("source has no 'Customer Since' column; cohort months will be missing");
        }
        Ok(ColumnMap { positions })
    }

    /// Build a [`RawOrder`] from one row of cells (`None` = null).
    fn read_row(&self, cells: &[Option<String>], row: usize) -> Result<RawOrder> {
        let text = |column: Column| -> Option<String> {
            let idx = *self.positions.get(&column)?;
            cells
                .get(idx)?
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |column: Column| -> Result<Option<f64>> {
            match text(column) {
                None => Ok(None),
                Some(s) => s.parse::<f64>().map(Some).map_err(|_| DataLoadError::InvalidNumber {
                    row,
                    column: column.name().to_string(),
                    value: s,
                }),
            }
        };

        Ok(RawOrder {
            order_id: text(Column::OrderId),
            cust_id: text(Column::CustId),
            sku: text(Column::Sku),
            category: text(Column::Category),
            status: text(Column::Status),
            payment_method: text(Column::PaymentMethod),
            region: text(Column::Region),
            gender: text(Column::Gender),
            age: number(Column::Age)?,
            qty_ordered: number(Column::QtyOrdered)?.unwrap_or(0.0),
            price: number(Column::Price)?.unwrap_or(0.0),
            discount_amount: number(Column::DiscountAmount)?.unwrap_or(0.0),
            order_date: text(Column::OrderDate),
            customer_since: text(Column::CustomerSince),
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<RawOrder>> {
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file)
}

/// Parse CSV text from any reader. Extra columns are ignored.
pub fn read_csv<R: std::io::Read>(input: R) -> Result<Vec<RawOrder>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let cells: Vec<Option<String>> = record.iter().map(|c| Some(c.to_string())).collect();
        rows.push(columns.read_row(&cells, row_no)?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "order_id": 100354678, "cust_id": 60124, "order_date": "1-10-2020", ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<RawOrder>> {
    let text = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<Vec<RawOrder>> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root
        .as_array()
        .ok_or_else(|| DataLoadError::Malformed("expected top-level JSON array".into()))?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let mut objects = Vec::with_capacity(records.len());
    let mut keys: Vec<&str> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataLoadError::Malformed(format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
        objects.push(obj);
    }

    let columns = ColumnMap::from_headers(&keys)?;
    objects
        .iter()
        .enumerate()
        .map(|(row, obj)| {
            let cells: Vec<Option<String>> = keys
                .iter()
                .map(|key| obj.get(*key).and_then(json_to_text))
                .collect();
            columns.read_row(&cells, row)
        })
        .collect()
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of order lines.
///
/// Each schema field is a flat column. Text columns may be `Utf8` or
/// `LargeUtf8`; numeric columns any integer or float type. Dates are text in
/// the same layouts as the CSV.
fn load_parquet(path: &Path) -> Result<Vec<RawOrder>> {
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let columns = ColumnMap::from_headers(&headers)?;
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect::<Result<Vec<_>>>()?;
            let row_no = rows.len();
            rows.push(columns.read_row(&cells, row_no)?);
        }
    }
    Ok(rows)
}

/// Extract a single cell from an Arrow column as text.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let text = match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|s| s.value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| a.value(row).to_string()),
        _ => None,
    };
    match text {
        Some(t) => Ok(Some(t)),
        None => Ok(Some(array_value_to_string(col.as_ref(), row)?)),
    }
}
