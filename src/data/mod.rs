/// Data layer: core types, loading, derivation and filtering.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Vec<RawOrder>   (memoized by DatasetCache)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive  │  dates, revenue, calendar fields → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  FilterSpec predicates → View (row indices)
///   └──────────┘
/// ```

pub mod derive;
pub mod filter;
pub mod loader;
pub mod model;
