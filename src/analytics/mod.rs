/// Aggregations over a filtered [`View`](crate::data::filter::View).
///
/// Every function here is a pure, infallible computation: an empty view
/// yields zeros or empty sequences, never an error.
///
/// ```text
///   View ──┬──▶ kpi        headline metrics
///          ├──▶ cohort     retention by signup month
///          ├──▶ rfm        recency / frequency / monetary segments
///          ├──▶ breakdown  revenue and status by dimension
///          ├──▶ temporal   monthly and day/hour patterns
///          └──▶ customers  purchase frequency and gaps
/// ```

pub mod breakdown;
pub mod cohort;
pub mod customers;
pub mod kpi;
pub mod rfm;
pub mod temporal;
