//! Recency / frequency / monetary values and rule-based customer segments.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::data::filter::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Segment {
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Low Value")]
    LowValue,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Segment::HighValue => "High Value",
            Segment::AtRisk => "At Risk",
            Segment::New => "New",
            Segment::LowValue => "Low Value",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Days without an order after which a repeat customer is at risk.
pub const AT_RISK_RECENCY_DAYS: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRow {
    pub cust_id: String,
    /// Days from the view's latest order to this customer's latest order.
    /// `None` when either date is unknown.
    pub recency_days: Option<i64>,
    pub frequency: usize,
    pub monetary: f64,
    pub segment: Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Default)]
struct CustomerAcc<'a> {
    latest: Option<NaiveDateTime>,
    orders: HashSet<&'a str>,
    monetary: f64,
}

/// Median of `values`; mean of the middle pair for even counts, 0 when empty.
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Quantile `q` in `[0, 1]` with linear interpolation between closest ranks,
/// 0 when empty.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Assign a segment. Rules are applied in order and a later match overwrites
/// an earlier one.
pub fn segment_for(
    recency_days: Option<i64>,
    frequency: usize,
    monetary: f64,
    median_monetary: f64,
) -> Segment {
    let mut segment = Segment::LowValue;
    if frequency >= 3 && monetary >= median_monetary {
        segment = Segment::HighValue;
    }
    if recency_days.is_some_and(|d| d > AT_RISK_RECENCY_DAYS) && frequency >= 2 {
        segment = Segment::AtRisk;
    }
    if frequency == 1 {
        segment = Segment::New;
    }
    segment
}

/// One row per distinct customer in the view, sorted by `cust_id`.
///
/// Recency is measured against the latest `order_date` in the view, and the
/// high-value threshold is the median monetary value of this population.
pub fn compute(view: &View<'_>) -> Vec<RfmRow> {
    let reference = view.rows().filter_map(|r| r.order_date).max();

    let mut customers: BTreeMap<&str, CustomerAcc> = BTreeMap::new();
    for row in view.rows() {
        let Some(cust) = row.cust_id() else {
            continue;
        };
        let acc = customers.entry(cust).or_default();
        acc.monetary += row.revenue;
        if let Some(id) = row.order_id() {
            acc.orders.insert(id);
        }
        if let Some(date) = row.order_date {
            acc.latest = Some(acc.latest.map_or(date, |d| d.max(date)));
        }
    }

    let monetary: Vec<f64> = customers.values().map(|c| c.monetary).collect();
    let median_monetary = median(&monetary);

    customers
        .into_iter()
        .map(|(cust, acc)| {
            let recency_days = match (reference, acc.latest) {
                (Some(reference), Some(latest)) => Some((reference - latest).num_days()),
                _ => None,
            };
            let frequency = acc.orders.len();
            RfmRow {
                cust_id: cust.to_string(),
                recency_days,
                frequency,
                monetary: acc.monetary,
                segment: segment_for(recency_days, frequency, acc.monetary, median_monetary),
            }
        })
        .collect()
}

/// Monetary distribution per segment, enough to draw a box per segment.
pub fn segment_summary(rows: &[RfmRow]) -> Vec<SegmentSummary> {
    let mut by_segment: BTreeMap<Segment, Vec<f64>> = BTreeMap::new();
    for row in rows {
        by_segment.entry(row.segment).or_default().push(row.monetary);
    }
    by_segment
        .into_iter()
        .map(|(segment, values)| SegmentSummary {
            segment,
            customers: values.len(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            q1: quantile(&values, 0.25),
            median: median(&values),
            q3: quantile(&values, 0.75),
            mean: values.iter().sum::<f64>() / values.len() as f64,
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}
