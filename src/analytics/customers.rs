use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::rfm::median;
use crate::data::filter::View;

/// Number of equal-width bins in the age histogram.
pub const AGE_BINS: usize = 15;

/// How many customers placed each number of distinct orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchaseFrequency {
    /// `(order_count, customers)` ascending by order count.
    pub histogram: Vec<(usize, usize)>,
    pub mean_orders: f64,
}

/// Day gaps between successive purchase dates of repeat customers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchaseGaps {
    pub gaps_days: Vec<i64>,
    pub median_days: Option<f64>,
    pub mean_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBin {
    pub lower: f64,
    pub upper: f64,
    pub gender: Option<String>,
    pub customers: usize,
}

/// Customer counts per age bin and gender. Only non-empty bins are listed,
/// ordered by bin then gender.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeDistribution {
    pub bins: Vec<AgeBin>,
    /// Customers with a known age.
    pub customers: usize,
}

/// Each customer's distinct order ids.
fn customer_orders<'a>(view: &View<'a>) -> BTreeMap<&'a str, HashSet<&'a str>> {
    let mut customers: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(cust), Some(order)) = (row.cust_id(), row.order_id()) {
            customers.entry(cust).or_default().insert(order);
        }
    }
    customers
}

pub fn purchase_frequency(view: &View<'_>) -> PurchaseFrequency {
    let customers = customer_orders(view);
    if customers.is_empty() {
        return PurchaseFrequency::default();
    }

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    let mut total_orders = 0;
    for orders in customers.values() {
        *histogram.entry(orders.len()).or_default() += 1;
        total_orders += orders.len();
    }
    PurchaseFrequency {
        histogram: histogram.into_iter().collect(),
        mean_orders: total_orders as f64 / customers.len() as f64,
    }
}

/// Gaps between a customer's line-item dates in date order. Every dated line
/// counts, so the lines of one order produce 0-day gaps. Undated lines are
/// skipped; customers with fewer than two dated lines contribute none.
pub fn time_between_purchases(view: &View<'_>) -> PurchaseGaps {
    let mut dates: BTreeMap<&str, Vec<NaiveDateTime>> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(cust), Some(date)) = (row.cust_id(), row.order_date) {
            dates.entry(cust).or_default().push(date);
        }
    }

    let mut gaps_days = Vec::new();
    for mut customer in dates.into_values() {
        customer.sort();
        gaps_days.extend(customer.windows(2).map(|w| (w[1] - w[0]).num_days()));
    }

    if gaps_days.is_empty() {
        return PurchaseGaps::default();
    }
    let as_f64: Vec<f64> = gaps_days.iter().map(|&d| d as f64).collect();
    PurchaseGaps {
        median_days: Some(median(&as_f64)),
        mean_days: Some(as_f64.iter().sum::<f64>() / as_f64.len() as f64),
        gaps_days,
    }
}

/// Age histogram of distinct customers split by gender.
///
/// Each customer contributes their first non-null `age` and `Gender` in view
/// order; customers without an age are left out. Bins span the observed age
/// range, with the last bin closed on both ends.
pub fn age_distribution(view: &View<'_>) -> AgeDistribution {
    let mut customers: BTreeMap<&str, (Option<f64>, Option<&str>)> = BTreeMap::new();
    for row in view.rows() {
        let Some(cust) = row.cust_id() else {
            continue;
        };
        let (age, gender) = customers.entry(cust).or_default();
        *age = age.or(row.raw.age);
        *gender = gender.or(row.raw.gender.as_deref());
    }

    let known: Vec<(f64, Option<&str>)> = customers
        .into_values()
        .filter_map(|(age, gender)| age.map(|a| (a, gender)))
        .collect();
    if known.is_empty() {
        return AgeDistribution::default();
    }

    let mut lo = known.iter().map(|(a, _)| *a).fold(f64::INFINITY, f64::min);
    let mut hi = known.iter().map(|(a, _)| *a).fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / AGE_BINS as f64;

    let mut counts: BTreeMap<(usize, Option<&str>), usize> = BTreeMap::new();
    for &(age, gender) in &known {
        let bin = (((age - lo) / width) as usize).min(AGE_BINS - 1);
        *counts.entry((bin, gender)).or_default() += 1;
    }

    AgeDistribution {
        bins: counts
            .into_iter()
            .map(|((bin, gender), customers)| AgeBin {
                lower: lo + bin as f64 * width,
                upper: lo + (bin + 1) as f64 * width,
                gender: gender.map(str::to_string),
                customers,
            })
            .collect(),
        customers: known.len(),
    }
}
