//! Cohort retention: customers grouped by signup month, followed across
//! the months in which they ordered.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::data::filter::View;
use crate::data::model::YearMonth;

/// Retention of one cohort in one observed order month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub cohort_month: YearMonth,
    pub order_month: YearMonth,
    /// Months from signup to order; negative when an order predates signup.
    pub cohort_age: i32,
    pub distinct_customers: usize,
    pub cohort_size: usize,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSize {
    pub cohort_month: YearMonth,
    pub customers: usize,
}

/// Mean retention across cohorts at one cohort age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionPoint {
    pub cohort_age: i32,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two cohorts.
    pub std_dev: Option<f64>,
    pub cohorts: usize,
}

fn cohort_members<'a>(view: &View<'a>) -> BTreeMap<YearMonth, HashSet<&'a str>> {
    let mut members: BTreeMap<YearMonth, HashSet<&'a str>> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(cohort), Some(cust)) = (row.cohort_month, row.cust_id()) {
            members.entry(cohort).or_default().insert(cust);
        }
    }
    members
}

/// One row per observed `(cohort_month, order_month)` pair, sorted by both.
///
/// Rows lacking a cohort month or an order month take no part in grouping.
/// Missing ages are absent, not zero-filled.
pub fn compute(view: &View<'_>) -> Vec<CohortRow> {
    let sizes = cohort_members(view);

    let mut groups: BTreeMap<(YearMonth, YearMonth), HashSet<&str>> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(cohort), Some(month), Some(cust)) =
            (row.cohort_month, row.order_month, row.cust_id())
        {
            groups.entry((cohort, month)).or_default().insert(cust);
        }
    }

    groups
        .into_iter()
        .map(|((cohort_month, order_month), customers)| {
            let cohort_size = sizes.get(&cohort_month).map_or(0, HashSet::len);
            let distinct_customers = customers.len();
            CohortRow {
                cohort_month,
                order_month,
                cohort_age: order_month.months_since(cohort_month),
                distinct_customers,
                cohort_size,
                retention_rate: 100.0 * super::kpi::ratio(distinct_customers as f64, cohort_size),
            }
        })
        .collect()
}

/// Distinct customers per cohort, chronologically.
pub fn cohort_sizes(view: &View<'_>) -> Vec<CohortSize> {
    cohort_members(view)
        .into_iter()
        .map(|(cohort_month, members)| CohortSize {
            cohort_month,
            customers: members.len(),
        })
        .collect()
}

/// Average retention curve over the sparse cohort rows.
pub fn average_retention(rows: &[CohortRow]) -> Vec<RetentionPoint> {
    let mut by_age: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for row in rows {
        by_age.entry(row.cohort_age).or_default().push(row.retention_rate);
    }

    by_age
        .into_iter()
        .map(|(cohort_age, rates)| {
            let n = rates.len();
            let mean = rates.iter().sum::<f64>() / n as f64;
            let std_dev = (n > 1).then(|| {
                let var = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                var.sqrt()
            });
            RetentionPoint {
                cohort_age,
                mean,
                std_dev,
                cohorts: n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_dataset;
    use crate::data::model::{Dataset, RawOrder};

    fn line(cust: &str, order: &str, date: &str, since: Option<&str>) -> RawOrder {
        RawOrder {
            order_id: Some(order.into()),
            cust_id: Some(cust.into()),
            qty_ordered: 1.0,
            price: 10.0,
            order_date: Some(date.into()),
            customer_since: since.map(Into::into),
            ..RawOrder::default()
        }
    }

    fn dataset() -> Dataset {
        derive_dataset(vec![
            // January cohort: A and B order in January, only A in March
            line("A", "1", "05-01-2021", Some("1/2/2021")),
            line("A", "1", "05-01-2021", Some("1/2/2021")),
            line("B", "2", "20-01-2021", Some("1/15/2021")),
            line("A", "3", "02-03-2021", Some("1/2/2021")),
            // February cohort: C orders in February
            line("C", "4", "11-02-2021", Some("2/10/2021")),
        ])
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m)
    }

    #[test]
    fn sparse_rows_with_shared_denominator() {
        let ds = dataset();
        let rows = compute(&View::all(&ds));
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].cohort_month, ym(2021, 1));
        assert_eq!(rows[0].cohort_age, 0);
        assert_eq!(rows[0].distinct_customers, 2);
        assert_eq!(rows[0].cohort_size, 2);
        assert_eq!(rows[0].retention_rate, 100.0);

        // Age 1 of the January cohort is absent, not zero.
        assert_eq!(rows[1].order_month, ym(2021, 3));
        assert_eq!(rows[1].cohort_age, 2);
        assert_eq!(rows[1].distinct_customers, 1);
        assert_eq!(rows[1].cohort_size, 2);
        assert_eq!(rows[1].retention_rate, 50.0);

        assert_eq!(rows[2].cohort_month, ym(2021, 2));
        assert_eq!(rows[2].retention_rate, 100.0);
    }

    #[test]
    fn first_month_retention_is_full() {
        let ds = dataset();
        for row in compute(&View::all(&ds)).iter().filter(|r| r.cohort_age == 0) {
            assert_eq!(row.retention_rate, 100.0);
        }
    }

    #[test]
    fn orders_before_signup_keep_negative_age() {
        let ds = derive_dataset(vec![line("A", "1", "10-11-2020", Some("1/5/2021"))]);
        let rows = compute(&View::all(&ds));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cohort_age, -2);
    }

    #[test]
    fn unparsable_signup_excludes_customer() {
        let ds = derive_dataset(vec![
            line("A", "1", "05-01-2021", Some("garbage")),
            line("B", "2", "05-01-2021", Some("1/3/2021")),
        ]);
        let rows = compute(&View::all(&ds));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].distinct_customers, 1);
        assert_eq!(rows[0].cohort_size, 1);
        assert_eq!(ds.warnings().len(), 1);
    }

    #[test]
    fn empty_view_has_no_rows() {
        let ds = Dataset::default();
        assert!(compute(&View::all(&ds)).is_empty());
        assert!(cohort_sizes(&View::all(&ds)).is_empty());
        assert!(average_retention(&[]).is_empty());
    }

    #[test]
    fn sizes_and_average_curve() {
        let ds = dataset();
        let view = View::all(&ds);
        let sizes = cohort_sizes(&view);
        assert_eq!(
            sizes,
            vec![
                CohortSize { cohort_month: ym(2021, 1), customers: 2 },
                CohortSize { cohort_month: ym(2021, 2), customers: 1 },
            ]
        );

        let curve = average_retention(&compute(&view));
        assert_eq!(curve[0].cohort_age, 0);
        assert_eq!(curve[0].mean, 100.0);
        assert_eq!(curve[0].std_dev, Some(0.0));
        assert_eq!(curve[1].cohort_age, 2);
        assert_eq!(curve[1].std_dev, None);
    }
}
