use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::data::filter::View;

/// Headline business metrics for one view. Recomputed in full on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiResult {
    pub total_revenue: f64,
    pub total_customers: usize,
    pub total_orders: usize,
    pub total_items: f64,
    /// Average order value.
    pub aov: f64,
    /// Mean revenue per customer.
    pub clv: f64,
    pub repeat_customers: usize,
    /// Percent of customers with more than one distinct order.
    pub repeat_rate: f64,
    pub items_per_order: f64,
    pub completed_orders: usize,
    /// Percent of distinct orders with status `complete`.
    pub completion_rate: f64,
}

impl KpiResult {
    /// `(name, value)` pairs in display order.
    pub fn metrics(&self) -> [(&'static str, f64); 11] {
        [
            ("total_revenue", self.total_revenue),
            ("total_customers", self.total_customers as f64),
            ("total_orders", self.total_orders as f64),
            ("total_items", self.total_items),
            ("aov", self.aov),
            ("clv", self.clv),
            ("repeat_customers", self.repeat_customers as f64),
            ("repeat_rate", self.repeat_rate),
            ("items_per_order", self.items_per_order),
            ("completed_orders", self.completed_orders as f64),
            ("completion_rate", self.completion_rate),
        ]
    }
}

/// Status value that marks a fulfilled order.
pub const COMPLETE_STATUS: &str = "complete";

/// `numerator / denominator`, or 0 when the denominator is 0.
pub(crate) fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

pub fn compute(view: &View<'_>) -> KpiResult {
    let mut total_revenue = 0.0;
    let mut total_items = 0.0;
    let mut orders: HashSet<&str> = HashSet::new();
    let mut completed: HashSet<&str> = HashSet::new();
    let mut orders_by_customer: HashMap<&str, HashSet<&str>> = HashMap::new();

    for row in view.rows() {
        total_revenue += row.revenue;
        total_items += row.raw.qty_ordered;

        let order_id = row.order_id();
        if let Some(id) = order_id {
            orders.insert(id);
            if row.status() == Some(COMPLETE_STATUS) {
                completed.insert(id);
            }
        }
        if let Some(cust) = row.cust_id() {
            let seen = orders_by_customer.entry(cust).or_default();
            if let Some(id) = order_id {
                seen.insert(id);
            }
        }
    }

    let total_orders = orders.len();
    let total_customers = orders_by_customer.len();
    let repeat_customers = orders_by_customer.values().filter(|o| o.len() > 1).count();

    KpiResult {
        total_revenue,
        total_customers,
        total_orders,
        total_items,
        aov: ratio(total_revenue, total_orders),
        clv: ratio(total_revenue, total_customers),
        repeat_customers,
        repeat_rate: 100.0 * ratio(repeat_customers as f64, total_customers),
        items_per_order: ratio(total_items, total_orders),
        completed_orders: completed.len(),
        completion_rate: 100.0 * ratio(completed.len() as f64, total_orders),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_dataset;
    use crate::data::filter::{apply, FilterSpec};
    use crate::data::model::{Dataset, RawOrder};

    fn line(order: &str, cust: &str, qty: f64, price: f64, status: &str) -> RawOrder {
        RawOrder {
            order_id: Some(order.into()),
            cust_id: Some(cust.into()),
            status: Some(status.into()),
            region: Some("North".into()),
            qty_ordered: qty,
            price,
            order_date: Some("01-02-2021".into()),
            ..RawOrder::default()
        }
    }

    fn two_customers() -> Dataset {
        derive_dataset(vec![
            line("o1", "A", 1.0, 100.0, "complete"),
            line("o2", "A", 3.0, 50.0, "complete"),
            line("o3", "B", 2.0, 25.0, "complete"),
        ])
    }

    #[test]
    fn headline_scenario() {
        let ds = two_customers();
        let kpis = compute(&View::all(&ds));
        assert_eq!(kpis.total_revenue, 300.0);
        assert_eq!(kpis.total_customers, 2);
        assert_eq!(kpis.total_orders, 3);
        assert_eq!(kpis.total_items, 6.0);
        assert_eq!(kpis.aov, 100.0);
        assert_eq!(kpis.clv, 150.0);
        assert_eq!(kpis.completion_rate, 100.0);
        assert_eq!(kpis.repeat_customers, 1);
        assert_eq!(kpis.repeat_rate, 50.0);
        assert_eq!(kpis.items_per_order, 2.0);
    }

    #[test]
    fn line_items_of_one_order_are_not_double_counted() {
        let ds = derive_dataset(vec![
            line("o1", "A", 1.0, 10.0, "complete"),
            line("o1", "A", 2.0, 10.0, "complete"),
            line("o2", "B", 1.0, 10.0, "canceled"),
        ]);
        let kpis = compute(&View::all(&ds));
        assert_eq!(kpis.total_orders, 2);
        assert_eq!(kpis.total_customers, 2);
        assert_eq!(kpis.repeat_customers, 0);
        assert_eq!(kpis.total_items, 4.0);
        assert_eq!(kpis.total_revenue, 40.0);
        assert_eq!(kpis.completed_orders, 1);
        assert_eq!(kpis.completion_rate, 50.0);
    }

    #[test]
    fn empty_view_yields_zeros() {
        let ds = two_customers();
        let view = apply(&ds, &FilterSpec::default().with_regions(["Nowhere"]));
        let kpis = compute(&view);
        assert_eq!(kpis, KpiResult::default());
        assert_eq!(kpis.aov, 0.0);
        assert!(!kpis.clv.is_nan());
    }

    #[test]
    fn revenue_is_order_independent() {
        let mut rows = vec![
            line("o1", "A", 1.0, 0.1, "complete"),
            line("o2", "B", 3.0, 0.2, "complete"),
            line("o3", "C", 7.0, 0.3, "complete"),
        ];
        let forward = derive_dataset(rows.clone());
        rows.reverse();
        let backward = derive_dataset(rows);
        let a = compute(&View::all(&forward)).total_revenue;
        let b = compute(&View::all(&backward)).total_revenue;
        let sum: f64 = forward.orders().iter().map(|o| o.revenue).sum();
        assert!((a - b).abs() < 1e-9);
        assert!((a - sum).abs() < 1e-9);
    }
}
