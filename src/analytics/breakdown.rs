//! Revenue and order-status breakdowns by categorical dimension.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::kpi::ratio;
use crate::data::filter::View;
use crate::data::model::Column;

/// Funnel position of known statuses; unknown ones sort after these.
pub const FUNNEL_ORDER: [&str; 6] = [
    "received",
    "complete",
    "canceled",
    "order_refunded",
    "refund",
    "cod",
];

/// Statuses counted as problem outcomes.
pub const PROBLEM_STATUSES: [&str; 2] = ["canceled", "order_refunded"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueShare {
    pub key: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub sku: String,
    pub category: String,
    pub revenue: f64,
    pub qty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPerformance {
    pub region: String,
    pub customers: usize,
    pub revenue: f64,
    pub orders: usize,
    pub aov: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCategoryRevenue {
    pub region: String,
    pub category: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemRate {
    pub category: String,
    pub status: String,
    pub count: usize,
    pub total: usize,
    /// Percent of the category's line items.
    pub rate: f64,
}

fn sorted_by_revenue(totals: HashMap<&str, f64>) -> Vec<RevenueShare> {
    let mut shares: Vec<RevenueShare> = totals
        .into_iter()
        .map(|(key, revenue)| RevenueShare {
            key: key.to_string(),
            revenue,
        })
        .collect();
    shares.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.key.cmp(&b.key)));
    shares
}

/// Revenue per value of a categorical column, largest first. Null values are
/// left out.
pub fn revenue_by(view: &View<'_>, dimension: Column) -> Vec<RevenueShare> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for row in view.rows() {
        if let Some(key) = row.text(dimension) {
            *totals.entry(key).or_default() += row.revenue;
        }
    }
    sorted_by_revenue(totals)
}

/// The `n` best-selling `(sku, category)` pairs by revenue.
pub fn top_products(view: &View<'_>, n: usize) -> Vec<ProductRevenue> {
    let mut totals: HashMap<(&str, &str), (f64, f64)> = HashMap::new();
    for row in view.rows() {
        if let (Some(sku), Some(category)) = (row.text(Column::Sku), row.text(Column::Category)) {
            let (revenue, qty) = totals.entry((sku, category)).or_default();
            *revenue += row.revenue;
            *qty += row.raw.qty_ordered;
        }
    }
    let mut products: Vec<ProductRevenue> = totals
        .into_iter()
        .map(|((sku, category), (revenue, qty))| ProductRevenue {
            sku: sku.to_string(),
            category: category.to_string(),
            revenue,
            qty,
        })
        .collect();
    products.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.sku.cmp(&b.sku))
            .then_with(|| a.category.cmp(&b.category))
    });
    products.truncate(n);
    products
}

/// Customers, revenue, orders and AOV per region, sorted by region.
pub fn regional_performance(view: &View<'_>) -> Vec<RegionPerformance> {
    #[derive(Default)]
    struct Acc<'a> {
        customers: HashSet<&'a str>,
        orders: HashSet<&'a str>,
        revenue: f64,
    }

    let mut regions: BTreeMap<&str, Acc> = BTreeMap::new();
    for row in view.rows() {
        let Some(region) = row.text(Column::Region) else {
            continue;
        };
        let acc = regions.entry(region).or_default();
        acc.revenue += row.revenue;
        acc.customers.extend(row.cust_id());
        acc.orders.extend(row.order_id());
    }

    regions
        .into_iter()
        .map(|(region, acc)| RegionPerformance {
            region: region.to_string(),
            customers: acc.customers.len(),
            revenue: acc.revenue,
            orders: acc.orders.len(),
            aov: ratio(acc.revenue, acc.orders.len()),
        })
        .collect()
}

/// Revenue per `(Region, category)`, sorted by both.
pub fn category_by_region(view: &View<'_>) -> Vec<RegionCategoryRevenue> {
    let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(region), Some(category)) =
            (row.text(Column::Region), row.text(Column::Category))
        {
            *totals.entry((region, category)).or_default() += row.revenue;
        }
    }
    totals
        .into_iter()
        .map(|((region, category), revenue)| RegionCategoryRevenue {
            region: region.to_string(),
            category: category.to_string(),
            revenue,
        })
        .collect()
}

fn funnel_rank(status: &str) -> usize {
    FUNNEL_ORDER
        .iter()
        .position(|s| *s == status)
        .unwrap_or(FUNNEL_ORDER.len())
}

/// Distinct orders per status in funnel order.
pub fn status_funnel(view: &View<'_>) -> Vec<StatusCount> {
    let mut orders: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in view.rows() {
        if let Some(status) = row.status() {
            orders.entry(status).or_default().extend(row.order_id());
        }
    }
    let mut counts: Vec<StatusCount> = orders
        .into_iter()
        .map(|(status, ids)| StatusCount {
            status: status.to_string(),
            orders: ids.len(),
        })
        .collect();
    counts.sort_by(|a, b| {
        funnel_rank(&a.status)
            .cmp(&funnel_rank(&b.status))
            .then_with(|| a.status.cmp(&b.status))
    });
    counts
}

/// Share of each category's line items that were canceled or refunded.
pub fn problem_rates(view: &View<'_>) -> Vec<ProblemRate> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    let mut problems: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for row in view.rows() {
        let Some(category) = row.text(Column::Category) else {
            continue;
        };
        *totals.entry(category).or_default() += 1;
        if let Some(status) = row.status().filter(|s| PROBLEM_STATUSES.contains(s)) {
            *problems.entry((category, status)).or_default() += 1;
        }
    }
    problems
        .into_iter()
        .map(|((category, status), count)| {
            let total = totals.get(category).copied().unwrap_or(0);
            ProblemRate {
                category: category.to_string(),
                status: status.to_string(),
                count,
                total,
                rate: 100.0 * ratio(count as f64, total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_dataset;
    use crate::data::model::{Dataset, RawOrder};

    fn line(
        order: &str,
        sku: &str,
        category: &str,
        region: &str,
        status: &str,
        revenue: f64,
    ) -> RawOrder {
        RawOrder {
            order_id: Some(order.into()),
            cust_id: Some(format!("cust-{order}")),
            sku: Some(sku.into()),
            category: Some(category.into()),
            region: Some(region.into()),
            status: Some(status.into()),
            payment_method: Some("cod".into()),
            qty_ordered: 1.0,
            price: revenue,
            order_date: Some("01-01-2021".into()),
            ..RawOrder::default()
        }
    }

    fn dataset() -> Dataset {
        derive_dataset(vec![
            line("1", "S1", "Books", "North", "complete", 50.0),
            line("1", "S2", "Toys", "North", "complete", 20.0),
            line("2", "S1", "Books", "South", "canceled", 50.0),
            line("3", "S3", "Toys", "South", "received", 200.0),
            line("4", "S3", "Toys", "South", "paid", 10.0),
        ])
    }

    #[test]
    fn revenue_by_category_is_sorted_descending() {
        let ds = dataset();
        let shares = revenue_by(&View::all(&ds), Column::Category);
        assert_eq!(shares[0], RevenueShare { key: "Toys".into(), revenue: 230.0 });
        assert_eq!(shares[1], RevenueShare { key: "Books".into(), revenue: 100.0 });
    }

    #[test]
    fn top_products_truncates() {
        let ds = dataset();
        let top = top_products(&View::all(&ds), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].sku, "S3");
        assert_eq!(top[0].qty, 2.0);
        assert_eq!(top[1].sku, "S1");
    }

    #[test]
    fn regional_aov_uses_distinct_orders() {
        let ds = dataset();
        let regions = regional_performance(&View::all(&ds));
        assert_eq!(regions[0].region, "North");
        assert_eq!(regions[0].orders, 1);
        assert_eq!(regions[0].aov, 70.0);
        assert_eq!(regions[1].orders, 3);
        assert_eq!(regions[1].customers, 3);
    }

    #[test]
    fn category_by_region_groups_pairs() {
        let ds = dataset();
        let pairs = category_by_region(&View::all(&ds));
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3].region, "South");
        assert_eq!(pairs[3].category, "Toys");
        assert_eq!(pairs[3].revenue, 210.0);
    }

    #[test]
    fn funnel_order_puts_unknown_statuses_last() {
        let ds = dataset();
        let statuses: Vec<String> = status_funnel(&View::all(&ds))
            .into_iter()
            .map(|s| s.status)
            .collect();
        assert_eq!(statuses, vec!["received", "complete", "canceled", "paid"]);
    }

    #[test]
    fn problem_rates_per_category() {
        let ds = dataset();
        let rates = problem_rates(&View::all(&ds));
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].category, "Books");
        assert_eq!(rates[0].status, "canceled");
        assert_eq!(rates[0].total, 2);
        assert_eq!(rates[0].rate, 50.0);
    }

    #[test]
    fn empty_view_is_empty_everywhere() {
        let ds = Dataset::default();
        let view = View::all(&ds);
        assert!(revenue_by(&view, Column::PaymentMethod).is_empty());
        assert!(top_products(&view, 10).is_empty());
        assert!(regional_performance(&view).is_empty());
        assert!(status_funnel(&view).is_empty());
        assert!(problem_rates(&view).is_empty());
    }
}
