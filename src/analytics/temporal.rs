use std::collections::BTreeMap;

use chrono::Weekday;
use serde::Serialize;

use crate::data::filter::View;
use crate::data::model::{weekday_name, YearMonth};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub order_month: YearMonth,
    pub label: String,
    pub revenue: f64,
    pub cumulative_revenue: f64,
}

/// Line-item counts by weekday (Monday first) and hour of day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderHeatmap {
    pub counts: [[usize; 24]; 7],
}

impl OrderHeatmap {
    pub const DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn get(&self, day: Weekday, hour: u32) -> usize {
        self.counts[day.num_days_from_monday() as usize][hour as usize % 24]
    }

    /// `(day name, hour, count)` for every non-zero cell.
    pub fn cells(&self) -> impl Iterator<Item = (&'static str, u32, usize)> + '_ {
        Self::DAYS.into_iter().flat_map(move |day| {
            (0..24u32).filter_map(move |hour| {
                let count = self.get(day, hour);
                (count > 0).then_some((weekday_name(day), hour, count))
            })
        })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTrend {
    pub order_month: YearMonth,
    pub status: String,
    pub line_items: usize,
}

/// Revenue per order month with a running total, chronologically.
pub fn monthly_revenue(view: &View<'_>) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for row in view.rows() {
        if let Some(month) = row.order_month {
            *months.entry(month).or_default() += row.revenue;
        }
    }
    let mut cumulative = 0.0;
    months
        .into_iter()
        .map(|(order_month, revenue)| {
            cumulative += revenue;
            MonthlyRevenue {
                order_month,
                label: order_month.label(),
                revenue,
                cumulative_revenue: cumulative,
            }
        })
        .collect()
}

pub fn order_heatmap(view: &View<'_>) -> OrderHeatmap {
    let mut counts = [[0usize; 24]; 7];
    for row in view.rows() {
        if let (Some(day), Some(hour)) = (row.day_of_week, row.hour) {
            counts[day.num_days_from_monday() as usize][hour as usize % 24] += 1;
        }
    }
    OrderHeatmap { counts }
}

/// Line items per `(order_month, status)`.
pub fn status_trend(view: &View<'_>) -> Vec<StatusTrend> {
    let mut counts: BTreeMap<(YearMonth, &str), usize> = BTreeMap::new();
    for row in view.rows() {
        if let (Some(month), Some(status)) = (row.order_month, row.status()) {
            *counts.entry((month, status)).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|((order_month, status), line_items)| StatusTrend {
            order_month,
            status: status.to_string(),
            line_items,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_dataset;
    use crate::data::model::{Dataset, RawOrder};

    fn line(date: &str, status: &str, revenue: f64) -> RawOrder {
        RawOrder {
            order_id: Some(date.into()),
            cust_id: Some("c".into()),
            status: Some(status.into()),
            qty_ordered: 1.0,
            price: revenue,
            order_date: Some(date.into()),
            ..RawOrder::default()
        }
    }

    fn dataset() -> Dataset {
        derive_dataset(vec![
            line("15-02-2021 09:30", "complete", 30.0),
            line("01-01-2021", "complete", 10.0),
            line("31-01-2021", "canceled", 5.0),
            line("not-a-date", "complete", 1000.0),
        ])
    }

    #[test]
    fn monthly_revenue_is_chronological_with_running_total() {
        let ds = dataset();
        let months = monthly_revenue(&View::all(&ds));
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label, "January 2021");
        assert_eq!(months[0].revenue, 15.0);
        assert_eq!(months[1].cumulative_revenue, 45.0);
    }

    #[test]
    fn heatmap_counts_weekday_and_hour() {
        let ds = dataset();
        let heatmap = order_heatmap(&View::all(&ds));
        // 2021-02-15 was a Monday, 2021-01-01 a Friday, 2021-01-31 a Sunday
        assert_eq!(heatmap.get(Weekday::Mon, 9), 1);
        assert_eq!(heatmap.get(Weekday::Fri, 0), 1);
        assert_eq!(heatmap.get(Weekday::Sun, 0), 1);
        assert_eq!(heatmap.total(), 3);
        assert_eq!(heatmap.cells().next(), Some(("Monday", 9, 1)));
    }

    #[test]
    fn status_trend_by_month() {
        let ds = dataset();
        let trend = status_trend(&View::all(&ds));
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].status, "canceled");
        assert_eq!(trend[0].order_month, YearMonth::new(2021, 1));
    }

    #[test]
    fn empty_view() {
        let ds = Dataset::default();
        let view = View::all(&ds);
        assert!(monthly_revenue(&view).is_empty());
        assert_eq!(order_heatmap(&view).total(), 0);
        assert!(status_trend(&view).is_empty());
    }
}
