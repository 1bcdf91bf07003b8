//! The query interface consumed by presentation code.
//!
//! Filters are an explicit, immutable [`FilterSpec`] passed into each call;
//! nothing here holds state between queries.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::analytics::breakdown::{
    self, ProblemRate, ProductRevenue, RegionCategoryRevenue, RegionPerformance, RevenueShare,
    StatusCount,
};
use crate::analytics::cohort::{self, CohortRow, CohortSize, RetentionPoint};
use crate::analytics::customers::{self, AgeDistribution, PurchaseFrequency, PurchaseGaps};
use crate::analytics::kpi::{self, KpiResult};
use crate::analytics::rfm::{self, RfmRow, SegmentSummary};
use crate::analytics::temporal::{self, MonthlyRevenue, OrderHeatmap, StatusTrend};
use crate::data::filter::{self, FilterSpec, View};
use crate::data::loader::DatasetCache;
use crate::data::model::{CellValue, Column, Dataset};
use crate::error::DataLoadError;

/// Load `source` through `cache`; a source already loaded is not re-read.
pub fn load(cache: &mut DatasetCache, source: &Path) -> Result<Arc<Dataset>, DataLoadError> {
    cache.load(source)
}

/// Sorted distinct non-null values of `column`, for filter choices.
pub fn list_distinct_values(dataset: &Dataset, column: Column) -> Vec<CellValue> {
    dataset.distinct_values(column)
}

pub fn apply_filters<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> View<'a> {
    filter::apply(dataset, spec)
}

pub fn compute_kpis(view: &View<'_>) -> KpiResult {
    kpi::compute(view)
}

pub fn compute_cohort(view: &View<'_>) -> Vec<CohortRow> {
    cohort::compute(view)
}

pub fn compute_rfm(view: &View<'_>) -> Vec<RfmRow> {
    rfm::compute(view)
}

// ---------------------------------------------------------------------------
// Report – every result for one view
// ---------------------------------------------------------------------------

/// All aggregates of one filtered view, computed fresh.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub filters: FilterSpec,
    pub rows: usize,
    pub kpis: KpiResult,
    pub cohort: Vec<CohortRow>,
    pub cohort_sizes: Vec<CohortSize>,
    pub retention_curve: Vec<RetentionPoint>,
    pub rfm: Vec<RfmRow>,
    pub segments: Vec<SegmentSummary>,
    pub revenue_by_category: Vec<RevenueShare>,
    pub revenue_by_region: Vec<RevenueShare>,
    pub revenue_by_payment: Vec<RevenueShare>,
    pub top_products: Vec<ProductRevenue>,
    pub regional_performance: Vec<RegionPerformance>,
    pub category_by_region: Vec<RegionCategoryRevenue>,
    pub status_funnel: Vec<StatusCount>,
    pub problem_rates: Vec<ProblemRate>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub order_heatmap: OrderHeatmap,
    pub status_trend: Vec<StatusTrend>,
    pub purchase_frequency: PurchaseFrequency,
    pub purchase_gaps: PurchaseGaps,
    pub age_distribution: AgeDistribution,
}

impl Report {
    pub fn build(dataset: &Dataset, spec: &FilterSpec, top_n: usize) -> Self {
        let view = apply_filters(dataset, spec);
        let cohort = compute_cohort(&view);
        let rfm = compute_rfm(&view);

        Report {
            filters: spec.clone(),
            rows: view.len(),
            kpis: compute_kpis(&view),
            cohort_sizes: cohort::cohort_sizes(&view),
            retention_curve: cohort::average_retention(&cohort),
            cohort,
            segments: rfm::segment_summary(&rfm),
            rfm,
            revenue_by_category: breakdown::revenue_by(&view, Column::Category),
            revenue_by_region: breakdown::revenue_by(&view, Column::Region),
            revenue_by_payment: breakdown::revenue_by(&view, Column::PaymentMethod),
            top_products: breakdown::top_products(&view, top_n),
            regional_performance: breakdown::regional_performance(&view),
            category_by_region: breakdown::category_by_region(&view),
            status_funnel: breakdown::status_funnel(&view),
            problem_rates: breakdown::problem_rates(&view),
            monthly_revenue: temporal::monthly_revenue(&view),
            order_heatmap: temporal::order_heatmap(&view),
            status_trend: temporal::status_trend(&view),
            purchase_frequency: customers::purchase_frequency(&view),
            purchase_gaps: customers::time_between_purchases(&view),
            age_distribution: customers::age_distribution(&view),
        }
    }
}
