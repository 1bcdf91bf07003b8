//! Tabular rendering of query results as Arrow record batches.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;
use log::info;
use parquet::arrow::ArrowWriter;

use crate::analytics::breakdown::RevenueShare;
use crate::query::Report;

/// A group of related tables in a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Kpis,
    Cohort,
    Rfm,
    Breakdown,
    Temporal,
    Customers,
    All,
}

impl Section {
    fn includes(self, other: Section) -> bool {
        self == Section::All || self == other
    }
}

// -- column helpers --

fn text<I: IntoIterator<Item = String>>(values: I) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn opt_text<I: IntoIterator<Item = Option<String>>>(values: I) -> ArrayRef {
    Arc::new(values.into_iter().collect::<StringArray>())
}

fn float<I: IntoIterator<Item = f64>>(values: I) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

fn opt_float<I: IntoIterator<Item = Option<f64>>>(values: I) -> ArrayRef {
    Arc::new(values.into_iter().collect::<Float64Array>())
}

fn count<I: IntoIterator<Item = usize>>(values: I) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values.into_iter().map(|v| v as u64)))
}

fn opt_int<I: IntoIterator<Item = Option<i64>>>(values: I) -> ArrayRef {
    Arc::new(values.into_iter().collect::<Int64Array>())
}

fn int<I: IntoIterator<Item = i32>>(values: I) -> ArrayRef {
    Arc::new(Int32Array::from_iter_values(values))
}

fn shares_batch(key: &str, shares: &[RevenueShare]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_from_iter(vec![
        (key, text(shares.iter().map(|s| s.key.clone()))),
        ("revenue", float(shares.iter().map(|s| s.revenue))),
    ])
}

// ---------------------------------------------------------------------------
// Per-section batches
// ---------------------------------------------------------------------------

/// Named batches for one section of the report.
pub fn section_batches(
    report: &Report,
    section: Section,
) -> Result<Vec<(&'static str, RecordBatch)>, ArrowError> {
    let mut out = Vec::new();

    if section.includes(Section::Kpis) {
        let metrics = report.kpis.metrics();
        out.push((
            "kpis",
            RecordBatch::try_from_iter(vec![
                ("metric", text(metrics.iter().map(|(name, _)| name.to_string()))),
                ("value", float(metrics.iter().map(|(_, v)| *v))),
            ])?,
        ));
    }

    if section.includes(Section::Cohort) {
        let rows = &report.cohort;
        out.push((
            "cohort_retention",
            RecordBatch::try_from_iter(vec![
                ("cohort_month", text(rows.iter().map(|r| r.cohort_month.to_string()))),
                ("order_month", text(rows.iter().map(|r| r.order_month.to_string()))),
                ("cohort_age", int(rows.iter().map(|r| r.cohort_age))),
                ("distinct_customers", count(rows.iter().map(|r| r.distinct_customers))),
                ("cohort_size", count(rows.iter().map(|r| r.cohort_size))),
                ("retention_rate", float(rows.iter().map(|r| r.retention_rate))),
            ])?,
        ));
        let sizes = &report.cohort_sizes;
        out.push((
            "cohort_sizes",
            RecordBatch::try_from_iter(vec![
                ("cohort_month", text(sizes.iter().map(|s| s.cohort_month.to_string()))),
                ("customers", count(sizes.iter().map(|s| s.customers))),
            ])?,
        ));
        let curve = &report.retention_curve;
        out.push((
            "retention_curve",
            RecordBatch::try_from_iter(vec![
                ("cohort_age", int(curve.iter().map(|p| p.cohort_age))),
                ("mean", float(curve.iter().map(|p| p.mean))),
                ("std_dev", opt_float(curve.iter().map(|p| p.std_dev))),
                ("cohorts", count(curve.iter().map(|p| p.cohorts))),
            ])?,
        ));
    }

    if section.includes(Section::Rfm) {
        let rows = &report.rfm;
        out.push((
            "rfm",
            RecordBatch::try_from_iter(vec![
                ("cust_id", text(rows.iter().map(|r| r.cust_id.clone()))),
                ("recency_days", opt_int(rows.iter().map(|r| r.recency_days))),
                ("frequency", count(rows.iter().map(|r| r.frequency))),
                ("monetary", float(rows.iter().map(|r| r.monetary))),
                ("segment", text(rows.iter().map(|r| r.segment.to_string()))),
            ])?,
        ));
        let segments = &report.segments;
        out.push((
            "segments",
            RecordBatch::try_from_iter(vec![
                ("segment", text(segments.iter().map(|s| s.segment.to_string()))),
                ("customers", count(segments.iter().map(|s| s.customers))),
                ("min", float(segments.iter().map(|s| s.min))),
                ("q1", float(segments.iter().map(|s| s.q1))),
                ("median", float(segments.iter().map(|s| s.median))),
                ("q3", float(segments.iter().map(|s| s.q3))),
                ("mean", float(segments.iter().map(|s| s.mean))),
                ("max", float(segments.iter().map(|s| s.max))),
            ])?,
        ));
    }

    if section.includes(Section::Breakdown) {
        out.push(("revenue_by_category", shares_batch("category", &report.revenue_by_category)?));
        out.push(("revenue_by_region", shares_batch("Region", &report.revenue_by_region)?));
        out.push((
            "revenue_by_payment",
            shares_batch("payment_method", &report.revenue_by_payment)?,
        ));

        let products = &report.top_products;
        out.push((
            "top_products",
            RecordBatch::try_from_iter(vec![
                ("sku", text(products.iter().map(|p| p.sku.clone()))),
                ("category", text(products.iter().map(|p| p.category.clone()))),
                ("revenue", float(products.iter().map(|p| p.revenue))),
                ("qty", float(products.iter().map(|p| p.qty))),
            ])?,
        ));
        let regions = &report.regional_performance;
        out.push((
            "regional_performance",
            RecordBatch::try_from_iter(vec![
                ("Region", text(regions.iter().map(|r| r.region.clone()))),
                ("customers", count(regions.iter().map(|r| r.customers))),
                ("revenue", float(regions.iter().map(|r| r.revenue))),
                ("orders", count(regions.iter().map(|r| r.orders))),
                ("aov", float(regions.iter().map(|r| r.aov))),
            ])?,
        ));
        let pairs = &report.category_by_region;
        out.push((
            "category_by_region",
            RecordBatch::try_from_iter(vec![
                ("Region", text(pairs.iter().map(|p| p.region.clone()))),
                ("category", text(pairs.iter().map(|p| p.category.clone()))),
                ("revenue", float(pairs.iter().map(|p| p.revenue))),
            ])?,
        ));
        let funnel = &report.status_funnel;
        out.push((
            "status_funnel",
            RecordBatch::try_from_iter(vec![
                ("status", text(funnel.iter().map(|s| s.status.clone()))),
                ("orders", count(funnel.iter().map(|s| s.orders))),
            ])?,
        ));
        let problems = &report.problem_rates;
        out.push((
            "problem_rates",
            RecordBatch::try_from_iter(vec![
                ("category", text(problems.iter().map(|p| p.category.clone()))),
                ("status", text(problems.iter().map(|p| p.status.clone()))),
                ("count", count(problems.iter().map(|p| p.count))),
                ("total", count(problems.iter().map(|p| p.total))),
                ("rate", float(problems.iter().map(|p| p.rate))),
            ])?,
        ));
    }

    if section.includes(Section::Temporal) {
        let months = &report.monthly_revenue;
        out.push((
            "monthly_revenue",
            RecordBatch::try_from_iter(vec![
                ("order_month", text(months.iter().map(|m| m.order_month.to_string()))),
                ("label", text(months.iter().map(|m| m.label.clone()))),
                ("revenue", float(months.iter().map(|m| m.revenue))),
                ("cumulative_revenue", float(months.iter().map(|m| m.cumulative_revenue))),
            ])?,
        ));
        let cells: Vec<_> = report.order_heatmap.cells().collect();
        out.push((
            "order_heatmap",
            RecordBatch::try_from_iter(vec![
                ("day_of_week", text(cells.iter().map(|(day, _, _)| day.to_string()))),
                ("hour", int(cells.iter().map(|(_, hour, _)| *hour as i32))),
                ("line_items", count(cells.iter().map(|(_, _, n)| *n))),
            ])?,
        ));
        let trend = &report.status_trend;
        out.push((
            "status_trend",
            RecordBatch::try_from_iter(vec![
                ("order_month", text(trend.iter().map(|t| t.order_month.to_string()))),
                ("status", text(trend.iter().map(|t| t.status.clone()))),
                ("line_items", count(trend.iter().map(|t| t.line_items))),
            ])?,
        ));
    }

    if section.includes(Section::Customers) {
        let histogram = &report.purchase_frequency.histogram;
        out.push((
            "purchase_frequency",
            RecordBatch::try_from_iter(vec![
                ("order_count", count(histogram.iter().map(|(orders, _)| *orders))),
                ("customers", count(histogram.iter().map(|(_, n)| *n))),
            ])?,
        ));
        let gaps = &report.purchase_gaps;
        out.push((
            "purchase_gaps",
            RecordBatch::try_from_iter(vec![
                ("repeat_gaps", count([gaps.gaps_days.len()])),
                ("median_days", opt_float([gaps.median_days])),
                ("mean_days", opt_float([gaps.mean_days])),
            ])?,
        ));
        let ages = &report.age_distribution.bins;
        out.push((
            "age_distribution",
            RecordBatch::try_from_iter(vec![
                ("age_from", float(ages.iter().map(|b| b.lower))),
                ("age_to", float(ages.iter().map(|b| b.upper))),
                ("Gender", opt_text(ages.iter().map(|b| b.gender.clone()))),
                ("customers", count(ages.iter().map(|b| b.customers))),
            ])?,
        ));
    }

    Ok(out)
}

/// Render batches as titled ASCII tables.
pub fn render_tables(batches: &[(&str, RecordBatch)]) -> Result<String> {
    let mut rendered = String::new();
    for (name, batch) in batches {
        let table = pretty_format_batches(std::slice::from_ref(batch))
            .with_context(|| format!("formatting table {name}"))?;
        rendered.push_str(&format!("\n{name} ({} rows)\n{table}\n", batch.num_rows()));
    }
    Ok(rendered)
}

/// Write each batch to `<dir>/<name>.parquet`.
pub fn export_parquet(dir: &Path, batches: &[(&str, RecordBatch)]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (name, batch) in batches {
        let path = dir.join(format!("{name}.parquet"));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer =
            ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
        writer.write(batch).context("writing parquet batch")?;
        writer.close().context("closing parquet writer")?;
        info!("wrote {} rows to {}", batch.num_rows(), path.display());
    }
    Ok(())
}
