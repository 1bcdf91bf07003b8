//! End-to-end tests: file on disk → load → filter → aggregate.

use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use rusty_cohort::analytics::rfm::Segment;
use rusty_cohort::{
    apply_filters, compute_cohort, compute_kpis, compute_rfm, list_distinct_values, load,
    load_file, CellValue, Column, DataLoadError, DatasetCache, FilterSpec, Report,
};
use tempfile::NamedTempFile;

const HEADER: &str = "order_id,cust_id,sku,category,status,payment_method,Region,Gender,age,qty_ordered,price,discount_amount,order_date,Customer Since";

fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Customer A: two orders (100, 150). Customer B: one order (50).
/// Customer C has an unparsable signup date and a canceled order.
fn create_test_csv() -> NamedTempFile {
    let body = [
        HEADER,
        "1001,A,SKU1,Books,complete,cod,North,F,30,1,100,0,05-01-2021,1/2/2021",
        "1002,A,SKU2,Toys,complete,cod,North,F,30,2,80,10,10-02-2021,1/2/2021",
        "1003,B,SKU1,Books,complete,Easypay,South,M,41,1,60,10,20-01-2021,1/18/2021",
        "1004,C,SKU3,Toys,canceled,cod,,M,22,1,500,0,25-01-2021,someday",
    ]
    .join("\n");
    temp_file(".csv", &body)
}

fn complete_only() -> FilterSpec {
    FilterSpec::default().with_statuses(["complete"])
}

#[test]
fn test_headline_kpis_from_csv() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    assert_eq!(dataset.len(), 4);

    let view = apply_filters(&dataset, &complete_only());
    let kpis = compute_kpis(&view);
    assert_eq!(kpis.total_revenue, 300.0);
    assert_eq!(kpis.total_customers, 2);
    assert_eq!(kpis.total_orders, 3);
    assert_eq!(kpis.aov, 100.0);
    assert_eq!(kpis.completion_rate, 100.0);
    assert_eq!(kpis.repeat_rate, 50.0);
}

#[test]
fn test_cache_does_not_reread_source() {
    let file = create_test_csv();
    let mut cache = DatasetCache::new();
    let first = load(&mut cache, file.path()).unwrap();
    let second = load(&mut cache, file.path()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_empty_view_is_a_valid_result() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    let view = apply_filters(&dataset, &FilterSpec::default().with_regions(["Antarctica"]));
    assert!(view.is_empty());

    let kpis = compute_kpis(&view);
    assert_eq!(kpis.total_revenue, 0.0);
    assert_eq!(kpis.total_orders, 0);
    assert_eq!(kpis.total_customers, 0);
    assert_eq!(kpis.aov, 0.0);
    assert_eq!(kpis.clv, 0.0);
    assert!(compute_cohort(&view).is_empty());
    assert!(compute_rfm(&view).is_empty());

    // the whole report survives an empty view too
    let report = Report::build(&dataset, &FilterSpec::default().with_regions(["Antarctica"]), 5);
    assert_eq!(report.rows, 0);
    assert!(report.top_products.is_empty());
}

#[test]
fn test_bad_signup_date_is_excluded_from_cohorts() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    assert_eq!(dataset.warnings().len(), 1);
    assert_eq!(dataset.warnings()[0].column, "Customer Since");

    let rows = compute_cohort(&apply_filters(&dataset, &FilterSpec::default()));
    assert!(rows.iter().all(|r| r.cohort_size <= 2));
    let total_members: usize = rows
        .iter()
        .filter(|r| r.cohort_age == 0)
        .map(|r| r.distinct_customers)
        .sum();
    assert_eq!(total_members, 2);
    for row in rows.iter().filter(|r| r.cohort_age == 0) {
        assert_eq!(row.retention_rate, 100.0);
    }
}

#[test]
fn test_rfm_single_order_customers_are_new() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    let rows = compute_rfm(&apply_filters(&dataset, &FilterSpec::default()));
    assert_eq!(rows.len(), 3);
    for row in rows.iter().filter(|r| r.frequency == 1) {
        assert_eq!(row.segment, Segment::New);
    }
    let a = rows.iter().find(|r| r.cust_id == "A").unwrap();
    assert_eq!(a.frequency, 2);
    assert_eq!(a.monetary, 250.0);
    assert_eq!(a.recency_days, Some(0));
}

#[test]
fn test_distinct_values_are_sorted_without_nulls() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    let regions = list_distinct_values(&dataset, Column::Region);
    assert_eq!(
        regions,
        vec![CellValue::Text("North".into()), CellValue::Text("South".into())]
    );
    let statuses = list_distinct_values(&dataset, Column::Status);
    assert_eq!(statuses.len(), 2);
}

#[test]
fn test_date_range_filter_is_inclusive() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    let jan = FilterSpec::default().with_date_range(
        NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(),
        NaiveDate::from_ymd_opt(2021, 1, 25).unwrap(),
    );
    let view = apply_filters(&dataset, &jan);
    assert_eq!(view.len(), 3);
    assert_eq!(apply_filters(&dataset, &jan), view);
}

#[test]
fn test_json_source_matches_csv() {
    let json = r#"[
      {"order_id": 1001, "cust_id": "A", "sku": "SKU1", "category": "Books", "status": "complete",
       "payment_method": "cod", "Region": "North", "Gender": "F", "age": 30, "qty_ordered": 1,
       "price": 100, "discount_amount": 0, "order_date": "05-01-2021", "Customer Since": "1/2/2021"},
      {"order_id": 1003, "cust_id": "B", "sku": "SKU1", "category": "Books", "status": "complete",
       "payment_method": "Easypay", "Region": "South", "Gender": "M", "age": 41, "qty_ordered": 1,
       "price": 60, "discount_amount": 10, "order_date": "20-01-2021", "Customer Since": "1/18/2021"}
    ]"#;
    let file = temp_file(".json", json);
    let dataset = load_file(file.path()).unwrap();
    let kpis = compute_kpis(&apply_filters(&dataset, &FilterSpec::default()));
    assert_eq!(kpis.total_revenue, 150.0);
    assert_eq!(kpis.total_orders, 2);
}

#[test]
fn test_parquet_source() {
    let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
    let text = |v: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(v)) };
    let batch = RecordBatch::try_from_iter(vec![
        ("order_id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("cust_id", Arc::new(Int64Array::from(vec![7, 7, 8])) as ArrayRef),
        ("sku", text(vec!["a", "b", "c"])),
        ("category", text(vec!["Books", "Books", "Toys"])),
        ("status", text(vec!["complete", "complete", "canceled"])),
        ("payment_method", text(vec!["cod", "cod", "cod"])),
        ("Region", text(vec!["North", "North", "West"])),
        ("Gender", text(vec!["F", "F", "M"])),
        ("age", Arc::new(Int64Array::from(vec![30, 30, 50])) as ArrayRef),
        ("qty_ordered", Arc::new(Int64Array::from(vec![1, 2, 1])) as ArrayRef),
        ("price", Arc::new(Float64Array::from(vec![10.0, 20.0, 5.0])) as ArrayRef),
        ("discount_amount", Arc::new(Float64Array::from(vec![0.0, 0.0, 0.0])) as ArrayRef),
        ("order_date", text(vec!["01-03-2021", "01-04-2021", "02-04-2021"])),
        ("Customer Since", text(vec!["3/1/2021", "3/1/2021", "4/2/2021"])),
    ])
    .unwrap();
    let out = std::fs::File::create(file.path()).unwrap();
    let mut writer = ArrowWriter::try_new(out, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let dataset = load_file(file.path()).unwrap();
    let view = apply_filters(&dataset, &FilterSpec::default());
    let kpis = compute_kpis(&view);
    assert_eq!(kpis.total_revenue, 55.0);
    assert_eq!(kpis.total_customers, 2);
    assert_eq!(kpis.repeat_customers, 1);

    let cohort = compute_cohort(&view);
    let march = cohort.iter().find(|r| r.cohort_age == 1).unwrap();
    assert_eq!(march.cohort_size, 1);
    assert_eq!(march.retention_rate, 100.0);
}

#[test]
fn test_missing_columns_fail_to_load() {
    let file = temp_file(".csv", "order_id,cust_id,price\n1,A,10\n");
    match load_file(file.path()) {
        Err(DataLoadError::MissingColumns(cols)) => {
            assert!(cols.contains(&"order_date".to_string()))
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn test_order_date_bounds() {
    let file = create_test_csv();
    let dataset = load_file(file.path()).unwrap();
    let (first, last) = dataset.order_date_bounds().unwrap();
    assert_eq!(first.date(), NaiveDate::from_ymd_opt(2021, 1, 5).unwrap());
    assert_eq!(last.date(), NaiveDate::from_ymd_opt(2021, 2, 10).unwrap());
}
