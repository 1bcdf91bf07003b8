use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

const CATEGORIES: [&str; 6] = [
    "Mobiles & Tablets",
    "Men's Fashion",
    "Women's Fashion",
    "Appliances",
    "Beauty & Grooming",
    "Books",
];
const STATUSES: [&str; 6] = [
    "complete",
    "complete",
    "complete",
    "received",
    "canceled",
    "order_refunded",
];
const PAYMENTS: [&str; 4] = ["cod", "Easypay", "Payaxis", "jazzwallet"];
const REGIONS: [&str; 4] = ["Midwest", "Northeast", "South", "West"];
const GENDERS: [&str; 2] = ["F", "M"];

const HEADERS: [&str; 14] = [
    "order_id",
    "cust_id",
    "sku",
    "category",
    "status",
    "payment_method",
    "Region",
    "Gender",
    "age",
    "qty_ordered",
    "price",
    "discount_amount",
    "order_date",
    "Customer Since",
];

/// One generated line item, text fields already formatted.
struct Line {
    order_id: i64,
    cust_id: i64,
    sku: String,
    category: &'static str,
    status: &'static str,
    payment_method: &'static str,
    region: &'static str,
    gender: &'static str,
    age: i64,
    qty_ordered: i64,
    price: f64,
    discount_amount: f64,
    order_date: String,
    customer_since: String,
}

fn generate(rng: &mut SimpleRng, customers: usize) -> Vec<Line> {
    let first_day = NaiveDate::from_ymd_opt(2020, 10, 1).unwrap_or_default();
    let span_days = 365;

    let mut lines = Vec::new();
    let mut order_id: i64 = 100_000;

    for cust in 0..customers {
        let cust_id = 60_000 + cust as i64;
        let region = rng.pick(&REGIONS);
        let gender = rng.pick(&GENDERS);
        let age = 18 + rng.below(50) as i64;
        let signup = first_day + Duration::days(rng.below(span_days) as i64);

        // A few customers carry a malformed signup date, like real exports do.
        let customer_since = if rng.below(40) == 0 {
            "unknown".to_string()
        } else {
            signup.format("%-m/%-d/%Y").to_string()
        };

        let n_orders = 1 + rng.below(4);
        let mut day = signup;
        for _ in 0..n_orders {
            day += Duration::days(rng.below(90) as i64);
            let status = rng.pick(&STATUSES);
            let payment_method = rng.pick(&PAYMENTS);
            let n_items = 1 + rng.below(3);
            order_id += 1;

            for _ in 0..n_items {
                let category = rng.pick(&CATEGORIES);
                let price = (5.0 + rng.next_f64() * 495.0).round();
                let qty = 1 + rng.below(3) as i64;
                let discount = if rng.below(4) == 0 {
                    (price * qty as f64 * 0.1).round()
                } else {
                    0.0
                };
                lines.push(Line {
                    order_id,
                    cust_id,
                    sku: format!("SKU-{:03}", rng.below(120)),
                    category,
                    status,
                    payment_method,
                    region,
                    gender,
                    age,
                    qty_ordered: qty,
                    price,
                    discount_amount: discount,
                    order_date: day.format("%d-%m-%Y").to_string(),
                    customer_since: customer_since.clone(),
                });
            }
        }
    }
    lines
}

fn write_csv(path: &Path, lines: &[Line]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV output")?;
    writer.write_record(HEADERS)?;
    for l in lines {
        writer.write_record([
            l.order_id.to_string(),
            l.cust_id.to_string(),
            l.sku.clone(),
            l.category.to_string(),
            l.status.to_string(),
            l.payment_method.to_string(),
            l.region.to_string(),
            l.gender.to_string(),
            l.age.to_string(),
            l.qty_ordered.to_string(),
            l.price.to_string(),
            l.discount_amount.to_string(),
            l.order_date.clone(),
            l.customer_since.clone(),
        ])?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

fn write_parquet(path: &Path, lines: &[Line]) -> Result<()> {
    let ints = |f: fn(&Line) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(lines.iter().map(f)))
    };
    let floats = |f: fn(&Line) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(lines.iter().map(f)))
    };
    let strings = |f: fn(&Line) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(lines.iter().map(f)))
    };

    let batch = RecordBatch::try_from_iter(vec![
        ("order_id", ints(|l| l.order_id)),
        ("cust_id", ints(|l| l.cust_id)),
        ("sku", strings(|l| &l.sku)),
        ("category", strings(|l| l.category)),
        ("status", strings(|l| l.status)),
        ("payment_method", strings(|l| l.payment_method)),
        ("Region", strings(|l| l.region)),
        ("Gender", strings(|l| l.gender)),
        ("age", ints(|l| l.age)),
        ("qty_ordered", ints(|l| l.qty_ordered)),
        ("price", floats(|l| l.price)),
        ("discount_amount", floats(|l| l.discount_amount)),
        ("order_date", strings(|l| &l.order_date)),
        ("Customer Since", strings(|l| &l.customer_since)),
    ])
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let output: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_orders.csv".to_string())
        .into();

    let mut rng = SimpleRng::new(42);
    let lines = generate(&mut rng, 500);

    match output.extension().and_then(|e| e.to_str()) {
        Some("parquet") => write_parquet(&output, &lines)?,
        _ => write_csv(&output, &lines)?,
    }

    println!("Wrote {} order lines to {}", lines.len(), output.display());
    Ok(())
}
