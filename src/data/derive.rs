//! Feature derivation: date parsing, revenue and calendar fields.
//!
//! Pure and deterministic. Nothing here reads the wall clock.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::{debug, warn};

use super::model::{Column, Dataset, Order, RawOrder, YearMonth};
use crate::error::DateParseWarning;

/// Day-month-year, the layout of `order_date`.
pub const ORDER_DATE_FORMAT: &str = "%d-%m-%Y";

/// Month/day/year, the layout of `Customer Since`.
pub const CUSTOMER_SINCE_FORMAT: &str = "%m/%d/%Y";

const ORDER_DATETIME_FORMATS: [&str; 2] = ["%d-%m-%Y %H:%M:%S", "%d-%m-%Y %H:%M"];

/// Parse an `order_date` cell. A bare date is taken at midnight.
pub fn parse_order_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, ORDER_DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0);
    }
    ORDER_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Parse a `Customer Since` cell.
pub fn parse_customer_since(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), CUSTOMER_SINCE_FORMAT).ok()
}

/// Derive one order line. Unparsable dates are nulled and reported through
/// `warnings`.
pub fn derive_order(raw: RawOrder, row: usize, warnings: &mut Vec<DateParseWarning>) -> Order {
    let order_date = parse_or_warn(
        raw.order_date.as_deref(),
        Column::OrderDate,
        row,
        warnings,
        parse_order_date,
    );
    let customer_since = parse_or_warn(
        raw.customer_since.as_deref(),
        Column::CustomerSince,
        row,
        warnings,
        parse_customer_since,
    );

    let revenue = raw.qty_ordered * raw.price - raw.discount_amount;

    Order {
        revenue,
        order_date,
        customer_since,
        order_month: order_date.as_ref().map(YearMonth::of),
        cohort_month: customer_since.as_ref().map(YearMonth::of),
        order_year: order_date.map(|d| d.year()),
        order_month_name: order_date.map(|d| d.format("%B %Y").to_string()),
        day_of_week: order_date.map(|d| d.weekday()),
        hour: order_date.map(|d| d.hour()),
        raw,
    }
}

fn parse_or_warn<T>(
    text: Option<&str>,
    column: Column,
    row: usize,
    warnings: &mut Vec<DateParseWarning>,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    // A blank cell is simply missing, not a parse failure.
    let text = text?;
    let parsed = parse(text);
    if parsed.is_none() {
        let warning = DateParseWarning {
            row,
            column: column.name().to_string(),
            value: text.to_string(),
        };
        debug!("{warning}");
        warnings.push(warning);
    }
    parsed
}

/// Run derivation over every loaded row and build the base dataset.
pub fn derive_dataset(rows: Vec<RawOrder>) -> Dataset {
    let mut warnings = Vec::new();
    let orders: Vec<Order> = rows
        .into_iter()
        .enumerate()
        .map(|(row, raw)| derive_order(raw, row, &mut warnings))
        .collect();

    for column in [Column::OrderDate, Column::CustomerSince] {
        let count = warnings.iter().filter(|w| w.column == column.name()).count();
        if count > 0 {
            warn!("{count} unparsable '{column}' values treated as missing");
        }
    }

    Dataset::new(orders, warnings)
}
