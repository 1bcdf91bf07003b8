use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Serialize, Serializer};

use crate::error::DateParseWarning;

// ---------------------------------------------------------------------------
// Column – every addressable field of an order line
// ---------------------------------------------------------------------------

/// A named column of the order dataset, raw or derived.
///
/// Raw columns carry the exact header text of the input schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    OrderId,
    CustId,
    Sku,
    Category,
    Status,
    PaymentMethod,
    Region,
    Gender,
    Age,
    QtyOrdered,
    Price,
    DiscountAmount,
    OrderDate,
    CustomerSince,
    // derived
    Revenue,
    OrderMonth,
    CohortMonth,
    OrderYear,
    OrderMonthName,
    DayOfWeek,
    Hour,
}

impl Column {
    /// Columns read from the source, in schema order.
    pub const RAW: [Column; 14] = [
        Column::OrderId,
        Column::CustId,
        Column::Sku,
        Column::Category,
        Column::Status,
        Column::PaymentMethod,
        Column::Region,
        Column::Gender,
        Column::Age,
        Column::QtyOrdered,
        Column::Price,
        Column::DiscountAmount,
        Column::OrderDate,
        Column::CustomerSince,
    ];

    /// Columns computed by the feature deriver.
    pub const DERIVED: [Column; 7] = [
        Column::Revenue,
        Column::OrderMonth,
        Column::CohortMonth,
        Column::OrderYear,
        Column::OrderMonthName,
        Column::DayOfWeek,
        Column::Hour,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::OrderId => "order_id",
            Column::CustId => "cust_id",
            Column::Sku => "sku",
            Column::Category => "category",
            Column::Status => "status",
            Column::PaymentMethod => "payment_method",
            Column::Region => "Region",
            Column::Gender => "Gender",
            Column::Age => "age",
            Column::QtyOrdered => "qty_ordered",
            Column::Price => "price",
            Column::DiscountAmount => "discount_amount",
            Column::OrderDate => "order_date",
            Column::CustomerSince => "Customer Since",
            Column::Revenue => "revenue",
            Column::OrderMonth => "order_month",
            Column::CohortMonth => "cohort_month",
            Column::OrderYear => "order_year",
            Column::OrderMonthName => "order_month_name",
            Column::DayOfWeek => "day_of_week",
            Column::Hour => "hour",
        }
    }

    /// Whether the source may omit this column entirely.
    pub fn is_optional(self) -> bool {
        matches!(self, Column::CustomerSince)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Age | Column::QtyOrdered | Column::Price | Column::DiscountAmount
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::RAW
            .iter()
            .chain(Column::DERIVED.iter())
            .copied()
            .find(|c| c.name() == s)
            .or(match s {
                // Accept the derived spelling of the signup date too.
                "customer_since" => Some(Column::CustomerSince),
                _ => None,
            })
            .ok_or_else(|| format!("unknown column '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// YearMonth – calendar month period
// ---------------------------------------------------------------------------

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        YearMonth { year, month }
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Signed number of whole calendar months from `earlier` to `self`.
    pub fn months_since(self, earlier: YearMonth) -> i32 {
        (self.year - earlier.year) * 12 + (self.month as i32 - earlier.month as i32)
    }

    /// Long label such as `March 2021`.
    pub fn label(self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell, used for distinct-value listings
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. Must be `Ord` so it can live in a `BTreeSet`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Month(YearMonth),
    Null,
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Number(_) => 2,
                Text(_) => 3,
                Date(_) => 4,
                DateTime(_) => 5,
                Month(_) => 6,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Text(a), Text(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Month(a), Month(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::DateTime(d) => write!(f, "{d}"),
            CellValue::Month(m) => write!(f, "{m}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    fn text(value: Option<&String>) -> Self {
        value.map_or(CellValue::Null, |s| CellValue::Text(s.clone()))
    }

    /// Identifier cell: integers when the text is a whole number, so numeric
    /// ids sort numerically; text otherwise.
    fn id(value: Option<&String>) -> Self {
        match value {
            Some(s) => s
                .trim()
                .parse::<i64>()
                .map_or_else(|_| CellValue::Text(s.clone()), CellValue::Integer),
            None => CellValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// RawOrder – one line item exactly as read
// ---------------------------------------------------------------------------

/// One line item with raw columns intact. Blank text cells are `None`;
/// dates are kept as their original text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub cust_id: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub region: Option<String>,
    pub gender: Option<String>,
    pub age: Option<f64>,
    pub qty_ordered: f64,
    pub price: f64,
    pub discount_amount: f64,
    pub order_date: Option<String>,
    pub customer_since: Option<String>,
}

// ---------------------------------------------------------------------------
// Order – a line item plus its derived features
// ---------------------------------------------------------------------------

/// A line item after feature derivation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub raw: RawOrder,
    pub order_date: Option<NaiveDateTime>,
    pub customer_since: Option<NaiveDate>,
    pub revenue: f64,
    pub order_month: Option<YearMonth>,
    pub cohort_month: Option<YearMonth>,
    pub order_year: Option<i32>,
    pub order_month_name: Option<String>,
    pub day_of_week: Option<Weekday>,
    pub hour: Option<u32>,
}

impl Order {
    pub fn order_id(&self) -> Option<&str> {
        self.raw.order_id.as_deref()
    }

    pub fn cust_id(&self) -> Option<&str> {
        self.raw.cust_id.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.raw.status.as_deref()
    }

    /// Categorical text of a column, `None` for null or non-text columns.
    pub fn text(&self, column: Column) -> Option<&str> {
        let raw = &self.raw;
        match column {
            Column::OrderId => raw.order_id.as_deref(),
            Column::CustId => raw.cust_id.as_deref(),
            Column::Sku => raw.sku.as_deref(),
            Column::Category => raw.category.as_deref(),
            Column::Status => raw.status.as_deref(),
            Column::PaymentMethod => raw.payment_method.as_deref(),
            Column::Region => raw.region.as_deref(),
            Column::Gender => raw.gender.as_deref(),
            _ => None,
        }
    }

    /// The value of any column as a [`CellValue`].
    pub fn value(&self, column: Column) -> CellValue {
        let raw = &self.raw;
        match column {
            Column::OrderId => CellValue::id(raw.order_id.as_ref()),
            Column::CustId => CellValue::id(raw.cust_id.as_ref()),
            Column::Sku => CellValue::text(raw.sku.as_ref()),
            Column::Category => CellValue::text(raw.category.as_ref()),
            Column::Status => CellValue::text(raw.status.as_ref()),
            Column::PaymentMethod => CellValue::text(raw.payment_method.as_ref()),
            Column::Region => CellValue::text(raw.region.as_ref()),
            Column::Gender => CellValue::text(raw.gender.as_ref()),
            Column::Age => raw.age.map_or(CellValue::Null, CellValue::Number),
            Column::QtyOrdered => CellValue::Number(raw.qty_ordered),
            Column::Price => CellValue::Number(raw.price),
            Column::DiscountAmount => CellValue::Number(raw.discount_amount),
            Column::OrderDate => self.order_date.map_or(CellValue::Null, CellValue::DateTime),
            Column::CustomerSince => self.customer_since.map_or(CellValue::Null, CellValue::Date),
            Column::Revenue => CellValue::Number(self.revenue),
            Column::OrderMonth => self.order_month.map_or(CellValue::Null, CellValue::Month),
            Column::CohortMonth => self.cohort_month.map_or(CellValue::Null, CellValue::Month),
            Column::OrderYear => self
                .order_year
                .map_or(CellValue::Null, |y| CellValue::Integer(y as i64)),
            Column::OrderMonthName => CellValue::text(self.order_month_name.as_ref()),
            Column::DayOfWeek => self
                .day_of_week
                .map_or(CellValue::Null, |d| CellValue::Text(weekday_name(d).to_string())),
            Column::Hour => self
                .hour
                .map_or(CellValue::Null, |h| CellValue::Integer(h as i64)),
        }
    }
}

/// Full English day name (`Monday`, ...).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded, derived dataset
// ---------------------------------------------------------------------------

/// The base dataset: every order line with derived features, read-only
/// after construction.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    orders: Vec<Order>,
    warnings: Vec<DateParseWarning>,
}

impl Dataset {
    pub fn new(orders: Vec<Order>, warnings: Vec<DateParseWarning>) -> Self {
        Dataset { orders, warnings }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Date cells that were nulled during derivation.
    pub fn warnings(&self) -> &[DateParseWarning] {
        &self.warnings
    }

    /// Number of order lines.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Earliest and latest `order_date`, ignoring nulls.
    pub fn order_date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut dates = self.orders.iter().filter_map(|o| o.order_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Sorted, de-duplicated, non-null values of a column. Whole-number ids
    /// sort numerically, ahead of any non-numeric ids.
    pub fn distinct_values(&self, column: Column) -> Vec<CellValue> {
        self.orders
            .iter()
            .map(|o| o.value(column))
            .filter(|v| !v.is_null())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
