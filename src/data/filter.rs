use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Column, Dataset, Order};

// ---------------------------------------------------------------------------
// Filter specification: an immutable value passed into every query
// ---------------------------------------------------------------------------

/// Inclusive date bounds on `order_date`. Active only when both ends are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start?, self.end?))
    }
}

/// Declarative row filter.
///
/// A dimension that is `None` or holds an empty set places no restriction.
/// All active dimensions must hold for a row to be kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default, rename = "Region")]
    pub region: Option<BTreeSet<String>>,
    #[serde(default)]
    pub category: Option<BTreeSet<String>>,
    #[serde(default)]
    pub status: Option<BTreeSet<String>>,
}

impl FilterSpec {
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_regions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_statuses<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Categorical dimensions that actually restrict rows.
    fn active_sets(&self) -> Vec<(Column, &BTreeSet<String>)> {
        [
            (Column::Region, self.region.as_ref()),
            (Column::Category, self.category.as_ref()),
            (Column::Status, self.status.as_ref()),
        ]
        .into_iter()
        .filter_map(|(col, set)| set.filter(|s| !s.is_empty()).map(|s| (col, s)))
        .collect()
    }

    /// Whether a single order line passes every active dimension.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some((start, end)) = self.date_range.as_ref().and_then(DateRange::bounds) {
            match order.order_date {
                Some(d) if d.date() >= start && d.date() <= end => {}
                _ => return false,
            }
        }
        self.active_sets().iter().all(|(col, selected)| {
            order
                .text(*col)
                .is_some_and(|value| selected.contains(value))
        })
    }

    /// True when no dimension restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.date_range.and_then(|r| r.bounds()).is_none() && self.active_sets().is_empty()
    }
}

// ---------------------------------------------------------------------------
// View – the filtered rows of a dataset
// ---------------------------------------------------------------------------

/// A filtered view: indices into a borrowed base dataset.
///
/// Cheap to build and disposable; it never mutates the dataset.
#[derive(Debug, Clone)]
pub struct View<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> View<'a> {
    /// A view over every row.
    pub fn all(dataset: &'a Dataset) -> Self {
        View {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Order lines in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &'a Order> + '_ {
        let orders = self.dataset.orders();
        self.indices.iter().map(move |&i| &orders[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl PartialEq for View<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.indices == other.indices
    }
}

/// Return the view of rows in `dataset` that pass `spec`. O(n), no I/O.
pub fn apply<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> View<'a> {
    if spec.is_unrestricted() {
        return View::all(dataset);
    }
    let indices = dataset
        .orders()
        .iter()
        .enumerate()
        .filter(|(_, order)| spec.matches(order))
        .map(|(i, _)| i)
        .collect();
    View { dataset, indices }
}
