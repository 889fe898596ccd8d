//! Stateless row filters
//!
//! A [`FilterSet`] is applied to a borrowed [`Table`] and yields a new one.
//! Predicates naming a column the table does not carry are skipped and
//! reported instead of failing.

use crate::error::FilterError;
use crate::table::{DateWindow, Table};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Include/exclude lists for one categorical column
///
/// An empty include list admits every value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    /// Column to test
    pub column: String,
    /// Values to keep; empty keeps all
    #[serde(default)]
    pub include: Vec<String>,
    /// Values to drop
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CategoryFilter {
    /// Filter on a column with no lists yet
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    /// With values to keep
    #[must_use]
    pub fn include<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.include.extend(values.into_iter().map(Into::into));
        self
    }

    /// With values to drop
    #[must_use]
    pub fn exclude<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(values.into_iter().map(Into::into));
        self
    }

    fn admits(&self, key: Option<&str>) -> bool {
        let included = self.include.is_empty()
            || key.is_some_and(|k| self.include.iter().any(|v| v == k));
        let excluded = key.is_some_and(|k| self.exclude.iter().any(|v| v == k));
        included && !excluded
    }
}

/// Billable hours selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Billability {
    /// No restriction
    #[default]
    All,
    /// Billable hours above zero
    Billable,
    /// Billable hours exactly zero
    NonBillable,
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl ValueRange {
    /// Create range
    ///
    /// # Errors
    /// Returns [`FilterError::InvertedRange`] when `min > max`.
    pub fn new(min: f64, max: f64) -> Result<Self, FilterError> {
        if min > max {
            return Err(FilterError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Whether the value lies inside the range
    #[inline]
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Column names the filters read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterColumns {
    /// Record date
    pub date: String,
    /// Project identifier for per-project ranges
    pub project: String,
    /// Hours worked
    pub hours: String,
    /// Billable hours
    pub billable_hours: String,
    /// Fee
    pub fee: String,
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            date: "record_date".to_string(),
            project: "project_number".to_string(),
            hours: "hours_used".to_string(),
            billable_hours: "hours_billable".to_string(),
            fee: "fee_record".to_string(),
        }
    }
}

/// A filter that was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFilter {
    /// Which predicate
    pub filter: &'static str,
    /// Column it needed
    pub column: String,
}

impl fmt::Display for SkippedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} filter skipped: no column '{}'", self.filter, self.column)
    }
}

/// Filtered table plus the predicates that could not apply
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Rows that passed every applied predicate
    pub table: Table,
    /// Predicates skipped for missing columns
    pub skipped: Vec<SkippedFilter>,
}

/// All user-chosen predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Column names
    #[serde(default)]
    pub columns: FilterColumns,
    /// Inclusive date window
    #[serde(default)]
    pub date: Option<DateWindow>,
    /// Categorical include/exclude lists
    #[serde(default)]
    pub categories: Vec<CategoryFilter>,
    /// Billable hours selector
    #[serde(default)]
    pub billability: Billability,
    /// Range on each project's total hours
    #[serde(default)]
    pub project_hours: Option<ValueRange>,
    /// Range on each project's fee per hour
    #[serde(default)]
    pub project_effective_rate: Option<ValueRange>,
}

impl FilterSet {
    /// No predicates
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With date window
    #[inline]
    #[must_use]
    pub fn with_date(mut self, window: DateWindow) -> Self {
        self.date = Some(window);
        self
    }

    /// With category filter
    #[inline]
    #[must_use]
    pub fn with_category(mut self, filter: CategoryFilter) -> Self {
        self.categories.push(filter);
        self
    }

    /// With billability selector
    #[inline]
    #[must_use]
    pub fn with_billability(mut self, billability: Billability) -> Self {
        self.billability = billability;
        self
    }

    /// With project total hours range
    #[inline]
    #[must_use]
    pub fn with_project_hours(mut self, range: ValueRange) -> Self {
        self.project_hours = Some(range);
        self
    }

    /// With project effective rate range
    #[inline]
    #[must_use]
    pub fn with_project_effective_rate(mut self, range: ValueRange) -> Self {
        self.project_effective_rate = Some(range);
        self
    }

    /// Whether any predicate is set
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.date.is_some()
            || !self.categories.is_empty()
            || self.billability != Billability::All
            || self.project_hours.is_some()
            || self.project_effective_rate.is_some()
    }

    /// Apply every predicate to `table`
    ///
    /// Row-level predicates run first; project ranges are evaluated on the
    /// totals of the rows that survived them.
    #[must_use]
    pub fn apply(&self, table: &Table) -> FilterOutcome {
        let mut skipped = Vec::new();
        let mut resolve = |filter: &'static str, column: &str| {
            let idx = table.column_index(column);
            if idx.is_none() {
                skipped.push(SkippedFilter {
                    filter,
                    column: column.to_string(),
                });
            }
            idx
        };

        let date_idx = self
            .date
            .and_then(|window| resolve("date", &self.columns.date).map(|i| (i, window)));
        let categories: Vec<(usize, &CategoryFilter)> = self
            .categories
            .iter()
            .filter_map(|c| resolve("category", &c.column).map(|i| (i, c)))
            .collect();
        let billable_idx = match self.billability {
            Billability::All => None,
            _ => resolve("billability", &self.columns.billable_hours),
        };

        let mut filtered = table.filter_rows(|row| {
            date_idx.map_or(true, |(i, window)| {
                row[i].as_date().is_some_and(|d| window.contains(d))
            }) && categories
                .iter()
                .all(|(i, c)| c.admits(row[*i].to_key().as_deref()))
                && billable_idx.map_or(true, |i| match (self.billability, row[i].as_f64()) {
                    (Billability::Billable, Some(v)) => v > 0.0,
                    (Billability::NonBillable, Some(v)) => v == 0.0,
                    (Billability::All, _) => true,
                    (_, None) => false,
                })
        });

        if self.project_hours.is_some() || self.project_effective_rate.is_some() {
            let project = resolve("project range", &self.columns.project);
            let hours = resolve("project range", &self.columns.hours);
            let fee = if self.project_effective_rate.is_some() {
                resolve("project rate", &self.columns.fee)
            } else {
                None
            };
            if let (Some(project), Some(hours)) = (project, hours) {
                let keep = self.projects_in_range(&filtered, project, hours, fee);
                filtered = filtered.filter_rows(|row| {
                    row[project].to_key().is_some_and(|k| keep.contains(&k))
                });
            }
        }

        for s in &skipped {
            tracing::debug!("{}", s);
        }
        FilterOutcome {
            table: filtered,
            skipped,
        }
    }

    fn projects_in_range(
        &self,
        table: &Table,
        project: usize,
        hours: usize,
        fee: Option<usize>,
    ) -> IndexSet<String> {
        let mut totals: IndexMap<String, (f64, f64)> = IndexMap::new();
        for row in table.rows() {
            let Some(key) = row[project].to_key() else {
                continue;
            };
            let entry = totals.entry(key).or_default();
            entry.0 += row[hours].as_f64_or_zero();
            entry.1 += fee.map_or(0.0, |i| row[i].as_f64_or_zero());
        }

        totals
            .into_iter()
            .filter(|(_, (h, f))| {
                self.project_hours.map_or(true, |r| r.contains(*h))
                    && match (self.project_effective_rate, fee) {
                        (Some(r), Some(_)) => r.contains(if *h == 0.0 { 0.0 } else { f / h }),
                        _ => true,
                    }
            })
            .map(|(k, _)| k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::Value;
    use chrono::NaiveDate;

    fn date(d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn sample() -> Table {
        Table::new([
            "record_date",
            "project_number",
            "customer_name",
            "hours_used",
            "hours_billable",
            "fee_record",
        ])
        .with_rows(vec![
            vec![date(10), "P1".into(), "Acme".into(), 8.0.into(), 8.0.into(), 800.0.into()],
            vec![date(15), "P2".into(), "Beta".into(), 4.0.into(), 0.0.into(), 600.0.into()],
            vec![Value::Null, "P1".into(), Value::Null, 2.0.into(), 1.0.into(), 100.0.into()],
        ])
    }

    #[test]
    fn date_window_inclusive_and_drops_null_dates() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
        .unwrap();
        let out = FilterSet::new().with_date(window).apply(&sample());
        assert_eq!(out.table.len(), 2);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn include_and_exclude() {
        let out = FilterSet::new()
            .with_category(CategoryFilter::new("customer_name").exclude(["Beta"]))
            .apply(&sample());
        assert_eq!(out.table.len(), 2);

        let out = FilterSet::new()
            .with_category(CategoryFilter::new("customer_name").include(["Beta"]))
            .apply(&sample());
        assert_eq!(out.table.len(), 1);
    }

    #[test]
    fn billability_modes() {
        let billable = FilterSet::new()
            .with_billability(Billability::Billable)
            .apply(&sample());
        assert_eq!(billable.table.len(), 2);
        let non = FilterSet::new()
            .with_billability(Billability::NonBillable)
            .apply(&sample());
        assert_eq!(non.table.len(), 1);
    }

    #[test]
    fn project_hours_range_uses_project_totals() {
        // P1 totals 10h, P2 totals 4h
        let out = FilterSet::new()
            .with_project_hours(ValueRange::new(5.0, 20.0).unwrap())
            .apply(&sample());
        assert_eq!(out.table.len(), 2);
        assert!(out
            .table
            .column("project_number")
            .unwrap()
            .all(|v| v.as_str() == Some("P1")));
    }

    #[test]
    fn project_rate_range() {
        // P1 rate 90, P2 rate 150
        let out = FilterSet::new()
            .with_project_effective_rate(ValueRange::new(100.0, 200.0).unwrap())
            .apply(&sample());
        assert_eq!(out.table.len(), 1);
    }

    #[test]
    fn missing_column_is_skipped() {
        let out = FilterSet::new()
            .with_category(CategoryFilter::new("phase_tag").include(["Design"]))
            .apply(&sample());
        assert_eq!(out.table.len(), 3);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(
            out.skipped[0].to_string(),
            "category filter skipped: no column 'phase_tag'"
        );
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let out = FilterSet::new()
            .with_category(CategoryFilter::new("customer_name").include(["Nobody"]))
            .apply(&sample());
        assert!(out.table.is_empty());
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(ValueRange::new(2.0, 1.0).is_err());
    }
}
