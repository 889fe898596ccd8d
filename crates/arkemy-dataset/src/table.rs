//! In-memory tables
//!
//! [`RawTable`] holds untyped cells straight from a source file. [`Table`]
//! holds coerced [`Value`]s for one record type. Both are column-named,
//! row-major and keep source row order.

use crate::error::FilterError;
use arkemy_schema::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One coerced row
pub type Row = Vec<Value>;

/// Untyped table; `None` marks an empty cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create empty table with the given header
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with empty cells and truncating long ones
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Column names in source order
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in source order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Position of a column
    #[inline]
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Typed table for one record type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create empty table with the given header
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// With rows
    #[must_use]
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        for row in rows {
            self.push(row);
        }
        self
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Column names
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in source order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column
    #[inline]
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column exists
    #[inline]
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, `None` if the column does not exist
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Sum of a numeric column, nulls counted as zero
    #[must_use]
    pub fn sum(&self, name: &str) -> f64 {
        self.column(name)
            .map(|cells| cells.map(Value::as_f64_or_zero).sum())
            .unwrap_or(0.0)
    }

    /// Smallest and largest date in a column
    #[must_use]
    pub fn date_range(&self, name: &str) -> Option<DateWindow> {
        let mut dates = self.column(name)?.filter_map(Value::as_date);
        let first = dates.next()?;
        let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateWindow { start, end })
    }

    /// New table holding the rows that satisfy `keep`
    #[must_use]
    pub fn filter_rows(&self, mut keep: impl FnMut(&Row) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Closed date interval, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day
    pub start: NaiveDate,
    /// Last day
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create window
    ///
    /// # Errors
    /// Returns [`FilterError::InvertedWindow`] when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if end < start {
            return Err(FilterError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Single-day window
    #[inline]
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Whether the date lies inside the window
    #[inline]
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both ends counted
    #[inline]
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Table {
        Table::new(["record_date", "hours_used"]).with_rows(vec![
            vec![Value::Date(date(2024, 1, 15)), Value::Float(4.0)],
            vec![Value::Date(date(2024, 1, 10)), Value::Float(8.0)],
            vec![Value::Null, Value::Null],
        ])
    }

    #[test]
    fn raw_rows_are_padded() {
        let mut raw = RawTable::new(["a", "b", "c"]);
        raw.push_row(vec![Some("1".to_string())]);
        assert_eq!(raw.rows()[0], vec![Some("1".to_string()), None, None]);
    }

    #[test]
    fn sum_treats_null_as_zero() {
        assert!((sample().sum("hours_used") - 12.0).abs() < f64::EPSILON);
        assert!(sample().sum("missing").abs() < f64::EPSILON);
    }

    #[test]
    fn date_range_skips_nulls() {
        let range = sample().date_range("record_date").unwrap();
        assert_eq!(range, DateWindow::new(date(2024, 1, 10), date(2024, 1, 15)).unwrap());
        assert_eq!(range.days(), 6);
    }

    #[test]
    fn inverted_window_rejected() {
        assert!(DateWindow::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn filter_rows_keeps_header() {
        let filtered = sample().filter_rows(|row| !row[0].is_null());
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.columns(), sample().columns());
    }
}
