//! Non-fatal load findings
//!
//! Everything the loader tolerates is counted here so it can be shown to the
//! user as one summary after the load, not only as log lines.

use arkemy_schema::{BoundCheck, CoerceError};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Why a row was dropped during coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Date field could not be parsed
    UnparseableDate,
    /// Numeric field held text
    NonNumeric,
    /// Boolean field held an unrecognized token
    InvalidBoolean,
}

impl From<&CoerceError> for DropReason {
    fn from(err: &CoerceError) -> Self {
        match err {
            CoerceError::InvalidDate(_) => Self::UnparseableDate,
            CoerceError::NonNumeric(_) => Self::NonNumeric,
            CoerceError::InvalidBoolean(_) => Self::InvalidBoolean,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnparseableDate => "unparseable date",
            Self::NonNumeric => "non-numeric value",
            Self::InvalidBoolean => "invalid boolean",
        })
    }
}

/// Values of one field outside its declared bounds; the values are kept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundViolation {
    /// Record type the values belong to
    pub record_type: String,
    /// Field name
    pub field: String,
    /// Count of values below `min`
    pub below: usize,
    /// Count of values above `max`
    pub above: usize,
    /// Declared lower bound
    pub min: Option<f64>,
    /// Declared upper bound
    pub max: Option<f64>,
}

impl BoundViolation {
    /// Total flagged values
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.below + self.above
    }

    pub(crate) fn record(&mut self, check: BoundCheck) {
        match check {
            BoundCheck::Below => self.below += 1,
            BoundCheck::Above => self.above += 1,
            BoundCheck::Within => {}
        }
    }
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}):", self.field, self.record_type)?;
        let mut sep = " ";
        if self.below > 0 {
            write!(f, "{sep}{} below {}", self.below, fmt_bound(self.min))?;
            sep = ", ";
        }
        if self.above > 0 {
            write!(f, "{sep}{} above {}", self.above, fmt_bound(self.max))?;
        }
        Ok(())
    }
}

fn fmt_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |b| b.to_string())
}

fn rows(n: usize) -> &'static str {
    if n == 1 {
        "row"
    } else {
        "rows"
    }
}

/// Findings of one load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Rows read from the source, sentinel rows included
    pub total_rows: usize,
    /// Tag-label sentinel rows removed before partitioning
    pub label_rows: usize,
    /// Rows dropped for an unrecognized discriminator value, per value
    pub unknown_kinds: IndexMap<String, usize>,
    /// Rows dropped during coercion, per reason
    pub dropped: IndexMap<DropReason, usize>,
    /// Out-of-bounds values, retained
    pub bound_violations: Vec<BoundViolation>,
    /// Record types with no rows
    pub empty_partitions: Vec<String>,
    /// Undeclared columns left out because unknown fields are disallowed
    pub skipped_columns: Vec<String>,
}

impl LoadReport {
    /// Count one dropped row
    pub fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_default() += 1;
    }

    /// Count one row with an unrecognized discriminator value
    pub fn record_unknown_kind(&mut self, kind: &str) {
        *self.unknown_kinds.entry(kind.to_string()).or_default() += 1;
    }

    /// Rows dropped for any reason
    #[must_use]
    pub fn dropped_rows(&self) -> usize {
        self.dropped.values().sum::<usize>() + self.unknown_kinds.values().sum::<usize>()
    }

    /// Whether there is nothing to tell the user
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unknown_kinds.is_empty()
            && self.dropped.is_empty()
            && self.bound_violations.is_empty()
            && self.empty_partitions.is_empty()
            && self.skipped_columns.is_empty()
    }

    /// One line per finding category, e.g. `3 rows dropped: unparseable date`
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (reason, &n) in &self.dropped {
            lines.push(format!("{n} {} dropped: {reason}", rows(n)));
        }
        for (kind, &n) in &self.unknown_kinds {
            lines.push(format!("{n} {} dropped: unrecognized record kind '{kind}'", rows(n)));
        }
        for violation in &self.bound_violations {
            lines.push(format!("out of bounds, kept: {violation}"));
        }
        for kind in &self.empty_partitions {
            lines.push(format!("no records of type '{kind}'"));
        }
        for column in &self.skipped_columns {
            lines.push(format!("column '{column}' is not in the schema and was skipped"));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_lines_pluralize() {
        let mut report = LoadReport::default();
        for _ in 0..3 {
            report.record_drop(DropReason::UnparseableDate);
        }
        report.record_unknown_kind("budget");
        assert_eq!(
            report.summary_lines(),
            vec![
                "3 rows dropped: unparseable date".to_string(),
                "1 row dropped: unrecognized record kind 'budget'".to_string(),
            ]
        );
        assert_eq!(report.dropped_rows(), 4);
        assert!(!report.is_clean());
    }

    #[test]
    fn bound_violation_display() {
        let mut v = BoundViolation {
            record_type: "actual".to_string(),
            field: "hours_used".to_string(),
            below: 0,
            above: 0,
            min: Some(0.0),
            max: Some(24.0),
        };
        v.record(BoundCheck::Above);
        v.record(BoundCheck::Above);
        v.record(BoundCheck::Below);
        assert_eq!(v.to_string(), "hours_used (actual): 1 below 0, 2 above 24");
        assert_eq!(v.total(), 3);
    }

    #[test]
    fn default_report_is_clean() {
        assert!(LoadReport::default().is_clean());
        assert!(LoadReport::default().summary_lines().is_empty());
    }
}
