//! Error types for analytics
//!
//! Aggregations never fail: degenerate input yields empty or zeroed results.
//! Only window arithmetic can be asked for something impossible.

use chrono::NaiveDate;

/// Errors computing period windows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// A month window of length zero
    #[error("window length must be at least one month")]
    ZeroLength,

    /// Date arithmetic left the supported calendar range
    #[error("window arithmetic out of range from anchor {anchor}")]
    OutOfRange { anchor: NaiveDate },

    /// Calendar year with no valid January 1st or December 31st
    #[error("invalid calendar year: {0}")]
    InvalidYear(i32),
}

impl PeriodError {
    /// Create out-of-range error
    #[inline]
    #[must_use]
    pub fn out_of_range(anchor: NaiveDate) -> Self {
        Self::OutOfRange { anchor }
    }
}

/// Result type alias for period operations
pub type PeriodResult<T> = Result<T, PeriodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_display() {
        assert_eq!(
            PeriodError::ZeroLength.to_string(),
            "window length must be at least one month"
        );
    }

    #[test]
    fn out_of_range_display() {
        let anchor = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(
            PeriodError::out_of_range(anchor).to_string(),
            "window arithmetic out of range from anchor 2025-06-30"
        );
    }
}
