//! Top-level error type
//!
//! Wraps the error of every pipeline stage so callers handle one type:
//! - Schema configuration failures
//! - Load-fatal dataset problems
//! - Invalid filter or window parameters
//! - Application config errors

use arkemy_analytics::PeriodError;
use arkemy_dataset::{FilterError, LoadError};
use arkemy_schema::SchemaError;
use std::path::PathBuf;

/// Main Arkemy error type
#[derive(Debug, thiserror::Error)]
pub enum ArkemyError {
    /// Schema could not be loaded
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Dataset could not be loaded
    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    /// Filter parameters are inconsistent
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Period window could not be computed
    #[error("invalid period: {0}")]
    Period(#[from] PeriodError),

    /// Config file unreadable
    #[error("io error reading config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file malformed
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl ArkemyError {
    /// Create config error for path
    pub fn config_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create config IO error for path
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stopped a dataset from loading
    #[inline]
    #[must_use]
    pub fn is_load_fatal(&self) -> bool {
        matches!(self, Self::Load(_) | Self::Schema(_))
    }
}

/// Result type alias for Arkemy operations
pub type ArkemyResult<T> = Result<T, ArkemyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_are_fatal() {
        let err: ArkemyError = LoadError::MissingDiscriminator {
            column: "record_kind".to_string(),
        }
        .into();
        assert!(err.is_load_fatal());
        assert_eq!(
            err.to_string(),
            "load failed: dataset has no 'record_kind' column; cannot tell record types apart"
        );
    }

    #[test]
    fn period_errors_are_not_load_fatal() {
        let err: ArkemyError = PeriodError::ZeroLength.into();
        assert!(!err.is_load_fatal());
    }

    #[test]
    fn config_error_display() {
        let err = ArkemyError::config_error("arkemy.yaml", "bad field");
        assert_eq!(err.to_string(), "configuration error in arkemy.yaml: bad field");
    }
}
