//! Error types for dataset loading and filtering
//!
//! Only load-fatal conditions are errors. Row-level drops and bound
//! violations are collected in [`crate::LoadReport`] instead.

use arkemy_schema::SchemaError;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Errors that abort a load; no partial dataset is produced
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// IO error during read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text
    #[error("malformed data in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// File extension has no reader
    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Discriminator column absent from the dataset
    #[error("dataset has no '{column}' column; cannot tell record types apart")]
    MissingDiscriminator { column: String },

    /// A non-empty partition lacks required columns
    #[error("record type '{record_type}' is missing required field(s): {}", missing.join(", "))]
    SchemaViolation {
        record_type: String,
        missing: Vec<String>,
    },

    /// No dataset file in any search path
    #[error("no dataset found in: {}", display_paths(searched))]
    NotFound { searched: Vec<PathBuf> },

    /// Schema lookup failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create schema violation error
    pub fn schema_violation(record_type: impl Into<String>, missing: Vec<String>) -> Self {
        Self::SchemaViolation {
            record_type: record_type.into(),
            missing,
        }
    }
}

/// Errors constructing filter predicates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// Window end precedes its start
    #[error("date window ends ({end}) before it starts ({start})")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },

    /// Range minimum exceeds maximum
    #[error("range minimum {min} exceeds maximum {max}")]
    InvertedRange { min: f64, max: f64 },
}

/// Result type alias for load operations
pub type LoadResult<T> = Result<T, LoadError>;
