//! Error types for the schema registry
//!
//! Provides error handling for:
//! - Schema loading (file → `SchemaDefinition`)
//! - Structural validation of the loaded definition
//! - Per-cell coercion against a declared field type

use std::path::PathBuf;

/// Errors raised while loading or validating a schema definition
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// IO error during schema read
    #[error("io error reading schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape error
    #[error("schema syntax error: {0}")]
    Syntax(String),

    /// Top-level section absent
    #[error("schema missing required section: {0}")]
    MissingSection(&'static str),

    /// A record type lists a field that has no entry in `fields`
    #[error("record type '{record_type}' references undeclared field '{field}'")]
    UndeclaredField { record_type: String, field: String },

    /// Bounds declared on a field are inverted
    #[error("field '{field}' declares min_value {min} greater than max_value {max}")]
    InvertedBounds { field: String, min: f64, max: f64 },

    /// Bounds declared on a non-numeric field
    #[error("field '{field}' declares numeric bounds but has type {field_type}")]
    BoundsOnNonNumeric { field: String, field_type: String },

    /// Lookup of a record type the schema does not declare
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),
}

impl SchemaError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create undeclared field error
    pub fn undeclared(record_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UndeclaredField {
            record_type: record_type.into(),
            field: field.into(),
        }
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Syntax(err.to_string())
    }
}

/// A raw cell that cannot be converted to its declared type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoerceError {
    /// Value is not a recognizable calendar date
    #[error("unparseable date: '{0}'")]
    InvalidDate(String),

    /// Value is not a finite number
    #[error("non-numeric value: '{0}'")]
    NonNumeric(String),

    /// Value is not a recognizable boolean
    #[error("invalid boolean: '{0}'")]
    InvalidBoolean(String),
}

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
