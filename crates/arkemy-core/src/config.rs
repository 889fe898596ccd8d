//! Application configuration
//!
//! Read from an optional YAML file. Every field has a default, so an empty
//! file and no file at all behave the same.

use crate::error::{ArkemyError, ArkemyResult};
use arkemy_analytics::DEFAULT_WORK_HOURS_PER_DAY;
use arkemy_dataset::{CurrencyCode, DatasetVersion};
use arkemy_schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of loaded datasets kept in memory
pub const DEFAULT_LOAD_CACHE_CAPACITY: u64 = 4;

/// Directories searched for datasets when none is configured
pub const DEFAULT_SEARCH_PATHS: [&str; 2] = ["/data", "./data"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Schema file; the built-in schema when unset
    pub schema_path: Option<PathBuf>,
    /// Directories searched for datasets, in order
    pub search_paths: Vec<PathBuf>,
    /// Verbose logging
    pub debug: bool,
    /// Dataset version picked when both are present
    pub preferred_version: Option<DatasetVersion>,
    /// Currency used instead of the one in the file name
    pub currency_override: Option<CurrencyCode>,
    /// Loaded datasets kept in memory
    pub load_cache_capacity: u64,
    /// Standard working day for utilization
    pub work_hours_per_day: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            debug: false,
            preferred_version: None,
            currency_override: None,
            load_cache_capacity: DEFAULT_LOAD_CACHE_CAPACITY,
            work_hours_per_day: DEFAULT_WORK_HOURS_PER_DAY,
        }
    }
}

impl AppConfig {
    /// Parse YAML text
    ///
    /// # Errors
    /// [`ArkemyError::Config`] naming `origin` when the text is malformed or
    /// the working day is not a positive number of hours.
    pub fn from_yaml_str(source: &str, origin: &Path) -> ArkemyResult<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(source)
            .map_err(|e| ArkemyError::config_error(origin, e.to_string()))?;
        if !(config.work_hours_per_day.is_finite() && config.work_hours_per_day > 0.0) {
            return Err(ArkemyError::config_error(
                origin,
                format!("work_hours_per_day must be positive, got {}", config.work_hours_per_day),
            ));
        }
        Ok(config)
    }

    /// Read a YAML config file
    ///
    /// # Errors
    /// [`ArkemyError::ConfigIo`] when unreadable, [`ArkemyError::Config`]
    /// when malformed.
    pub fn from_path(path: impl AsRef<Path>) -> ArkemyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ArkemyError::config_io(path, e))?;
        let config = Self::from_yaml_str(&source, path)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Set schema file
    #[must_use]
    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    /// Replace search paths
    #[must_use]
    pub fn with_search_paths<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set debug mode
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set preferred dataset version
    #[must_use]
    pub fn with_preferred_version(mut self, version: Option<DatasetVersion>) -> Self {
        self.preferred_version = version;
        self
    }

    /// Set currency override
    #[must_use]
    pub fn with_currency_override(mut self, currency: Option<CurrencyCode>) -> Self {
        self.currency_override = currency;
        self
    }

    /// Set load cache capacity
    #[must_use]
    pub fn with_load_cache_capacity(mut self, capacity: u64) -> Self {
        self.load_cache_capacity = capacity;
        self
    }

    /// Set the working day used for utilization
    #[must_use]
    pub fn with_work_hours_per_day(mut self, hours: f64) -> Self {
        self.work_hours_per_day = hours;
        self
    }

    /// Default log level for this config
    #[inline]
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Load the configured schema, or the built-in one
    ///
    /// # Errors
    /// Propagates schema read and validation errors.
    pub fn load_schema(&self) -> ArkemyResult<SchemaRegistry> {
        let schema = match &self.schema_path {
            Some(path) => SchemaRegistry::from_path(path)?,
            None => SchemaRegistry::builtin()?,
        };
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_default() {
        let config = AppConfig::from_yaml_str("  \n", Path::new("a.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.search_paths.len(), 2);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let yaml = "debug: true\npreferred_version: adjusted\ncurrency_override: sek\n";
        let config = AppConfig::from_yaml_str(yaml, Path::new("a.yaml")).unwrap();
        assert!(config.debug);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.preferred_version, Some(DatasetVersion::Adjusted));
        assert_eq!(config.currency_override.as_ref().map(CurrencyCode::as_str), Some("SEK"));
        assert_eq!(config.load_cache_capacity, DEFAULT_LOAD_CACHE_CAPACITY);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = AppConfig::from_yaml_str("colour: blue\n", Path::new("a.yaml")).unwrap_err();
        assert!(matches!(err, ArkemyError::Config { .. }));
    }

    #[test]
    fn working_day_must_be_positive() {
        let config = AppConfig::from_yaml_str("work_hours_per_day: 7.5\n", Path::new("a.yaml")).unwrap();
        assert_eq!(config.work_hours_per_day, 7.5);
        let err = AppConfig::from_yaml_str("work_hours_per_day: 0\n", Path::new("a.yaml")).unwrap_err();
        assert!(err.to_string().contains("work_hours_per_day"));
    }

    #[test]
    fn builtin_schema_when_unset() {
        let schema = AppConfig::default().load_schema().unwrap();
        assert_eq!(schema.discriminator(), "record_kind");
    }
}
