//! Process-wide session state
//!
//! One [`Session`] is built at startup. It owns the schema and config and
//! holds the current dataset behind an `Arc`, so readers take cheap
//! snapshots and never see a half-replaced state.

use crate::cache::{CachedLoad, LoadCache};
use crate::config::AppConfig;
use crate::error::ArkemyResult;
use arkemy_dataset::{
    discover_datasets, select_preferred, CurrencyCode, Dataset, DatasetFile, FilterOutcome,
    FilterSet, LoadError, LoadReport, Loader,
};
use arkemy_schema::SchemaRegistry;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct SessionState {
    dataset: Option<Arc<Dataset>>,
    report: Option<LoadReport>,
    path: Option<PathBuf>,
}

/// Shared state of one running application
#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    schema: SchemaRegistry,
    cache: LoadCache,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create session, loading the configured schema
    ///
    /// # Errors
    /// Propagates schema errors.
    pub fn new(config: AppConfig) -> ArkemyResult<Self> {
        let schema = config.load_schema()?;
        Ok(Self::with_schema(config, schema))
    }

    /// Create session around an already loaded schema
    #[must_use]
    pub fn with_schema(config: AppConfig, schema: SchemaRegistry) -> Self {
        let cache = LoadCache::new(config.load_cache_capacity);
        Self {
            config,
            schema,
            cache,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Application config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Schema in use
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Load cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }

    /// Current dataset, if one is loaded
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.state.read().dataset.clone()
    }

    /// Report of the current dataset's load
    #[must_use]
    pub fn report(&self) -> Option<LoadReport> {
        self.state.read().report.clone()
    }

    /// Path the current dataset came from
    #[must_use]
    pub fn loaded_path(&self) -> Option<PathBuf> {
        self.state.read().path.clone()
    }

    /// Currency of the current dataset
    #[must_use]
    pub fn currency(&self) -> Option<CurrencyCode> {
        self.state
            .read()
            .dataset
            .as_ref()
            .and_then(|d| d.currency().cloned())
    }

    /// Make `dataset` current
    pub fn replace(&self, dataset: Arc<Dataset>, report: LoadReport) {
        let path = dataset.source().to_path_buf();
        *self.state.write() = SessionState {
            dataset: Some(dataset),
            report: Some(report),
            path: Some(path),
        };
    }

    /// Forget the current dataset
    pub fn reset(&self) {
        *self.state.write() = SessionState::default();
        tracing::debug!("session reset");
    }

    /// Load `path` and make it current
    ///
    /// On error the previous dataset stays current.
    ///
    /// # Errors
    /// Propagates load-fatal errors.
    pub fn load_path(&self, path: &Path) -> ArkemyResult<Arc<Dataset>> {
        let loader = Loader::new(&self.schema).with_currency_override(self.config.currency_override.clone());
        let CachedLoad { dataset, report } = self.cache.get_or_load(path, &loader)?;
        tracing::info!(
            path = %path.display(),
            records = dataset.total_records(),
            currency = dataset.currency().map_or("unset", CurrencyCode::as_str),
            "dataset is current"
        );
        self.replace(Arc::clone(&dataset), report);
        Ok(dataset)
    }

    /// Datasets in the configured search paths, newest first
    ///
    /// # Errors
    /// [`LoadError::NotFound`] when no search path holds a dataset.
    pub fn discover(&self) -> ArkemyResult<Vec<DatasetFile>> {
        Ok(discover_datasets(&self.config.search_paths)?)
    }

    /// Discover datasets and load the preferred one
    ///
    /// # Errors
    /// Discovery and load errors.
    pub fn load_preferred(&self) -> ArkemyResult<Arc<Dataset>> {
        let files = self.discover()?;
        let file = select_preferred(&files, self.config.preferred_version).ok_or_else(|| {
            LoadError::NotFound {
                searched: self.config.search_paths.clone(),
            }
        })?;
        self.load_path(&file.path)
    }

    /// Apply filters to one partition of the current dataset
    #[must_use]
    pub fn filtered(&self, kind: &str, filters: &FilterSet) -> Option<FilterOutcome> {
        let dataset = self.snapshot()?;
        dataset.table(kind).map(|table| filters.apply(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty() {
        let session = Session::new(AppConfig::default()).unwrap();
        assert!(session.snapshot().is_none());
        assert!(session.currency().is_none());
        assert!(session.filtered("actual", &FilterSet::default()).is_none());
    }
}
