//! Memoized dataset loads using moka
//!
//! Entries are keyed by path, modification time and size, so rewriting a file
//! misses the cache without explicit invalidation.

use crate::error::ArkemyResult;
use arkemy_dataset::{Dataset, LoadError, LoadReport, Loader};
use moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Identity of one file revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadKey {
    /// File path
    pub path: PathBuf,
    /// Last modification time, when the platform reports one
    pub modified: Option<SystemTime>,
    /// Size in bytes
    pub size: u64,
}

impl LoadKey {
    /// Key of the file currently at `path`
    ///
    /// # Errors
    /// [`LoadError::Io`] when the file cannot be inspected.
    pub fn for_path(path: &Path) -> Result<Self, LoadError> {
        let meta = std::fs::metadata(path).map_err(|e| LoadError::io_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            size: meta.len(),
        })
    }
}

/// A finished load shared between cache and session
#[derive(Debug, Clone)]
pub struct CachedLoad {
    /// Loaded dataset
    pub dataset: Arc<Dataset>,
    /// Issues found while loading
    pub report: LoadReport,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Load cache
#[derive(Debug, Clone)]
pub struct LoadCache {
    inner: Cache<LoadKey, CachedLoad>,
}

impl LoadCache {
    /// Create cache holding at most `max_capacity` datasets
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Cached load of `path`, loading on a miss
    ///
    /// Failed loads are not cached.
    ///
    /// # Errors
    /// Propagates [`LoadError`]s from inspecting or loading the file.
    pub fn get_or_load(&self, path: &Path, loader: &Loader<'_>) -> ArkemyResult<CachedLoad> {
        let key = LoadKey::for_path(path)?;
        if let Some(hit) = self.inner.get(&key) {
            tracing::debug!(path = %path.display(), "load cache hit");
            return Ok(hit);
        }

        let loaded = loader.load_path(path)?;
        let entry = CachedLoad {
            dataset: Arc::new(loaded.dataset),
            report: loaded.report,
        };
        self.inner.insert(key, entry.clone());
        Ok(entry)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::SchemaRegistry;

    const CSV: &str = "record_kind,record_date,person_name,project_number,hours_used,fee_record,cost_record\n\
                       actual,2024-01-10,Ann,P1,8,800,400\n";

    #[test]
    fn hit_returns_same_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, CSV).unwrap();
        let schema = SchemaRegistry::builtin().unwrap();
        let loader = Loader::new(&schema);
        let cache = LoadCache::new(2);

        let first = cache.get_or_load(&path, &loader).unwrap();
        let second = cache.get_or_load(&path, &loader).unwrap();
        assert!(Arc::ptr_eq(&first.dataset, &second.dataset));
    }

    #[test]
    fn rewritten_file_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, CSV).unwrap();
        let schema = SchemaRegistry::builtin().unwrap();
        let loader = Loader::new(&schema);
        let cache = LoadCache::new(2);

        let first = cache.get_or_load(&path, &loader).unwrap();
        std::fs::write(&path, format!("{CSV}actual,2024-01-11,Bo,P2,4,400,100\n")).unwrap();
        let second = cache.get_or_load(&path, &loader).unwrap();
        assert!(!Arc::ptr_eq(&first.dataset, &second.dataset));
        assert_eq!(second.dataset.total_records(), 2);
    }

    #[test]
    fn missing_file_is_load_error() {
        let schema = SchemaRegistry::builtin().unwrap();
        let err = LoadCache::new(1)
            .get_or_load(Path::new("/nonexistent/data.csv"), &Loader::new(&schema))
            .unwrap_err();
        assert!(err.is_load_fatal());
    }
}
