//! Dataset and satellite file discovery
//!
//! Search paths are tried in order; the first one holding any dataset file
//! wins. Satellite files are optional and only toggle availability flags.

use crate::error::{LoadError, LoadResult};
use crate::naming::{CurrencyCode, DatasetVersion};
use crate::source;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Extensions recognized as dataset files
pub const DATASET_EXTENSIONS: [&str; 3] = ["csv", "parquet", "pq"];

const COWORKER_PATTERN: &str = "coworker";
const PROJECT_METRICS_PATTERN: &str = "hrs_sqm_phase";

/// A candidate dataset file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFile {
    /// Full path
    pub path: PathBuf,
    /// Last modification time
    #[serde(skip)]
    pub modified: SystemTime,
    /// Size in bytes
    pub size: u64,
    /// Measure set named in the file name
    pub version: Option<DatasetVersion>,
    /// Currency named in the file name
    pub currency: Option<CurrencyCode>,
}

impl DatasetFile {
    /// File name for display
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether the loader has a codec for this file
    #[inline]
    #[must_use]
    pub fn is_readable(&self) -> bool {
        source::is_readable(&self.path)
    }
}

/// Which optional satellite files were found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SatelliteAvailability {
    /// Per-person capacity and absence data
    pub person_capacity: Option<PathBuf>,
    /// Per-project auxiliary metrics
    pub project_metrics: Option<PathBuf>,
}

impl SatelliteAvailability {
    /// Whether person capacity data is present
    #[inline]
    #[must_use]
    pub fn has_person_capacity(&self) -> bool {
        self.person_capacity.is_some()
    }

    /// Whether project auxiliary metrics are present
    #[inline]
    #[must_use]
    pub fn has_project_metrics(&self) -> bool {
        self.project_metrics.is_some()
    }
}

fn is_dataset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DATASET_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
}

fn is_satellite(name: &str) -> bool {
    name.contains(COWORKER_PATTERN) || name.contains(PROJECT_METRICS_PATTERN)
}

fn files_in(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("error accessing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
}

/// Dataset files in the first search path that has any, newest first
///
/// Missing directories are skipped. Satellite files are never returned.
///
/// # Errors
/// Returns [`LoadError::NotFound`] when no search path holds a dataset file.
pub fn discover_datasets<P: AsRef<Path>>(search_paths: &[P]) -> LoadResult<Vec<DatasetFile>> {
    for dir in search_paths {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "search path not present");
            continue;
        }

        let mut found: Vec<DatasetFile> = files_in(dir)
            .filter(|entry| is_dataset_file(entry.path()))
            .filter(|entry| !is_satellite(&entry.file_name().to_string_lossy().to_lowercase()))
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                let path = entry.into_path();
                Some(DatasetFile {
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    size: meta.len(),
                    version: DatasetVersion::from_file_name(&path),
                    currency: CurrencyCode::from_file_name(&path),
                    path,
                })
            })
            .collect();

        if !found.is_empty() {
            found.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
            tracing::info!(path = %dir.display(), files = found.len(), "discovered datasets");
            return Ok(found);
        }
    }

    Err(LoadError::NotFound {
        searched: search_paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
    })
}

/// Pick the newest readable file of the preferred version, else the newest
/// readable file
///
/// `files` must be ordered newest first, as returned by [`discover_datasets`].
/// Files without a codec are listed by discovery but never picked.
#[must_use]
pub fn select_preferred(
    files: &[DatasetFile],
    preferred: Option<DatasetVersion>,
) -> Option<&DatasetFile> {
    let mut readable = files.iter().filter(|f| f.is_readable());
    preferred
        .and_then(|version| readable.clone().find(|f| f.version == Some(version)))
        .or_else(|| readable.next())
}

/// Look for satellite files next to a dataset
///
/// Absence of a file only clears the matching flag.
#[must_use]
pub fn detect_satellites(dir: &Path) -> SatelliteAvailability {
    let mut found = SatelliteAvailability::default();
    if !dir.is_dir() {
        return found;
    }

    let mut candidates: Vec<PathBuf> = files_in(dir)
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")))
        .collect();
    candidates.sort();

    for path in candidates {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if found.person_capacity.is_none() && name.contains(COWORKER_PATTERN) {
            found.person_capacity = Some(path);
        } else if found.project_metrics.is_none() && name.contains(PROJECT_METRICS_PATTERN) {
            found.project_metrics = Some(path);
        }
    }

    tracing::debug!(
        person_capacity = found.has_person_capacity(),
        project_metrics = found.has_project_metrics(),
        "satellite detection"
    );
    found
}
