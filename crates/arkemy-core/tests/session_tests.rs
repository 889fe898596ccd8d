use arkemy_core::prelude::*;
use arkemy_dataset::{CategoryFilter, DatasetVersion, FilterSet};
use arkemy_test_utils::{scenario_dir, write_dataset, SCENARIO_CSV};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_load_path_makes_dataset_current() {
    let (_dir, path) = scenario_dir();
    let session = Session::new(AppConfig::default()).unwrap();
    let dataset = session.load_path(&path).unwrap();

    let snapshot = session.snapshot().unwrap();
    assert!(Arc::ptr_eq(&dataset, &snapshot));
    assert_eq!(session.currency().map(|c| c.as_str().to_string()), Some("NOK".to_string()));
    assert_eq!(session.loaded_path(), Some(path));
    assert!(session.report().unwrap().is_clean());
}

#[test]
fn test_failed_load_keeps_previous_state() {
    let (dir, path) = scenario_dir();
    let broken = write_dataset(dir.path(), "broken.csv", "record_date,hours_used\n2024-01-01,8\n");
    let session = Session::new(AppConfig::default()).unwrap();
    let before = session.load_path(&path).unwrap();

    let err = session.load_path(&broken).unwrap_err();
    assert!(err.is_load_fatal());
    assert!(Arc::ptr_eq(&before, &session.snapshot().unwrap()));
    assert_eq!(session.loaded_path(), Some(path));
}

#[test]
fn test_currency_override_wins() {
    let (_dir, path) = scenario_dir();
    let config = AppConfig::default().with_currency_override(Some("eur".parse().unwrap()));
    let session = Session::new(config).unwrap();
    session.load_path(&path).unwrap();
    assert_eq!(session.currency().map(|c| c.as_str().to_string()), Some("EUR".to_string()));
}

#[test]
fn test_reset_clears_state() {
    let (_dir, path) = scenario_dir();
    let session = Session::new(AppConfig::default()).unwrap();
    session.load_path(&path).unwrap();
    session.reset();
    assert!(session.snapshot().is_none());
    assert!(session.report().is_none());
}

#[test]
fn test_load_preferred_from_search_paths() {
    let (dir, _path) = scenario_dir();
    write_dataset(dir.path(), "arkemy_unified_NOK_adjusted.csv", SCENARIO_CSV);
    let config = AppConfig::default()
        .with_search_paths([dir.path()])
        .with_preferred_version(Some(DatasetVersion::Adjusted));
    let session = Session::new(config).unwrap();
    let dataset = session.load_preferred().unwrap();
    assert_eq!(dataset.version(), Some(DatasetVersion::Adjusted));
}

#[test]
fn test_load_preferred_skips_newer_parquet() {
    let (dir, path) = scenario_dir();
    let parquet = write_dataset(dir.path(), "arkemy_unified_NOK_regular.parquet", "PAR1");
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
    std::fs::File::options()
        .write(true)
        .open(&parquet)
        .unwrap()
        .set_modified(later)
        .unwrap();

    let session = Session::new(AppConfig::default().with_search_paths([dir.path()])).unwrap();
    let discovered = session.discover().unwrap();
    assert_eq!(discovered[0].path, parquet);

    session.load_preferred().unwrap();
    assert_eq!(session.loaded_path(), Some(path));
}

#[test]
fn test_filtered_partition() {
    let (_dir, path) = scenario_dir();
    let session = Session::new(AppConfig::default()).unwrap();
    session.load_path(&path).unwrap();
    let filters = FilterSet::default()
        .with_category(CategoryFilter::new("project_number").include(["P1"]));
    let outcome = session.filtered("actual", &filters).unwrap();
    assert_eq!(outcome.table.len(), 1);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arkemy.yaml");
    std::fs::write(&path, "debug: true\nload_cache_capacity: 1\nsearch_paths: [/srv/arkemy]\n").unwrap();
    let config = AppConfig::from_path(&path).unwrap();
    assert!(config.debug);
    assert_eq!(config.load_cache_capacity, 1);
    assert_eq!(config.search_paths, vec![std::path::PathBuf::from("/srv/arkemy")]);
}
