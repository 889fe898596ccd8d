//! Testing utilities for Arkemy workspace
//!
//! Shared fixtures: the three-record scenario, raw table builders and
//! on-disk dataset files.

#![allow(missing_docs)]

use arkemy_dataset::{Dataset, Loaded, Loader, RawTable};
use arkemy_schema::SchemaRegistry;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Header of the unified fixture files
pub const UNIFIED_HEADER: &[&str] = &[
    "record_kind",
    "record_date",
    "person_name",
    "project_number",
    "project_name",
    "customer_name",
    "hours_used",
    "hours_billable",
    "fee_record",
    "cost_record",
    "planned_hours",
    "planned_fee",
    "project_tag_1",
];

/// Two actual records and one planned record
pub const SCENARIO_CSV: &str = "\
record_kind,record_date,person_name,project_number,project_name,customer_name,hours_used,hours_billable,fee_record,cost_record,planned_hours,planned_fee,project_tag_1
actual,2024-01-10,Ann,P1,Library,Acme,8,8,800,400,,,Housing
actual,2024-01-15,Bo,P2,School,Beta,4,2,600,100,,,
planned,2024-02-01,Ann,P1,Library,Acme,,,,,10,1200,
";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn builtin_schema() -> SchemaRegistry {
    SchemaRegistry::builtin().unwrap()
}

/// Build a raw table from string cells; empty strings become `None`
pub fn raw_table(header: &[&str], rows: &[&[&str]]) -> RawTable {
    let mut table = RawTable::new(header.iter().copied());
    for row in rows {
        table.push_row(
            row.iter()
                .map(|c| if c.is_empty() { None } else { Some((*c).to_string()) })
                .collect(),
        );
    }
    table
}

/// Parse CSV text into a raw table
pub fn raw_from_csv(csv: &str) -> RawTable {
    arkemy_dataset::source::read_csv(csv.as_bytes(), Path::new("fixture.csv")).unwrap()
}

/// Load CSV text with the builtin schema under the given file name
pub fn load_csv_named(csv: &str, name: &str) -> Loaded {
    let schema = builtin_schema();
    Loader::new(&schema)
        .load_table(&raw_from_csv(csv), Path::new(name))
        .unwrap()
}

/// The three-record scenario, loaded
pub fn scenario_dataset() -> Dataset {
    load_csv_named(SCENARIO_CSV, "arkemy_unified_NOK_regular.csv").dataset
}

/// Write CSV text into `dir` and return the path
pub fn write_dataset(dir: &Path, name: &str, csv: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, csv).unwrap();
    path
}

/// Temporary directory holding the scenario file
pub fn scenario_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), "arkemy_unified_NOK_regular.csv", SCENARIO_CSV);
    (dir, path)
}

/// Monthly actual records for one project from `first` through `last`
///
/// Each row is dated the 15th and carries `hours` hours at 100 per hour with
/// half of the fee as cost.
pub fn monthly_actuals(first: NaiveDate, months: u32, hours: f64) -> String {
    let mut csv = UNIFIED_HEADER.join(",");
    csv.push('\n');
    let mut current = first;
    for _ in 0..months {
        let fee = hours * 100.0;
        csv.push_str(&format!(
            "actual,{},Ann,P1,Library,Acme,{hours},{hours},{fee},{},,,\n",
            current.format("%Y-%m-15"),
            fee / 2.0
        ));
        current = current
            .checked_add_months(chrono::Months::new(1))
            .unwrap();
    }
    csv
}
