//! Unified dataset loader
//!
//! One source file holds every record type. The loader splits it on the
//! discriminator column, validates each partition against the schema,
//! coerces cells to their declared types and returns one [`Table`] per
//! record type. Fatal errors return before anything is built; row-level
//! problems are counted in the [`LoadReport`].

use crate::discovery::{detect_satellites, SatelliteAvailability};
use crate::error::{LoadError, LoadResult};
use crate::labels::TagLabels;
use crate::naming::{CurrencyCode, DatasetVersion};
use crate::report::{BoundViolation, DropReason, LoadReport};
use crate::source;
use crate::table::{DateWindow, RawTable, Row, Table};
use arkemy_schema::{BoundCheck, FieldSpec, FieldType, SchemaRegistry, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const EMPTY_KIND: &str = "(empty)";

/// Validated tables plus side metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: PathBuf,
    currency: Option<CurrencyCode>,
    version: Option<DatasetVersion>,
    tag_labels: TagLabels,
    satellites: SatelliteAvailability,
    tables: IndexMap<String, Table>,
    date_ranges: IndexMap<String, DateWindow>,
}

impl Dataset {
    /// File the dataset was read from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Detected or overridden currency
    #[inline]
    #[must_use]
    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    /// Measure set named in the file name
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<DatasetVersion> {
        self.version
    }

    /// Tag column display labels
    #[inline]
    #[must_use]
    pub fn tag_labels(&self) -> &TagLabels {
        &self.tag_labels
    }

    /// Satellite files found next to the source
    #[inline]
    #[must_use]
    pub fn satellites(&self) -> &SatelliteAvailability {
        &self.satellites
    }

    /// Table of one record type
    #[inline]
    #[must_use]
    pub fn table(&self, kind: &str) -> Option<&Table> {
        self.tables.get(kind)
    }

    /// Tables in schema declaration order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// Row count per record type
    #[must_use]
    pub fn partition_sizes(&self) -> Vec<(&str, usize)> {
        self.tables().map(|(k, t)| (k, t.len())).collect()
    }

    /// Rows across all record types
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }

    /// Observed date range of one record type
    #[inline]
    #[must_use]
    pub fn date_range(&self, kind: &str) -> Option<DateWindow> {
        self.date_ranges.get(kind).copied()
    }

    /// Replace the currency, e.g. with an operator override
    #[must_use]
    pub fn with_currency(mut self, currency: Option<CurrencyCode>) -> Self {
        self.currency = currency;
        self
    }
}

/// Loader bound to one schema
#[derive(Debug, Clone)]
pub struct Loader<'a> {
    schema: &'a SchemaRegistry,
    currency_override: Option<CurrencyCode>,
}

/// A completed load
#[derive(Debug, Clone)]
pub struct Loaded {
    /// The validated dataset
    pub dataset: Dataset,
    /// Non-fatal findings
    pub report: LoadReport,
}

impl<'a> Loader<'a> {
    /// Create loader for a schema
    #[inline]
    #[must_use]
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self {
            schema,
            currency_override: None,
        }
    }

    /// Use this currency instead of the one in the file name
    #[inline]
    #[must_use]
    pub fn with_currency_override(mut self, currency: Option<CurrencyCode>) -> Self {
        self.currency_override = currency;
        self
    }

    /// Read and load a dataset file; satellites are looked up next to it
    ///
    /// # Errors
    /// Fails on unreadable files, a missing discriminator column, or a
    /// non-empty partition missing required fields.
    pub fn load_path(&self, path: &Path) -> LoadResult<Loaded> {
        let raw = source::read_path(path)?;
        let mut loaded = self.load_table(&raw, path)?;
        if let Some(dir) = path.parent() {
            loaded.dataset.satellites = detect_satellites(dir);
        }
        Ok(loaded)
    }

    /// Load an in-memory table; `source` names it for metadata detection
    ///
    /// # Errors
    /// See [`Loader::load_path`].
    pub fn load_table(&self, raw: &RawTable, source: &Path) -> LoadResult<Loaded> {
        let discriminator = self.schema.discriminator();
        let disc_idx =
            raw.column_index(discriminator)
                .ok_or_else(|| LoadError::MissingDiscriminator {
                    column: discriminator.to_string(),
                })?;

        let mut report = LoadReport {
            total_rows: raw.len(),
            ..LoadReport::default()
        };

        let sentinel = self.schema.label_mapping_value();
        let mut label_rows = Vec::new();
        let mut partitions: IndexMap<&str, Vec<&Vec<Option<String>>>> =
            self.schema.record_types().map(|k| (k, Vec::new())).collect();

        for row in raw.rows() {
            let kind = row[disc_idx].as_deref().map_or("", str::trim);
            if kind == sentinel {
                label_rows.push(row);
            } else if let Some(rows) = partitions.get_mut(kind) {
                rows.push(row);
            } else {
                report.record_unknown_kind(if kind.is_empty() { EMPTY_KIND } else { kind });
            }
        }
        report.label_rows = label_rows.len();
        let tag_labels = TagLabels::from_sentinel_rows(raw, label_rows);

        // All partitions are validated before any coercion work
        for (kind, rows) in &partitions {
            if rows.is_empty() {
                continue;
            }
            if let Err(missing) = self.schema.check_required(kind, raw.columns())? {
                return Err(LoadError::schema_violation(*kind, missing));
            }
        }

        let mut tables = IndexMap::new();
        let mut date_ranges = IndexMap::new();
        for (kind, rows) in partitions {
            let plan = self.column_plan(kind, raw, disc_idx, &mut report)?;
            if rows.is_empty() {
                tracing::debug!(record_type = kind, "empty partition");
                report.empty_partitions.push(kind.to_string());
            }
            let table = coerce_partition(kind, &plan, &rows, &mut report);
            if let Some(range) = plan.date_column.and_then(|c| table.date_range(c)) {
                date_ranges.insert(kind.to_string(), range);
            }
            tracing::debug!(record_type = kind, rows = table.len(), "partition loaded");
            tables.insert(kind.to_string(), table);
        }

        let currency = self
            .currency_override
            .clone()
            .or_else(|| CurrencyCode::from_file_name(source));
        let dataset = Dataset {
            source: source.to_path_buf(),
            currency,
            version: DatasetVersion::from_file_name(source),
            tag_labels,
            satellites: SatelliteAvailability::default(),
            tables,
            date_ranges,
        };

        for line in report.summary_lines() {
            tracing::warn!(source = %source.display(), "{}", line);
        }
        tracing::info!(
            source = %source.display(),
            records = dataset.total_records(),
            dropped = report.dropped_rows(),
            currency = ?dataset.currency.as_ref().map(CurrencyCode::as_str),
            "dataset loaded"
        );

        Ok(Loaded { dataset, report })
    }

    /// Output columns of one record type and where their cells come from
    fn column_plan<'s>(
        &'s self,
        kind: &'s str,
        raw: &RawTable,
        disc_idx: usize,
        report: &mut LoadReport,
    ) -> LoadResult<ColumnPlan<'s>> {
        let declared = self.schema.all_fields(kind)?;
        let mut columns = Vec::with_capacity(declared.len());
        let mut date_column = None;

        for name in declared {
            let Some(spec) = self.schema.field(name) else {
                continue;
            };
            if date_column.is_none() && spec.field_type == FieldType::Datetime {
                date_column = Some(name);
            }
            columns.push(PlannedColumn {
                name: name.to_string(),
                source: raw.column_index(name),
                spec: Some(spec),
            });
        }

        for (idx, name) in raw.columns().iter().enumerate() {
            if idx == disc_idx || self.schema.field(name).is_some() {
                continue;
            }
            if self.schema.allow_unknown_fields() {
                columns.push(PlannedColumn {
                    name: name.clone(),
                    source: Some(idx),
                    spec: None,
                });
            } else if !report.skipped_columns.contains(name) {
                report.skipped_columns.push(name.clone());
            }
        }

        Ok(ColumnPlan {
            kind,
            columns,
            date_column,
        })
    }
}

struct PlannedColumn<'s> {
    name: String,
    source: Option<usize>,
    spec: Option<&'s FieldSpec>,
}

struct ColumnPlan<'s> {
    kind: &'s str,
    columns: Vec<PlannedColumn<'s>>,
    date_column: Option<&'s str>,
}

fn coerce_partition(
    kind: &str,
    plan: &ColumnPlan<'_>,
    rows: &[&Vec<Option<String>>],
    report: &mut LoadReport,
) -> Table {
    let mut table = Table::new(plan.columns.iter().map(|c| c.name.clone()));
    let mut violations: IndexMap<&str, BoundViolation> = IndexMap::new();

    'rows: for raw_row in rows {
        let mut row: Row = Vec::with_capacity(plan.columns.len());
        for column in &plan.columns {
            let cell = column.source.and_then(|i| raw_row[i].as_deref());
            let value = match column.spec {
                Some(spec) => match spec.coerce(cell) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::debug!(record_type = kind, column = %column.name, "{}", e);
                        report.record_drop(DropReason::from(&e));
                        continue 'rows;
                    }
                },
                None => cell.map_or(Value::Null, |s| Value::Text(s.to_string())),
            };
            row.push(value);
        }

        for (column, value) in plan.columns.iter().zip(&row) {
            let Some(spec) = column.spec.filter(|s| s.has_bounds()) else {
                continue;
            };
            let check = spec.check_bounds(value);
            if check != BoundCheck::Within {
                violations
                    .entry(column.name.as_str())
                    .or_insert_with(|| BoundViolation {
                        record_type: plan.kind.to_string(),
                        field: column.name.clone(),
                        below: 0,
                        above: 0,
                        min: spec.min_value,
                        max: spec.max_value,
                    })
                    .record(check);
            }
        }
        table.push(row);
    }

    report.bound_violations.extend(violations.into_values());
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(header: &[&str], rows: &[&[&str]]) -> RawTable {
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

    const HEADER: &[&str] = &[
        "record_kind",
        "record_date",
        "person_name",
        "project_number",
        "hours_used",
        "fee_record",
        "cost_record",
        "planned_hours",
        "project_tag_1",
    ];

    #[test]
    fn missing_discriminator_is_fatal() {
        let schema = SchemaRegistry::builtin().unwrap();
        let table = raw(&["record_date"], &[&["2024-01-10"]]);
        let err = Loader::new(&schema)
            .load_table(&table, Path::new("x.csv"))
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingDiscriminator { .. }));
    }

    #[test]
    fn sentinel_row_becomes_labels() {
        let schema = SchemaRegistry::builtin().unwrap();
        let table = raw(
            HEADER,
            &[
                &["label-mapping", "", "", "", "", "", "", "", "Sector"],
                &["actual", "2024-01-10", "Ann", "P1", "8", "800", "400", "", "Housing"],
            ],
        );
        let loaded = Loader::new(&schema)
            .load_table(&table, Path::new("x.csv"))
            .unwrap();
        assert_eq!(loaded.report.label_rows, 1);
        assert_eq!(loaded.dataset.tag_labels().display_name("project_tag_1"), "Sector");
        assert_eq!(loaded.dataset.table("actual").unwrap().len(), 1);
    }

    #[test]
    fn undeclared_columns_pass_through_as_text() {
        let schema = SchemaRegistry::builtin().unwrap();
        let table = raw(
            HEADER,
            &[&["actual", "2024-01-10", "Ann", "P1", "8", "800", "400", "", "Housing"]],
        );
        let loaded = Loader::new(&schema)
            .load_table(&table, Path::new("x.csv"))
            .unwrap();
        let actual = loaded.dataset.table("actual").unwrap();
        let idx = actual.column_index("project_tag_1").unwrap();
        assert_eq!(actual.rows()[0][idx], Value::from("Housing"));
        assert!(!actual.has_column("planned_hours"));
        assert!(!actual.has_column("record_kind"));
    }

    #[test]
    fn empty_partition_is_noted() {
        let schema = SchemaRegistry::builtin().unwrap();
        let table = raw(
            HEADER,
            &[&["actual", "2024-01-10", "Ann", "P1", "8", "800", "400", "", ""]],
        );
        let loaded = Loader::new(&schema)
            .load_table(&table, Path::new("x.csv"))
            .unwrap();
        assert_eq!(loaded.report.empty_partitions, vec!["planned".to_string()]);
        assert!(loaded.dataset.table("planned").unwrap().is_empty());
    }

    #[test]
    fn currency_override_wins() {
        let schema = SchemaRegistry::builtin().unwrap();
        let table = raw(HEADER, &[]);
        let loaded = Loader::new(&schema)
            .with_currency_override(Some("EUR".parse().unwrap()))
            .load_table(&table, Path::new("unified_NOK.csv"))
            .unwrap();
        assert_eq!(loaded.dataset.currency().map(CurrencyCode::as_str), Some("EUR"));
    }
}
