//! Group-by aggregation over one business dimension
//!
//! Every dimension produces the same fixed-shape [`AggregateRow`]. Groups
//! appear in first-appearance order; callers sort explicitly.

use crate::measures::{Measure, MeasureColumns, MeasureIndex, Totals};
use arkemy_dataset::{Row, Table};
use chrono::Datelike;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a group's distinct count counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistinctCount {
    /// Distinct project identifiers
    Projects,
    /// Distinct people
    People,
    /// Rows
    Records,
}

/// Grouping dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Customer, labelled by name
    Customer,
    /// Customer segment
    CustomerGroup,
    /// Project, labelled by name
    Project,
    /// Person
    Person,
    /// Project phase
    Phase,
    /// Activity
    Activity,
    /// Contract price model
    PriceModel,
    /// Any tag column chosen at call time
    Tag(String),
    /// Record date itself
    Day,
    /// ISO week of the record date, keyed `2024-W01`
    Week,
    /// Calendar year of the record date
    Year,
    /// Calendar month of the record date
    Month,
}

impl Dimension {
    /// Column holding the grouping key; calendar dimensions read the date column
    #[must_use]
    pub fn key_column<'a>(&'a self, measures: &'a MeasureColumns) -> &'a str {
        match self {
            Self::Customer => "customer_number",
            Self::CustomerGroup => "customer_group",
            Self::Project => "project_number",
            Self::Person => "person_name",
            Self::Phase => "phase_tag",
            Self::Activity => "activity_tag",
            Self::PriceModel => "price_model_type",
            Self::Tag(column) => column,
            Self::Day | Self::Week | Self::Year | Self::Month => &measures.date,
        }
    }

    /// Column holding a display label for the key, if separate
    #[must_use]
    pub fn label_column(&self) -> Option<&'static str> {
        match self {
            Self::Customer => Some("customer_name"),
            Self::Project => Some("project_name"),
            _ => None,
        }
    }

    /// Label of the group collecting null keys
    #[must_use]
    pub fn null_label(&self) -> &'static str {
        match self {
            Self::Customer => "Unknown Customer",
            Self::CustomerGroup => "Unknown Group",
            Self::Project => "Unknown Project",
            Self::Person => "Unknown Person",
            Self::Phase => "No Phase",
            Self::Activity => "No Activity",
            Self::PriceModel => "No Price Model",
            Self::Tag(_) => "Untagged",
            Self::Day | Self::Week | Self::Year | Self::Month => "No Date",
        }
    }

    /// What the distinct count of a group counts
    #[must_use]
    pub fn distinct_count(&self) -> DistinctCount {
        match self {
            Self::Project => DistinctCount::People,
            _ => DistinctCount::Projects,
        }
    }

    /// Grouping key of one row; `None` for a null key
    pub(crate) fn key(&self, row: &Row, key_idx: usize) -> Option<String> {
        let cell = &row[key_idx];
        match self {
            Self::Day => cell.as_date().map(|d| d.format("%Y-%m-%d").to_string()),
            Self::Week => cell.as_date().map(|d| {
                let week = d.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }),
            Self::Year => cell.as_date().map(|d| d.year().to_string()),
            Self::Month => cell.as_date().map(|d| d.format("%Y-%m").to_string()),
            _ => cell.to_key(),
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "customer" => Self::Customer,
            "customer_group" => Self::CustomerGroup,
            "project" => Self::Project,
            "person" => Self::Person,
            "phase" => Self::Phase,
            "activity" => Self::Activity,
            "price_model" => Self::PriceModel,
            "day" => Self::Day,
            "week" => Self::Week,
            "year" => Self::Year,
            "month" => Self::Month,
            other => match other.strip_prefix("tag:") {
                Some(column) if !column.is_empty() => Self::Tag(column.to_string()),
                _ => return Err(format!("unknown dimension: '{other}'")),
            },
        })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => f.write_str("customer"),
            Self::CustomerGroup => f.write_str("customer_group"),
            Self::Project => f.write_str("project"),
            Self::Person => f.write_str("person"),
            Self::Phase => f.write_str("phase"),
            Self::Activity => f.write_str("activity"),
            Self::PriceModel => f.write_str("price_model"),
            Self::Tag(column) => write!(f, "tag:{column}"),
            Self::Day => f.write_str("day"),
            Self::Week => f.write_str("week"),
            Self::Year => f.write_str("year"),
            Self::Month => f.write_str("month"),
        }
    }
}

/// Share of the grand total per summable measure, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shares {
    /// Hours share
    pub hours: f64,
    /// Billable hours share
    pub billable_hours: f64,
    /// Fee share
    pub fee: f64,
    /// Cost share
    pub cost: f64,
    /// Profit share
    pub profit: f64,
}

impl Shares {
    /// Share of one measure, `None` for measures outside the summable list
    #[must_use]
    pub fn get(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Hours => Some(self.hours),
            Measure::BillableHours => Some(self.billable_hours),
            Measure::Fee => Some(self.fee),
            Measure::Cost => Some(self.cost),
            Measure::Profit => Some(self.profit),
            _ => None,
        }
    }

    fn of(totals: &Totals, grand: &Totals) -> Self {
        let share = |value: f64, total: f64| {
            if total == 0.0 {
                0.0
            } else {
                value / total * 100.0
            }
        };
        Self {
            hours: share(totals.hours, grand.hours),
            billable_hours: share(totals.billable_hours, grand.billable_hours),
            fee: share(totals.fee, grand.fee),
            cost: share(totals.cost, grand.cost),
            profit: share(totals.profit(), grand.profit()),
        }
    }
}

/// One group of an aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Grouping key; `None` for the null group
    pub key: Option<String>,
    /// Display label
    pub label: String,
    /// Summed measures
    pub totals: Totals,
    /// Hours minus billable hours
    pub non_billable_hours: f64,
    /// Fee minus cost
    pub profit: f64,
    /// Billable share of hours, percent
    pub billability: f64,
    /// Fee per hour
    pub effective_rate: f64,
    /// Fee per billable hour
    pub billable_rate: f64,
    /// Profit share of fee, percent
    pub profit_margin: f64,
    /// Distinct projects, people or rows, per the dimension
    pub distinct_count: usize,
    /// Rows in the group
    pub records: usize,
    /// Shares of the grand total
    pub shares: Shares,
}

impl AggregateRow {
    pub(crate) fn from_group(key: Option<String>, label: String, group: &Group) -> Self {
        let totals = group.totals;
        Self {
            key,
            label,
            totals,
            non_billable_hours: totals.non_billable_hours(),
            profit: totals.profit(),
            billability: totals.billability(),
            effective_rate: totals.effective_rate(),
            billable_rate: totals.billable_rate(),
            profit_margin: totals.profit_margin(),
            distinct_count: group.distinct_count(),
            records: group.records,
            shares: Shares::default(),
        }
    }

    /// Value of a measure
    #[must_use]
    pub fn value(&self, measure: Measure) -> f64 {
        match measure {
            #[allow(clippy::cast_precision_loss)]
            Measure::DistinctCount => self.distinct_count as f64,
            #[allow(clippy::cast_precision_loss)]
            Measure::Records => self.records as f64,
            other => other.of_totals(&self.totals).unwrap_or_default(),
        }
    }

    /// Share of the grand total, for summable measures
    #[inline]
    #[must_use]
    pub fn share(&self, measure: Measure) -> Option<f64> {
        self.shares.get(measure)
    }
}

/// Running accumulator of one group
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub(crate) totals: Totals,
    pub(crate) records: usize,
    pub(crate) label: Option<String>,
    distinct: IndexSet<String>,
    counting: DistinctCount,
}

impl Group {
    pub(crate) fn new(counting: DistinctCount) -> Self {
        Self {
            totals: Totals::default(),
            records: 0,
            label: None,
            distinct: IndexSet::new(),
            counting,
        }
    }

    pub(crate) fn add_row(&mut self, row: &Row, index: &MeasureIndex, distinct_idx: Option<usize>) {
        self.totals.add(&index.totals(row));
        self.records += 1;
        if let Some(key) = distinct_idx.and_then(|i| row[i].to_key()) {
            self.distinct.insert(key);
        }
    }

    fn distinct_count(&self) -> usize {
        match self.counting {
            DistinctCount::Records => self.records,
            DistinctCount::Projects | DistinctCount::People => self.distinct.len(),
        }
    }
}

/// Column positions a dimension needs, or `None` when it cannot be grouped
pub(crate) struct GroupingColumns {
    pub(crate) key: usize,
    pub(crate) label: Option<usize>,
    pub(crate) distinct: Option<usize>,
    pub(crate) measures: MeasureIndex,
}

impl GroupingColumns {
    pub(crate) fn resolve(
        dimension: &Dimension,
        table: &Table,
        measures: &MeasureColumns,
    ) -> Option<Self> {
        let key = table.column_index(dimension.key_column(measures))?;
        if table.rows().iter().all(|row| row[key].is_null()) {
            return None;
        }
        let distinct = match dimension.distinct_count() {
            DistinctCount::Projects => table.column_index(&measures.project),
            DistinctCount::People => table.column_index(&measures.person),
            DistinctCount::Records => None,
        };
        Some(Self {
            key,
            label: dimension.label_column().and_then(|c| table.column_index(c)),
            distinct,
            measures: MeasureIndex::resolve(table, measures),
        })
    }
}

pub(crate) fn label_of(dimension: &Dimension, key: Option<&String>, group: &Group) -> String {
    group
        .label
        .clone()
        .or_else(|| key.cloned())
        .unwrap_or_else(|| dimension.null_label().to_string())
}

/// Fill in shares relative to the grand total of `rows`
pub fn apply_shares(rows: &mut [AggregateRow]) {
    let grand = grand_totals(rows);
    for row in rows {
        row.shares = Shares::of(&row.totals, &grand);
    }
}

pub(crate) fn apply_shares_against(rows: &mut [AggregateRow], grand: &Totals) {
    for row in rows {
        row.shares = Shares::of(&row.totals, grand);
    }
}

pub(crate) fn grand_totals(rows: &[AggregateRow]) -> Totals {
    rows.iter().fold(Totals::default(), |mut acc, row| {
        acc.add(&row.totals);
        acc
    })
}

/// Aggregate `table` by `dimension`
///
/// Returns one row per distinct key in first-appearance order, nulls grouped
/// under the dimension's null label. An empty table, a missing key column or
/// a key column that is entirely null yields an empty vector.
#[must_use]
pub fn aggregate_by(
    dimension: &Dimension,
    table: &Table,
    measures: &MeasureColumns,
) -> Vec<AggregateRow> {
    let Some(columns) = GroupingColumns::resolve(dimension, table, measures) else {
        tracing::debug!(%dimension, rows = table.len(), "nothing to aggregate");
        return Vec::new();
    };

    let mut groups: IndexMap<Option<String>, Group> = IndexMap::new();
    for row in table.rows() {
        let key = dimension.key(row, columns.key);
        let group = groups
            .entry(key)
            .or_insert_with(|| Group::new(dimension.distinct_count()));
        group.add_row(row, &columns.measures, columns.distinct);
        if group.label.is_none() {
            group.label = columns.label.and_then(|i| row[i].to_key());
        }
    }

    let mut rows: Vec<AggregateRow> = groups
        .iter()
        .map(|(key, group)| {
            AggregateRow::from_group(key.clone(), label_of(dimension, key.as_ref(), group), group)
        })
        .collect();
    apply_shares(&mut rows);

    tracing::debug!(%dimension, groups = rows.len(), "aggregated");
    rows
}

/// Sort rows by a measure; ties keep their relative order
pub fn sort_by(rows: &mut [AggregateRow], measure: Measure, descending: bool) {
    rows.sort_by(|a, b| {
        let ord = a.value(measure).total_cmp(&b.value(measure));
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// The `n` largest rows by a measure
#[must_use]
pub fn top_n(rows: &[AggregateRow], measure: Measure, n: usize) -> Vec<AggregateRow> {
    let mut sorted = rows.to_vec();
    sort_by(&mut sorted, measure, true);
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::Value;
    use chrono::NaiveDate;

    fn row(date: (i32, u32, u32), project: &str, person: &str, hours: f64, fee: f64) -> Row {
        vec![
            Value::Date(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap()),
            Value::from(project),
            Value::from(person),
            Value::Float(hours),
            Value::Float(fee),
        ]
    }

    fn sample() -> Table {
        Table::new(["record_date", "project_number", "person_name", "hours_used", "fee_record"])
            .with_rows(vec![
                row((2023, 12, 1), "P1", "Ann", 2.0, 200.0),
                row((2024, 1, 1), "P2", "Bo", 3.0, 300.0),
                row((2024, 1, 2), "P1", "Bo", 5.0, 500.0),
            ])
    }

    #[test]
    fn first_appearance_order() {
        let rows = aggregate_by(&Dimension::Project, &sample(), &MeasureColumns::actual());
        let keys: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(keys, vec!["P1", "P2"]);
        assert_eq!(rows[0].distinct_count, 2);
    }

    #[test]
    fn year_and_month_derive_from_date() {
        let years = aggregate_by(&Dimension::Year, &sample(), &MeasureColumns::actual());
        assert_eq!(years.len(), 2);
        assert_eq!(years[1].key.as_deref(), Some("2024"));
        assert!((years[1].totals.hours - 8.0).abs() < 1e-9);

        let months = aggregate_by(&Dimension::Month, &sample(), &MeasureColumns::actual());
        assert_eq!(months[0].key.as_deref(), Some("2023-12"));
    }

    #[test]
    fn week_uses_iso_year() {
        // 2024-12-30 falls in ISO week 1 of 2025
        let table = Table::new(["record_date", "hours_used"]).with_rows(vec![
            vec![Value::Date(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap()), Value::Float(1.0)],
            vec![Value::Date(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()), Value::Float(2.0)],
            vec![Value::Date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()), Value::Float(4.0)],
        ]);
        let weeks = aggregate_by(&Dimension::Week, &table, &MeasureColumns::actual());
        let keys: Vec<_> = weeks.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(keys, vec!["2025-W01", "2025-W02"]);
        assert!((weeks[0].totals.hours - 3.0).abs() < 1e-9);

        let days = aggregate_by(&Dimension::Day, &table, &MeasureColumns::actual());
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].key.as_deref(), Some("2024-12-30"));
    }

    #[test]
    fn missing_column_is_empty() {
        assert!(aggregate_by(&Dimension::Phase, &sample(), &MeasureColumns::actual()).is_empty());
    }

    #[test]
    fn all_null_column_is_empty() {
        let table = Table::new(["phase_tag", "hours_used"])
            .with_rows(vec![vec![Value::Null, Value::Float(1.0)]]);
        assert!(aggregate_by(&Dimension::Phase, &table, &MeasureColumns::actual()).is_empty());
    }

    #[test]
    fn null_keys_grouped_under_label() {
        let table = Table::new(["phase_tag", "hours_used"]).with_rows(vec![
            vec![Value::from("Design"), Value::Float(1.0)],
            vec![Value::Null, Value::Float(3.0)],
        ]);
        let rows = aggregate_by(&Dimension::Phase, &table, &MeasureColumns::actual());
        assert_eq!(rows[1].label, "No Phase");
        assert_eq!(rows[1].key, None);
        assert!((rows[1].shares.hours - 75.0).abs() < 1e-9);
    }

    #[test]
    fn zero_grand_total_gives_zero_shares() {
        let table = Table::new(["project_number", "hours_used"]).with_rows(vec![
            vec![Value::from("P1"), Value::Float(0.0)],
            vec![Value::from("P2"), Value::Float(0.0)],
        ]);
        let rows = aggregate_by(&Dimension::Project, &table, &MeasureColumns::actual());
        assert!(rows.iter().all(|r| r.shares.hours == 0.0 && r.shares.fee == 0.0));
    }

    #[test]
    fn sort_and_top_n() {
        let mut rows = aggregate_by(&Dimension::Person, &sample(), &MeasureColumns::actual());
        sort_by(&mut rows, Measure::Hours, false);
        assert_eq!(rows[0].label, "Ann");
        let top = top_n(&rows, Measure::Fee, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].label, "Bo");
    }

    #[test]
    fn dimension_names_parse() {
        assert_eq!("price-model".parse::<Dimension>(), Ok(Dimension::PriceModel));
        assert_eq!(
            "tag:project_tag_1".parse::<Dimension>(),
            Ok(Dimension::Tag("project_tag_1".to_string()))
        );
        assert!("tag:".parse::<Dimension>().is_err());
        assert_eq!(Dimension::Tag("x".to_string()).to_string(), "tag:x");
    }
}
