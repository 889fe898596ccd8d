//! Per-person utilization
//!
//! Potential hours are the days a person logged time on multiplied by a
//! standard working day. Days without any record do not count.

use crate::measures::{MeasureColumns, MeasureIndex, Totals};
use arkemy_dataset::Table;
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Standard working day used when none is configured
pub const DEFAULT_WORK_HOURS_PER_DAY: f64 = 8.0;

/// Utilization of one person
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationRow {
    /// Person
    pub person: String,
    /// Distinct dates with at least one record
    pub days_worked: usize,
    /// `days_worked` times the working day
    pub potential_hours: f64,
    /// Summed measures
    pub totals: Totals,
    /// Hours over potential hours, percent
    pub utilization: f64,
    /// Billable hours over potential hours, percent
    pub billable_utilization: f64,
    /// Fee minus cost
    pub profit: f64,
    /// Fee per hour
    pub effective_rate: f64,
    /// Fee per billable hour
    pub billable_rate: f64,
}

#[derive(Default)]
struct PersonDays {
    days: IndexSet<NaiveDate>,
    totals: Totals,
}

fn percent_of(value: f64, potential: f64) -> f64 {
    if potential > 0.0 {
        value / potential * 100.0
    } else {
        0.0
    }
}

/// Utilization per person in first-appearance order
///
/// Rows without a person are left out; rows without a date add hours but no
/// day. A missing person column yields an empty vector. A working day that
/// is not a positive number gives zero potential and zero utilization.
#[must_use]
pub fn utilization_by_person(
    table: &Table,
    measures: &MeasureColumns,
    work_hours_per_day: f64,
) -> Vec<UtilizationRow> {
    let Some(person_idx) = table.column_index(&measures.person) else {
        return Vec::new();
    };
    let date_idx = table.column_index(&measures.date);
    let index = MeasureIndex::resolve(table, measures);
    let day_hours = if work_hours_per_day.is_finite() && work_hours_per_day > 0.0 {
        work_hours_per_day
    } else {
        tracing::warn!(work_hours_per_day, "working day must be positive");
        0.0
    };

    let mut people: IndexMap<String, PersonDays> = IndexMap::new();
    for row in table.rows() {
        let Some(person) = row[person_idx].to_key() else {
            continue;
        };
        let entry = people.entry(person).or_default();
        entry.totals.add(&index.totals(row));
        if let Some(day) = date_idx.and_then(|i| row[i].as_date()) {
            entry.days.insert(day);
        }
    }

    people
        .into_iter()
        .map(|(person, PersonDays { days, totals })| {
            #[allow(clippy::cast_precision_loss)]
            let potential_hours = days.len() as f64 * day_hours;
            UtilizationRow {
                person,
                days_worked: days.len(),
                potential_hours,
                totals,
                utilization: percent_of(totals.hours, potential_hours),
                billable_utilization: percent_of(totals.billable_hours, potential_hours),
                profit: totals.profit(),
                effective_rate: totals.effective_rate(),
                billable_rate: totals.billable_rate(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::Value;

    fn day(d: u32) -> Value {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap().into()
    }

    fn table() -> Table {
        Table::new(["record_date", "person_name", "hours_used", "hours_billable", "fee_record"])
            .with_rows(vec![
                vec![day(4), "Ann".into(), 4.0.into(), 4.0.into(), 400.0.into()],
                vec![day(4), "Ann".into(), 4.0.into(), 2.0.into(), 200.0.into()],
                vec![day(5), "Ann".into(), 6.0.into(), 0.0.into(), 0.0.into()],
                vec![day(4), "Bo".into(), 2.0.into(), 2.0.into(), 300.0.into()],
                vec![day(6), Value::Null, 9.0.into(), 9.0.into(), 900.0.into()],
            ])
    }

    #[test]
    fn potential_hours_count_distinct_days() {
        let rows = utilization_by_person(&table(), &MeasureColumns::actual(), DEFAULT_WORK_HOURS_PER_DAY);
        assert_eq!(rows.len(), 2);

        let ann = &rows[0];
        assert_eq!(ann.person, "Ann");
        assert_eq!(ann.days_worked, 2);
        assert!((ann.potential_hours - 16.0).abs() < 1e-9);
        assert!((ann.utilization - 87.5).abs() < 1e-9);
        assert!((ann.billable_utilization - 37.5).abs() < 1e-9);
        assert!((ann.effective_rate - 600.0 / 14.0).abs() < 1e-9);

        let bo = &rows[1];
        assert!((bo.utilization - 25.0).abs() < 1e-9);
        assert!((bo.billable_rate - 150.0).abs() < 1e-9);
    }

    #[test]
    fn shorter_working_day_raises_utilization() {
        let rows = utilization_by_person(&table(), &MeasureColumns::actual(), 7.5);
        assert!((rows[1].utilization - 2.0 / 7.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_working_day_gives_zero() {
        let rows = utilization_by_person(&table(), &MeasureColumns::actual(), 0.0);
        assert!(rows.iter().all(|r| r.potential_hours == 0.0 && r.utilization == 0.0));
    }

    #[test]
    fn missing_person_column_is_empty() {
        let table = Table::new(["record_date", "hours_used"]).with_rows(vec![vec![day(4), 1.0.into()]]);
        assert!(utilization_by_person(&table, &MeasureColumns::actual(), 8.0).is_empty());
    }
}
