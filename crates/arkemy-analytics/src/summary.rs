//! Company-wide headline metrics

use crate::measures::{MeasureColumns, Totals};
use arkemy_dataset::Table;
use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::Serialize;

/// Average days per year used for `years_between`
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Headline metrics over one table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    /// Rows
    pub total_entries: usize,
    /// Distinct non-null customers
    pub unique_customers: usize,
    /// Distinct non-null projects
    pub unique_projects: usize,
    /// Distinct non-null people
    pub unique_people: usize,
    /// Summed measures
    pub totals: Totals,
    /// Earliest record date
    pub first_record: Option<NaiveDate>,
    /// Latest record date
    pub last_record: Option<NaiveDate>,
    /// Span between first and last record, in years
    pub years_between: f64,
    /// Billable share of hours, percent
    pub billability: f64,
    /// Fee per hour
    pub effective_rate: f64,
    /// Fee per billable hour
    pub billable_rate: f64,
    /// Fee minus cost
    pub profit: f64,
    /// Profit share of fee, percent
    pub profit_margin: f64,
    /// Fee divided by distinct projects
    pub avg_fee_per_project: f64,
}

impl SummaryMetrics {
    /// Whether the table had no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }
}

fn distinct(table: &Table, column: &str) -> usize {
    table.column(column).map_or(0, |values| {
        values
            .filter_map(arkemy_schema::Value::to_key)
            .collect::<IndexSet<_>>()
            .len()
    })
}

/// Headline metrics of `table`; an empty table yields all zeros
#[must_use]
pub fn summarize(table: &Table, measures: &MeasureColumns) -> SummaryMetrics {
    let totals = Totals::of_table(table, measures);
    let range = table.date_range(&measures.date);
    let unique_projects = distinct(table, &measures.project);

    #[allow(clippy::cast_precision_loss)]
    let years_between = range.map_or(0.0, |w| (w.end - w.start).num_days() as f64 / DAYS_PER_YEAR);
    #[allow(clippy::cast_precision_loss)]
    let avg_fee_per_project = if unique_projects == 0 {
        0.0
    } else {
        totals.fee / unique_projects as f64
    };

    SummaryMetrics {
        total_entries: table.len(),
        unique_customers: distinct(table, &measures.customer),
        unique_projects,
        unique_people: distinct(table, &measures.person),
        totals,
        first_record: range.map(|w| w.start),
        last_record: range.map(|w| w.end),
        years_between,
        billability: totals.billability(),
        effective_rate: totals.effective_rate(),
        billable_rate: totals.billable_rate(),
        profit: totals.profit(),
        profit_margin: totals.profit_margin(),
        avg_fee_per_project,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::Value;

    fn day(y: i32, m: u32, d: u32) -> Value {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().into()
    }

    #[test]
    fn summarizes_counts_and_span() {
        let table = Table::new([
            "record_date",
            "customer_number",
            "project_number",
            "person_name",
            "hours_used",
            "hours_billable",
            "fee_record",
            "cost_record",
        ])
        .with_rows(vec![
            vec![day(2023, 1, 1), "C1".into(), "P1".into(), "Ann".into(), 8.0.into(), 6.0.into(), 800.0.into(), 200.0.into()],
            vec![day(2025, 1, 1), "C1".into(), "P2".into(), "Bo".into(), 2.0.into(), 2.0.into(), 400.0.into(), 100.0.into()],
            vec![day(2024, 6, 1), Value::Null, "P2".into(), "Ann".into(), 0.0.into(), 0.0.into(), 0.0.into(), 0.0.into()],
        ]);
        let s = summarize(&table, &MeasureColumns::actual());
        assert_eq!(s.total_entries, 3);
        assert_eq!(s.unique_customers, 1);
        assert_eq!(s.unique_projects, 2);
        assert_eq!(s.unique_people, 2);
        assert!((s.years_between - 731.0 / DAYS_PER_YEAR).abs() < 1e-9);
        assert!((s.billability - 80.0).abs() < 1e-9);
        assert!((s.avg_fee_per_project - 600.0).abs() < 1e-9);
        assert!((s.profit_margin - 75.0).abs() < 1e-9);
    }

    #[test]
    fn empty_table_is_zeroed() {
        let s = summarize(&Table::new(["record_date"]), &MeasureColumns::actual());
        assert!(s.is_empty());
        assert_eq!(s.first_record, None);
        assert!(s.years_between.abs() < f64::EPSILON);
    }
}
