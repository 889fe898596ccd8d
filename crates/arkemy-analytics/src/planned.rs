//! Planned-vs-actual per project
//!
//! Planned records carry hours, fee and an hourly rate per row. They are
//! rolled up per project and outer-joined with the actual project rows.

use crate::aggregate::{AggregateRow, Dimension};
use crate::measures::MeasureColumns;
use arkemy_dataset::Table;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Planned totals of one project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedProjectRow {
    /// Project identifier; `None` for rows without one
    pub project: Option<String>,
    /// Display label
    pub label: String,
    /// Planned hours
    pub planned_hours: f64,
    /// Distinct people planned on the project
    pub people: usize,
    /// Hours-weighted planned hourly rate
    pub planned_hourly_rate: f64,
    /// Planned fee
    pub planned_fee: f64,
}

#[derive(Default)]
struct PlannedGroup {
    label: Option<String>,
    hours: f64,
    fee: f64,
    rated_hours: f64,
    rate_weight: f64,
    people: IndexSet<String>,
}

/// Roll planned records up per project, in first-appearance order
///
/// A table without a project column yields an empty vector.
#[must_use]
pub fn aggregate_planned_by_project(table: &Table, measures: &MeasureColumns) -> Vec<PlannedProjectRow> {
    let Some(project_idx) = table.column_index(&measures.project) else {
        return Vec::new();
    };
    let label_idx = Dimension::Project.label_column().and_then(|c| table.column_index(c));
    let person_idx = table.column_index(&measures.person);
    let hours_idx = table.column_index(&measures.hours);
    let fee_idx = table.column_index(&measures.fee);
    let rate_idx = measures.hourly_rate.as_deref().and_then(|c| table.column_index(c));

    let mut groups: IndexMap<Option<String>, PlannedGroup> = IndexMap::new();
    for row in table.rows() {
        let group = groups.entry(row[project_idx].to_key()).or_default();
        let hours = hours_idx.map_or(0.0, |i| row[i].as_f64_or_zero());
        group.hours += hours;
        group.fee += fee_idx.map_or(0.0, |i| row[i].as_f64_or_zero());
        if let Some(rate) = rate_idx.and_then(|i| row[i].as_f64()) {
            group.rated_hours += hours;
            group.rate_weight += rate * hours;
        }
        if let Some(person) = person_idx.and_then(|i| row[i].to_key()) {
            group.people.insert(person);
        }
        if group.label.is_none() {
            group.label = label_idx.and_then(|i| row[i].to_key());
        }
    }

    groups
        .into_iter()
        .map(|(project, group)| PlannedProjectRow {
            label: group
                .label
                .or_else(|| project.clone())
                .unwrap_or_else(|| Dimension::Project.null_label().to_string()),
            project,
            planned_hours: group.hours,
            people: group.people.len(),
            planned_hourly_rate: if group.rated_hours == 0.0 {
                0.0
            } else {
                group.rate_weight / group.rated_hours
            },
            planned_fee: group.fee,
        })
        .collect()
}

/// Actual minus planned, with the difference as a percentage of planned
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Variance {
    /// Actual value
    pub actual: f64,
    /// Planned value
    pub planned: f64,
    /// `actual - planned`
    pub delta: f64,
    /// Delta as a percentage of planned; 0 when planned is 0
    pub percent: f64,
}

impl Variance {
    /// Variance of `actual` against `planned`
    #[must_use]
    pub fn between(actual: f64, planned: f64) -> Self {
        let delta = actual - planned;
        Self {
            actual,
            planned,
            delta,
            percent: if planned == 0.0 { 0.0 } else { delta / planned * 100.0 },
        }
    }
}

/// Where a project appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCoverage {
    /// Both actual and planned records
    Both,
    /// Actual records only
    ActualOnly,
    /// Planned records only
    PlannedOnly,
}

/// Actual against planned for one project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectVariance {
    /// Project identifier
    pub project: Option<String>,
    /// Display label
    pub label: String,
    /// Where the project appears
    pub coverage: PlanCoverage,
    /// Hours
    pub hours: Variance,
    /// Fee
    pub fee: Variance,
    /// Effective rate against planned hourly rate
    pub rate: Variance,
}

/// Totals across all compared projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlanSummary {
    /// Projects with both actual and planned records
    pub common: usize,
    /// Projects with actual records only
    pub actual_only: usize,
    /// Projects with planned records only
    pub planned_only: usize,
    /// Hours across all projects
    pub hours: Variance,
    /// Fee across all projects
    pub fee: Variance,
}

/// Per-project comparison plus summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanComparison {
    /// Actual projects first, then planned-only ones
    pub projects: Vec<ProjectVariance>,
    /// Totals
    pub summary: PlanSummary,
}

/// Outer-join project aggregates with planned rows
#[must_use]
pub fn compare_actual_planned(actual: &[AggregateRow], planned: &[PlannedProjectRow]) -> PlanComparison {
    let mut planned_by_key: IndexMap<&Option<String>, &PlannedProjectRow> =
        planned.iter().map(|p| (&p.project, p)).collect();

    let mut projects = Vec::with_capacity(actual.len() + planned.len());
    for row in actual {
        let plan = planned_by_key.shift_remove(&row.key);
        let (planned_hours, planned_fee, planned_rate) =
            plan.map_or((0.0, 0.0, 0.0), |p| (p.planned_hours, p.planned_fee, p.planned_hourly_rate));
        projects.push(ProjectVariance {
            project: row.key.clone(),
            label: row.label.clone(),
            coverage: if plan.is_some() {
                PlanCoverage::Both
            } else {
                PlanCoverage::ActualOnly
            },
            hours: Variance::between(row.totals.hours, planned_hours),
            fee: Variance::between(row.totals.fee, planned_fee),
            rate: Variance::between(row.effective_rate, planned_rate),
        });
    }
    for plan in planned_by_key.into_values() {
        projects.push(ProjectVariance {
            project: plan.project.clone(),
            label: plan.label.clone(),
            coverage: PlanCoverage::PlannedOnly,
            hours: Variance::between(0.0, plan.planned_hours),
            fee: Variance::between(0.0, plan.planned_fee),
            rate: Variance::between(0.0, plan.planned_hourly_rate),
        });
    }

    let count = |c: PlanCoverage| projects.iter().filter(|p| p.coverage == c).count();
    let sum = |f: fn(&ProjectVariance) -> Variance| {
        let (a, p) = projects
            .iter()
            .map(f)
            .fold((0.0, 0.0), |(a, p), v| (a + v.actual, p + v.planned));
        Variance::between(a, p)
    };
    let summary = PlanSummary {
        common: count(PlanCoverage::Both),
        actual_only: count(PlanCoverage::ActualOnly),
        planned_only: count(PlanCoverage::PlannedOnly),
        hours: sum(|p| p.hours),
        fee: sum(|p| p.fee),
    };

    tracing::debug!(
        common = summary.common,
        actual_only = summary.actual_only,
        planned_only = summary.planned_only,
        "compared actual with planned"
    );
    PlanComparison { projects, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_by;
    use arkemy_schema::Value;

    fn planned_table() -> Table {
        Table::new(["project_number", "project_name", "person_name", "planned_hours", "planned_fee", "planned_hourly_rate"])
            .with_rows(vec![
                vec!["P1".into(), "Library".into(), "Ann".into(), 10.0.into(), 1000.0.into(), 100.0.into()],
                vec!["P1".into(), "Library".into(), "Bo".into(), 30.0.into(), 6000.0.into(), 200.0.into()],
                vec!["P9".into(), Value::Null, "Ann".into(), 5.0.into(), 500.0.into(), Value::Null],
            ])
    }

    #[test]
    fn planned_rate_is_hours_weighted() {
        let rows = aggregate_planned_by_project(&planned_table(), &MeasureColumns::planned());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].people, 2);
        assert!((rows[0].planned_hours - 40.0).abs() < 1e-9);
        assert!((rows[0].planned_hourly_rate - 175.0).abs() < 1e-9);
        assert_eq!(rows[1].label, "P9");
        assert!(rows[1].planned_hourly_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn outer_join_counts_coverage() {
        let actual = Table::new(["project_number", "project_name", "hours_used", "fee_record"]).with_rows(vec![
            vec!["P1".into(), "Library".into(), 50.0.into(), 5000.0.into()],
            vec!["P2".into(), "School".into(), 5.0.into(), 500.0.into()],
        ]);
        let actual_rows = aggregate_by(&Dimension::Project, &actual, &MeasureColumns::actual());
        let planned_rows = aggregate_planned_by_project(&planned_table(), &MeasureColumns::planned());
        let cmp = compare_actual_planned(&actual_rows, &planned_rows);

        assert_eq!((cmp.summary.common, cmp.summary.actual_only, cmp.summary.planned_only), (1, 1, 1));
        let p1 = &cmp.projects[0];
        assert!((p1.hours.delta - 10.0).abs() < 1e-9);
        assert!((p1.hours.percent - 25.0).abs() < 1e-9);
        assert!((p1.rate.delta - (100.0 - 175.0)).abs() < 1e-9);
        let p2 = &cmp.projects[1];
        assert_eq!(p2.coverage, PlanCoverage::ActualOnly);
        assert!(p2.hours.percent.abs() < f64::EPSILON);
        assert_eq!(cmp.projects[2].project.as_deref(), Some("P9"));
        assert!((cmp.summary.hours.planned - 45.0).abs() < 1e-9);
    }
}
