//! Measure columns and derived metrics
//!
//! [`Totals`] accumulates the summable measures of a set of rows; every rate,
//! ratio and margin is derived from totals with a zero guard.

use arkemy_dataset::{Row, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source columns aggregations read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureColumns {
    /// Hours worked or planned
    pub hours: String,
    /// Billable hours, when the record type has them
    pub billable_hours: Option<String>,
    /// Fee
    pub fee: String,
    /// Cost, when the record type has it
    pub cost: Option<String>,
    /// Hourly rate, when the record type carries one per row
    pub hourly_rate: Option<String>,
    /// Record date
    pub date: String,
    /// Project identifier, for distinct project counts
    pub project: String,
    /// Person identifier, for distinct people counts
    pub person: String,
    /// Customer identifier, for distinct customer counts
    pub customer: String,
}

impl MeasureColumns {
    /// Columns of actual time records
    #[must_use]
    pub fn actual() -> Self {
        Self {
            hours: "hours_used".to_string(),
            billable_hours: Some("hours_billable".to_string()),
            fee: "fee_record".to_string(),
            cost: Some("cost_record".to_string()),
            hourly_rate: None,
            date: "record_date".to_string(),
            project: "project_number".to_string(),
            person: "person_name".to_string(),
            customer: "customer_number".to_string(),
        }
    }

    /// Columns of planned records
    #[must_use]
    pub fn planned() -> Self {
        Self {
            hours: "planned_hours".to_string(),
            billable_hours: None,
            fee: "planned_fee".to_string(),
            cost: None,
            hourly_rate: Some("planned_hourly_rate".to_string()),
            ..Self::actual()
        }
    }

    /// Columns for a record type name, `actual` for anything but `planned`
    #[must_use]
    pub fn for_kind(kind: &str) -> Self {
        if kind == "planned" {
            Self::planned()
        } else {
            Self::actual()
        }
    }
}

impl Default for MeasureColumns {
    fn default() -> Self {
        Self::actual()
    }
}

/// Column positions resolved against one table
#[derive(Debug, Clone, Copy)]
pub(crate) struct MeasureIndex {
    hours: Option<usize>,
    billable: Option<usize>,
    fee: Option<usize>,
    cost: Option<usize>,
}

impl MeasureIndex {
    pub(crate) fn resolve(table: &Table, columns: &MeasureColumns) -> Self {
        Self {
            hours: table.column_index(&columns.hours),
            billable: columns
                .billable_hours
                .as_deref()
                .and_then(|c| table.column_index(c)),
            fee: table.column_index(&columns.fee),
            cost: columns.cost.as_deref().and_then(|c| table.column_index(c)),
        }
    }

    pub(crate) fn totals(&self, row: &Row) -> Totals {
        let cell = |idx: Option<usize>| idx.map_or(0.0, |i| row[i].as_f64_or_zero());
        Totals {
            hours: cell(self.hours),
            billable_hours: cell(self.billable),
            fee: cell(self.fee),
            cost: cell(self.cost),
        }
    }
}

/// Summed measures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Hours
    pub hours: f64,
    /// Billable hours
    pub billable_hours: f64,
    /// Fee
    pub fee: f64,
    /// Cost
    pub cost: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl Totals {
    /// Add another set of totals
    pub fn add(&mut self, other: &Totals) {
        self.hours += other.hours;
        self.billable_hours += other.billable_hours;
        self.fee += other.fee;
        self.cost += other.cost;
    }

    /// Totals over every row of a table
    #[must_use]
    pub fn of_table(table: &Table, columns: &MeasureColumns) -> Self {
        let index = MeasureIndex::resolve(table, columns);
        table.rows().iter().fold(Self::default(), |mut acc, row| {
            acc.add(&index.totals(row));
            acc
        })
    }

    /// Hours minus billable hours
    #[inline]
    #[must_use]
    pub fn non_billable_hours(&self) -> f64 {
        self.hours - self.billable_hours
    }

    /// Fee minus cost
    #[inline]
    #[must_use]
    pub fn profit(&self) -> f64 {
        self.fee - self.cost
    }

    /// Billable share of hours, in percent
    #[inline]
    #[must_use]
    pub fn billability(&self) -> f64 {
        ratio(self.billable_hours, self.hours) * 100.0
    }

    /// Fee per hour worked
    #[inline]
    #[must_use]
    pub fn effective_rate(&self) -> f64 {
        ratio(self.fee, self.hours)
    }

    /// Fee per billable hour
    #[inline]
    #[must_use]
    pub fn billable_rate(&self) -> f64 {
        ratio(self.fee, self.billable_hours)
    }

    /// Profit as a share of fee, in percent
    #[inline]
    #[must_use]
    pub fn profit_margin(&self) -> f64 {
        ratio(self.profit(), self.fee) * 100.0
    }
}

/// A numeric column of an aggregate row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Hours worked
    Hours,
    /// Billable hours
    BillableHours,
    /// Hours minus billable hours
    NonBillableHours,
    /// Fee
    Fee,
    /// Cost
    Cost,
    /// Fee minus cost
    Profit,
    /// Billable hours share, percent
    Billability,
    /// Fee per hour
    EffectiveRate,
    /// Fee per billable hour
    BillableRate,
    /// Profit share of fee, percent
    ProfitMargin,
    /// Distinct projects, people or records
    DistinctCount,
    /// Rows in the group
    Records,
}

impl Measure {
    /// Measures whose share of the grand total is meaningful
    pub const SUMMABLE: [Measure; 5] = [
        Measure::Hours,
        Measure::BillableHours,
        Measure::Fee,
        Measure::Cost,
        Measure::Profit,
    ];

    /// Whether shares are computed for this measure
    #[inline]
    #[must_use]
    pub fn is_summable(self) -> bool {
        Self::SUMMABLE.contains(&self)
    }

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::BillableHours => "billable_hours",
            Self::NonBillableHours => "non_billable_hours",
            Self::Fee => "fee",
            Self::Cost => "cost",
            Self::Profit => "profit",
            Self::Billability => "billability",
            Self::EffectiveRate => "effective_rate",
            Self::BillableRate => "billable_rate",
            Self::ProfitMargin => "profit_margin",
            Self::DistinctCount => "distinct_count",
            Self::Records => "records",
        }
    }

    /// Value of this measure for a set of totals, when it is derived from them
    #[must_use]
    pub fn of_totals(self, totals: &Totals) -> Option<f64> {
        Some(match self {
            Self::Hours => totals.hours,
            Self::BillableHours => totals.billable_hours,
            Self::NonBillableHours => totals.non_billable_hours(),
            Self::Fee => totals.fee,
            Self::Cost => totals.cost,
            Self::Profit => totals.profit(),
            Self::Billability => totals.billability(),
            Self::EffectiveRate => totals.effective_rate(),
            Self::BillableRate => totals.billable_rate(),
            Self::ProfitMargin => totals.profit_margin(),
            Self::DistinctCount | Self::Records => return None,
        })
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hours" | "hours_used" => Self::Hours,
            "billable_hours" | "hours_billable" => Self::BillableHours,
            "non_billable_hours" => Self::NonBillableHours,
            "fee" => Self::Fee,
            "cost" => Self::Cost,
            "profit" => Self::Profit,
            "billability" => Self::Billability,
            "effective_rate" | "rate" => Self::EffectiveRate,
            "billable_rate" => Self::BillableRate,
            "profit_margin" | "margin" => Self::ProfitMargin,
            "distinct_count" | "count" => Self::DistinctCount,
            "records" => Self::Records,
            other => return Err(format!("unknown measure: '{other}'")),
        })
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
