//! Arkemy Analytics
//!
//! Pure functions from filtered [`Table`](arkemy_dataset::Table)s to
//! fixed-shape results.
//!
//! # Components
//!
//! - **Aggregation**: [`aggregate_by`] groups one table by a [`Dimension`]
//!   and derives rates, margins and shares of the grand total
//! - **Hierarchy**: [`aggregate_hierarchy`] nests two dimensions and
//!   produces treemap node arrays
//! - **Summary**: [`summarize`] computes company-wide headline metrics
//! - **Planned**: [`compare_actual_planned`] joins actual and planned work
//!   per project
//! - **Utilization**: [`utilization_by_person`] relates hours to the
//!   working days each person logged
//! - **Period**: [`compute_windows`] and [`compare_periods`] compare the
//!   current window against the previous one or the same one last year
//!
//! # Example
//!
//! ```no_run
//! use arkemy_analytics::prelude::*;
//! # fn run(table: &arkemy_dataset::Table) {
//! let mut rows = aggregate_by(&Dimension::Customer, table, &MeasureColumns::actual());
//! sort_by(&mut rows, Measure::Fee, true);
//! for row in rows.iter().take(5) {
//!     println!("{}: {:.0} ({:.1}%)", row.label, row.totals.fee, row.shares.fee);
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregate;
pub mod error;
pub mod hierarchy;
pub mod measures;
pub mod period;
pub mod planned;
pub mod summary;
pub mod utilization;

pub use aggregate::{
    aggregate_by, apply_shares, sort_by, top_n, AggregateRow, Dimension, DistinctCount, Shares,
};
pub use error::{PeriodError, PeriodResult};
pub use hierarchy::{aggregate_hierarchy, Hierarchy, HierarchyGroup, Treemap, TREEMAP_ROOT};
pub use measures::{Measure, MeasureColumns, Totals};
pub use period::{
    compare_periods, compute_windows, ComparisonMode, ComparisonPreset, ComparisonWarning,
    Direction, MetricConfig, MetricDelta, MetricUnit, PeriodComparison, PeriodMetric,
    PeriodMetrics, WindowLength, WindowPair, METRIC_CONFIGS,
};
pub use planned::{
    aggregate_planned_by_project, compare_actual_planned, PlanComparison, PlanCoverage,
    PlanSummary, PlannedProjectRow, ProjectVariance, Variance,
};
pub use summary::{summarize, SummaryMetrics};
pub use utilization::{utilization_by_person, UtilizationRow, DEFAULT_WORK_HOURS_PER_DAY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for aggregating and comparing
    pub use crate::aggregate::{aggregate_by, sort_by, top_n, AggregateRow, Dimension};
    pub use crate::error::{PeriodError, PeriodResult};
    pub use crate::hierarchy::aggregate_hierarchy;
    pub use crate::measures::{Measure, MeasureColumns};
    pub use crate::period::{
        compare_periods, compute_windows, ComparisonMode, PeriodComparison, WindowLength,
    };
    pub use crate::summary::summarize;
    pub use crate::utilization::utilization_by_person;
}
