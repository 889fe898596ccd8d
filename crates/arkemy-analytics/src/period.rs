//! Period windows and current-vs-comparison metrics
//!
//! Window arithmetic is pure: an anchor date, a length and a mode always give
//! the same [`WindowPair`]. Comparing a table over a pair never fails; an
//! unusable comparison window turns into a [`ComparisonWarning`].

use crate::error::{PeriodError, PeriodResult};
use crate::measures::{MeasureColumns, Totals};
use arkemy_dataset::{DateWindow, Table};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back the current window reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLength {
    /// Calendar months ending at the anchor
    Months(u32),
    /// January 1st of the anchor's year up to the anchor
    YearToDate,
    /// The full observed date range
    All,
}

/// What the current window is compared against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// The immediately preceding window of equal length
    #[default]
    Adjacent,
    /// The same window one year earlier
    YearOverYear,
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "adjacent" | "previous" => Ok(Self::Adjacent),
            "yoy" | "year_over_year" => Ok(Self::YearOverYear),
            other => Err(format!("unknown comparison mode: '{other}'")),
        }
    }
}

/// Current window and its comparison, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPair {
    /// Window under study
    pub current: DateWindow,
    /// Window it is compared against
    pub comparison: Option<DateWindow>,
}

fn sub_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(months))
}

fn year_earlier(window: DateWindow, anchor: NaiveDate) -> PeriodResult<DateWindow> {
    let start = sub_months(window.start, 12).ok_or_else(|| PeriodError::out_of_range(anchor))?;
    let end = sub_months(window.end, 12).ok_or_else(|| PeriodError::out_of_range(anchor))?;
    Ok(DateWindow { start, end })
}

/// Compute the current and comparison windows for an anchor date
///
/// `Months(n)` covers `[(anchor + 1 day) - n months, anchor]`, which is `n`
/// whole calendar months when the anchor is a month end. `All` spans
/// `observed`, or the anchor day alone when nothing is observed, and never
/// has a comparison.
///
/// # Errors
/// [`PeriodError::ZeroLength`] for `Months(0)`, [`PeriodError::OutOfRange`]
/// when the arithmetic leaves the calendar.
pub fn compute_windows(
    anchor: NaiveDate,
    length: WindowLength,
    mode: ComparisonMode,
    observed: Option<DateWindow>,
) -> PeriodResult<WindowPair> {
    let out_of_range = || PeriodError::out_of_range(anchor);

    let (current, comparison) = match length {
        WindowLength::All => {
            return Ok(WindowPair {
                current: observed.unwrap_or_else(|| DateWindow::day(anchor)),
                comparison: None,
            })
        }
        WindowLength::Months(0) => return Err(PeriodError::ZeroLength),
        WindowLength::Months(n) => {
            let next = anchor.succ_opt().ok_or_else(out_of_range)?;
            let start = sub_months(next, n).ok_or_else(out_of_range)?;
            let current = DateWindow { start, end: anchor };
            let comparison = match mode {
                ComparisonMode::Adjacent => DateWindow {
                    start: sub_months(start, n).ok_or_else(out_of_range)?,
                    end: start.pred_opt().ok_or_else(out_of_range)?,
                },
                ComparisonMode::YearOverYear => year_earlier(current, anchor)?,
            };
            (current, comparison)
        }
        WindowLength::YearToDate => {
            let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).ok_or_else(out_of_range)?;
            let current = DateWindow { start, end: anchor };
            let comparison = match mode {
                ComparisonMode::Adjacent => {
                    let end = start.pred_opt().ok_or_else(out_of_range)?;
                    let start = end
                        .checked_sub_signed(Duration::days(current.days() - 1))
                        .ok_or_else(out_of_range)?;
                    DateWindow { start, end }
                }
                ComparisonMode::YearOverYear => year_earlier(current, anchor)?,
            };
            (current, comparison)
        }
    };

    Ok(WindowPair {
        current,
        comparison: Some(comparison),
    })
}

/// Named comparison choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPreset {
    /// Last month against the month before
    LastMonth,
    /// Last three months against the three before
    LastQuarter,
    /// Last six months against the six before
    LastSixMonths,
    /// Last twelve months against the twelve before
    LastTwelveMonths,
    /// Year to date against the same span last year
    YearToDate,
    /// One calendar year against another
    CalendarYears {
        /// Year under study
        current: i32,
        /// Year it is compared against
        comparison: i32,
    },
}

impl ComparisonPreset {
    /// Length and mode, for presets that are anchored
    #[must_use]
    pub fn length_and_mode(self) -> Option<(WindowLength, ComparisonMode)> {
        match self {
            Self::LastMonth => Some((WindowLength::Months(1), ComparisonMode::Adjacent)),
            Self::LastQuarter => Some((WindowLength::Months(3), ComparisonMode::Adjacent)),
            Self::LastSixMonths => Some((WindowLength::Months(6), ComparisonMode::Adjacent)),
            Self::LastTwelveMonths => Some((WindowLength::Months(12), ComparisonMode::Adjacent)),
            Self::YearToDate => Some((WindowLength::YearToDate, ComparisonMode::YearOverYear)),
            Self::CalendarYears { .. } => None,
        }
    }

    /// Windows for this preset
    ///
    /// # Errors
    /// Propagates [`compute_windows`] errors; [`PeriodError::InvalidYear`]
    /// for a year chrono cannot represent.
    pub fn windows(self, anchor: NaiveDate) -> PeriodResult<WindowPair> {
        match (self, self.length_and_mode()) {
            (Self::CalendarYears { current, comparison }, _) => Ok(WindowPair {
                current: calendar_year(current)?,
                comparison: Some(calendar_year(comparison)?),
            }),
            (_, Some((length, mode))) => compute_windows(anchor, length, mode, None),
            (_, None) => Err(PeriodError::out_of_range(anchor)),
        }
    }
}

fn calendar_year(year: i32) -> PeriodResult<DateWindow> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(PeriodError::InvalidYear(year))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(PeriodError::InvalidYear(year))?;
    Ok(DateWindow { start, end })
}

/// Headline metrics of one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodMetrics {
    /// Window measured
    pub window: Option<DateWindow>,
    /// Rows inside the window
    pub records: usize,
    /// Hours worked
    pub hours: f64,
    /// Fee per hour
    pub effective_rate: f64,
    /// Billable share of hours, percent
    pub billability: f64,
    /// Fee
    pub fee: f64,
    /// Fee minus cost
    pub profit: f64,
    /// Profit share of fee, percent
    pub profit_margin: f64,
}

impl PeriodMetrics {
    /// Measure the rows of `table` dated inside `window`
    #[must_use]
    pub fn measure(table: &Table, window: DateWindow, measures: &MeasureColumns) -> Self {
        let slice = slice(table, window, measures);
        let totals = Totals::of_table(&slice, measures);
        Self {
            window: Some(window),
            records: slice.len(),
            hours: totals.hours,
            effective_rate: totals.effective_rate(),
            billability: totals.billability(),
            fee: totals.fee,
            profit: totals.profit(),
            profit_margin: totals.profit_margin(),
        }
    }

    /// Whether any row fell inside the window
    #[inline]
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.records > 0
    }

    /// Value of one metric
    #[must_use]
    pub fn value(&self, metric: PeriodMetric) -> f64 {
        match metric {
            PeriodMetric::HoursUsed => self.hours,
            PeriodMetric::EffectiveRate => self.effective_rate,
            PeriodMetric::Billability => self.billability,
            PeriodMetric::Fee => self.fee,
            PeriodMetric::Profit => self.profit,
            PeriodMetric::ProfitMargin => self.profit_margin,
        }
    }
}

/// Rows of `table` dated inside `window`; no date column means no rows
#[must_use]
pub fn slice(table: &Table, window: DateWindow, measures: &MeasureColumns) -> Table {
    match table.column_index(&measures.date) {
        Some(idx) => table.filter_rows(|row| row[idx].as_date().is_some_and(|d| window.contains(d))),
        None => Table::new(table.columns().to_vec()),
    }
}

/// Metrics compared between periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMetric {
    /// Hours worked
    HoursUsed,
    /// Fee per hour
    EffectiveRate,
    /// Billable share of hours
    Billability,
    /// Fee
    Fee,
    /// Fee minus cost
    Profit,
    /// Profit share of fee
    ProfitMargin,
}

impl PeriodMetric {
    /// Every metric, in display order
    pub const ALL: [PeriodMetric; 6] = [
        PeriodMetric::HoursUsed,
        PeriodMetric::EffectiveRate,
        PeriodMetric::Billability,
        PeriodMetric::Fee,
        PeriodMetric::Profit,
        PeriodMetric::ProfitMargin,
    ];

    /// Static presentation settings
    #[must_use]
    pub fn config(self) -> &'static MetricConfig {
        match self {
            Self::HoursUsed => &METRIC_CONFIGS[0],
            Self::EffectiveRate => &METRIC_CONFIGS[1],
            Self::Billability => &METRIC_CONFIGS[2],
            Self::Fee => &METRIC_CONFIGS[3],
            Self::Profit => &METRIC_CONFIGS[4],
            Self::ProfitMargin => &METRIC_CONFIGS[5],
        }
    }
}

impl fmt::Display for PeriodMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config().label)
    }
}

/// Unit a metric is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Hours
    Hours,
    /// Dataset currency
    Currency,
    /// Dataset currency per hour
    CurrencyPerHour,
    /// Percent, 0 to 100
    Percent,
}

/// Presentation settings of a compared metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricConfig {
    /// Metric
    pub metric: PeriodMetric,
    /// Display label
    pub label: &'static str,
    /// Unit
    pub unit: MetricUnit,
    /// Whether an increase is good news
    pub higher_is_better: bool,
}

/// Settings of every compared metric, in [`PeriodMetric::ALL`] order
pub const METRIC_CONFIGS: [MetricConfig; 6] = [
    MetricConfig {
        metric: PeriodMetric::HoursUsed,
        label: "Hours used",
        unit: MetricUnit::Hours,
        higher_is_better: true,
    },
    MetricConfig {
        metric: PeriodMetric::EffectiveRate,
        label: "Effective rate",
        unit: MetricUnit::CurrencyPerHour,
        higher_is_better: true,
    },
    MetricConfig {
        metric: PeriodMetric::Billability,
        label: "Billability",
        unit: MetricUnit::Percent,
        higher_is_better: true,
    },
    MetricConfig {
        metric: PeriodMetric::Fee,
        label: "Fee",
        unit: MetricUnit::Currency,
        higher_is_better: true,
    },
    MetricConfig {
        metric: PeriodMetric::Profit,
        label: "Profit",
        unit: MetricUnit::Currency,
        higher_is_better: true,
    },
    MetricConfig {
        metric: PeriodMetric::ProfitMargin,
        label: "Profit margin",
        unit: MetricUnit::Percent,
        higher_is_better: true,
    },
];

/// Sign of a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Positive delta
    Up,
    /// Negative delta
    Down,
    /// Zero delta
    Flat,
}

/// One metric in both periods
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    /// Metric
    pub metric: PeriodMetric,
    /// Value in the current window
    pub current: f64,
    /// Value in the comparison window
    pub comparison: f64,
    /// `current - comparison`
    pub absolute_delta: f64,
    /// Delta as a percentage of the comparison value
    pub percent_delta: f64,
    /// Sign of the delta
    pub direction: Direction,
}

impl MetricDelta {
    /// Compare two values
    ///
    /// With a zero comparison value the percent delta is 100 when the current
    /// value is positive, else 0.
    #[must_use]
    pub fn between(metric: PeriodMetric, current: f64, comparison: f64) -> Self {
        let absolute_delta = current - comparison;
        let percent_delta = if comparison != 0.0 {
            absolute_delta / comparison * 100.0
        } else if current > 0.0 {
            100.0
        } else {
            0.0
        };
        let direction = if absolute_delta > 0.0 {
            Direction::Up
        } else if absolute_delta < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        };
        Self {
            metric,
            current,
            comparison,
            absolute_delta,
            percent_delta,
            direction,
        }
    }
}

/// Why a comparison was not made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonWarning {
    /// No comparison window was produced
    NoComparisonWindow,
    /// The comparison window starts before the first record
    BeforeEarliestRecord {
        /// First day of the comparison window
        window_start: NaiveDate,
        /// Earliest record date in the table
        earliest: NaiveDate,
    },
    /// The comparison window holds no records
    NoRecords {
        /// The empty window
        window: DateWindow,
    },
}

impl fmt::Display for ComparisonWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoComparisonWindow => f.write_str("no comparison window for this period"),
            Self::BeforeEarliestRecord {
                window_start,
                earliest,
            } => write!(
                f,
                "comparison period starts {window_start}, before the earliest record on {earliest}"
            ),
            Self::NoRecords { window } => write!(f, "no records in comparison period {window}"),
        }
    }
}

/// Result of comparing two windows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    /// Windows compared
    pub windows: WindowPair,
    /// Metrics of the current window
    pub current: PeriodMetrics,
    /// Metrics of the comparison window, when it was usable
    pub comparison: Option<PeriodMetrics>,
    /// Whether the comparison is meaningful
    pub has_comparison: bool,
    /// Why there is no comparison
    pub warning: Option<ComparisonWarning>,
    /// Per-metric deltas; empty without a comparison
    pub deltas: Vec<MetricDelta>,
}

impl PeriodComparison {
    /// Delta of one metric
    #[must_use]
    pub fn delta(&self, metric: PeriodMetric) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }
}

/// Measure `table` over both windows of `pair`
#[must_use]
pub fn compare_periods(table: &Table, pair: WindowPair, measures: &MeasureColumns) -> PeriodComparison {
    let current = PeriodMetrics::measure(table, pair.current, measures);
    let earliest = table.date_range(&measures.date).map(|w| w.start);

    let checked = match pair.comparison {
        None => Err(ComparisonWarning::NoComparisonWindow),
        Some(window) => match earliest {
            Some(earliest) if window.start < earliest => Err(ComparisonWarning::BeforeEarliestRecord {
                window_start: window.start,
                earliest,
            }),
            _ => {
                let metrics = PeriodMetrics::measure(table, window, measures);
                if metrics.has_data() {
                    Ok(metrics)
                } else {
                    Err(ComparisonWarning::NoRecords { window })
                }
            }
        },
    };

    match checked {
        Ok(comparison) => {
            let deltas = PeriodMetric::ALL
                .iter()
                .map(|&m| MetricDelta::between(m, current.value(m), comparison.value(m)))
                .collect();
            tracing::debug!(current = %pair.current, records = current.records, "compared periods");
            PeriodComparison {
                windows: pair,
                current,
                comparison: Some(comparison),
                has_comparison: true,
                warning: None,
                deltas,
            }
        }
        Err(warning) => {
            tracing::warn!(%warning, "comparison unavailable");
            PeriodComparison {
                windows: pair,
                current,
                comparison: None,
                has_comparison: false,
                warning: Some(warning),
                deltas: Vec::new(),
            }
        }
    }
}
