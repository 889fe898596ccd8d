//! Subcommand implementations

use anyhow::{bail, Context, Result};
use arkemy_analytics::{
    aggregate_by, aggregate_hierarchy, aggregate_planned_by_project, compare_actual_planned,
    compare_periods, compute_windows, sort_by, summarize, utilization_by_person, AggregateRow,
    ComparisonMode, Dimension, Measure, MeasureColumns, WindowLength,
};
use arkemy_core::{AppConfig, Session};
use arkemy_dataset::{detect_satellites, Dataset, Table};
use chrono::NaiveDate;
use clap::ArgMatches;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open(config: AppConfig, args: &ArgMatches) -> Result<(Session, Arc<Dataset>)> {
    let session = Session::new(config).context("loading schema")?;
    let path = args
        .get_one::<PathBuf>("file")
        .context("missing dataset file")?;
    let dataset = session
        .load_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok((session, dataset))
}

fn partition<'a>(dataset: &'a Dataset, kind: &str) -> Result<&'a Table> {
    match dataset.table(kind) {
        Some(table) => Ok(table),
        None => bail!("dataset has no '{kind}' partition"),
    }
}

pub(crate) fn schema(config: AppConfig) -> Result<()> {
    let session = Session::new(config).context("loading schema")?;
    let info = session.schema().info();
    println!("Schema {} ({} fields)", info.version, info.field_count);
    println!("  {}", info.description);
    for kind in &info.record_types {
        let required = session.schema().required_fields(kind)?;
        println!("  {kind}: requires {}", required.join(", "));
    }
    Ok(())
}

pub(crate) fn discover(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let config = match args.get_many::<PathBuf>("dir") {
        Some(dirs) => config.with_search_paths(dirs.cloned()),
        None => config,
    };
    let session = Session::new(config).context("loading schema")?;
    let files = session.discover()?;
    for file in &files {
        println!(
            "{}  {} bytes  version={}  currency={}",
            file.path.display(),
            file.size,
            file.version.map_or("-", |v| v.as_str()),
            file.currency.as_ref().map_or("-", |c| c.as_str()),
        );
    }
    if let Some(dir) = files.first().and_then(|f| f.path.parent()) {
        let satellites = detect_satellites(dir);
        println!(
            "satellites: person capacity {}, project metrics {}",
            yes_no(satellites.has_person_capacity()),
            yes_no(satellites.has_project_metrics()),
        );
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[derive(Serialize)]
struct LoadSummary<'a> {
    source: &'a Path,
    currency: Option<&'a str>,
    partitions: Vec<(&'a str, usize)>,
    tag_labels: Vec<(&'a str, &'a str)>,
    issues: Vec<String>,
    summary: Option<arkemy_analytics::SummaryMetrics>,
}

pub(crate) fn load(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let (session, dataset) = open(config, args)?;
    let report = session.report().unwrap_or_default();
    let summary = LoadSummary {
        source: dataset.source(),
        currency: dataset.currency().map(|c| c.as_str()),
        partitions: dataset.partition_sizes(),
        tag_labels: dataset.tag_labels().iter().collect(),
        issues: report.summary_lines(),
        summary: dataset
            .table("actual")
            .map(|t| summarize(t, &MeasureColumns::actual())),
    };

    if args.get_flag("json") {
        return print_json(&summary);
    }
    println!("Loaded {}", summary.source.display());
    println!("  currency: {}", summary.currency.unwrap_or("unset"));
    for (kind, rows) in &summary.partitions {
        println!("  {kind}: {rows} rows");
    }
    for (column, label) in &summary.tag_labels {
        println!("  tag {column} = {label}");
    }
    if let Some(s) = &summary.summary {
        println!(
            "  {} entries, {} projects, {} people, {:.1} hours, fee {:.0}, margin {:.1}%",
            s.total_entries,
            s.unique_projects,
            s.unique_people,
            s.totals.hours,
            s.totals.fee,
            s.profit_margin
        );
    }
    for line in &summary.issues {
        println!("  ! {line}");
    }
    Ok(())
}

fn print_rows(rows: &[AggregateRow], indent: &str) {
    for row in rows {
        println!(
            "{indent}{:<30} {:>10.1} h {:>12.0} fee {:>6.1}% {:>8.1} rate",
            row.label, row.totals.hours, row.totals.fee, row.shares.fee, row.effective_rate
        );
    }
}

pub(crate) fn aggregate(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let (_session, dataset) = open(config, args)?;
    let kind = args.get_one::<String>("kind").map_or("actual", String::as_str);
    let table = partition(&dataset, kind)?;
    let measures = MeasureColumns::for_kind(kind);

    let dimension = match args.get_one::<String>("tag") {
        Some(column) => Dimension::Tag(column.clone()),
        None => args
            .get_one::<Dimension>("by")
            .cloned()
            .context("one of --by or --tag is required")?,
    };
    let sort = args.get_one::<Measure>("sort").copied();

    // --top conflicts with --within, so parents always sum their children
    if let Some(parent) = args.get_one::<Dimension>("within") {
        let mut hierarchy = aggregate_hierarchy(parent, &dimension, table, &measures);
        if let Some(measure) = sort {
            for group in &mut hierarchy.groups {
                sort_by(&mut group.children, measure, true);
            }
        }
        if args.get_flag("json") {
            return print_json(&hierarchy.treemap(sort.unwrap_or(Measure::Hours)));
        }
        for group in &hierarchy.groups {
            print_rows(std::slice::from_ref(&group.parent), "");
            print_rows(&group.children, "    ");
        }
        return Ok(());
    }

    let mut rows = aggregate_by(&dimension, table, &measures);
    if let Some(measure) = sort {
        sort_by(&mut rows, measure, true);
    }
    if let Some(n) = args.get_one::<usize>("top").copied() {
        rows.truncate(n);
    }
    if args.get_flag("json") {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("nothing to aggregate by {dimension}");
    }
    print_rows(&rows, "");
    Ok(())
}

pub(crate) fn compare(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let (_session, dataset) = open(config, args)?;
    let kind = args.get_one::<String>("kind").map_or("actual", String::as_str);
    let table = partition(&dataset, kind)?;
    let measures = MeasureColumns::for_kind(kind);
    let observed = table.date_range(&measures.date);

    let anchor = match (args.get_one::<NaiveDate>("anchor"), observed) {
        (Some(anchor), _) => *anchor,
        (None, Some(range)) => range.end,
        (None, None) => bail!("no dated records to anchor the comparison"),
    };
    let length = if args.get_flag("all") {
        WindowLength::All
    } else if args.get_flag("ytd") {
        WindowLength::YearToDate
    } else {
        WindowLength::Months(args.get_one::<u32>("months").copied().unwrap_or(3))
    };
    let mode = args
        .get_one::<ComparisonMode>("mode")
        .copied()
        .unwrap_or_default();

    let pair = compute_windows(anchor, length, mode, observed)?;
    let result = compare_periods(table, pair, &measures);
    if args.get_flag("json") {
        return print_json(&result);
    }

    println!("current    {}", pair.current);
    match (pair.comparison, result.has_comparison) {
        (Some(window), true) => println!("comparison {window}"),
        _ => println!("comparison unavailable"),
    }
    if let Some(warning) = &result.warning {
        println!("  ! {warning}");
    }
    for delta in &result.deltas {
        println!(
            "  {:<16} {:>12.1} vs {:>12.1}  {:>+10.1} ({:+.1}%) {:?}",
            delta.metric.to_string(),
            delta.current,
            delta.comparison,
            delta.absolute_delta,
            delta.percent_delta,
            delta.direction
        );
    }
    if !result.has_comparison {
        for metric in arkemy_analytics::PeriodMetric::ALL {
            println!("  {:<16} {:>12.1}", metric.to_string(), result.current.value(metric));
        }
    }
    Ok(())
}

pub(crate) fn plan(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let (_session, dataset) = open(config, args)?;
    let actual = aggregate_by(
        &Dimension::Project,
        partition(&dataset, "actual")?,
        &MeasureColumns::actual(),
    );
    let planned = aggregate_planned_by_project(
        partition(&dataset, "planned")?,
        &MeasureColumns::planned(),
    );
    let comparison = compare_actual_planned(&actual, &planned);
    if args.get_flag("json") {
        return print_json(&comparison);
    }

    for project in &comparison.projects {
        println!(
            "{:<30} hours {:>8.1} / {:>8.1} ({:+.1}%)  fee {:>10.0} / {:>10.0} ({:+.1}%)",
            project.label,
            project.hours.actual,
            project.hours.planned,
            project.hours.percent,
            project.fee.actual,
            project.fee.planned,
            project.fee.percent
        );
    }
    let s = &comparison.summary;
    println!(
        "{} in both, {} actual only, {} planned only",
        s.common, s.actual_only, s.planned_only
    );
    Ok(())
}

pub(crate) fn utilization(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let hours_per_day = args
        .get_one::<f64>("hours-per-day")
        .copied()
        .unwrap_or(config.work_hours_per_day);
    if !(hours_per_day.is_finite() && hours_per_day > 0.0) {
        bail!("--hours-per-day must be positive, got {hours_per_day}");
    }
    let (_session, dataset) = open(config, args)?;
    let rows = utilization_by_person(
        partition(&dataset, "actual")?,
        &MeasureColumns::actual(),
        hours_per_day,
    );
    if args.get_flag("json") {
        return print_json(&rows);
    }

    for row in &rows {
        println!(
            "{:<30} {:>4} days {:>8.1} / {:>8.1} h  {:>6.1}%  billable {:>6.1}%",
            row.person,
            row.days_worked,
            row.totals.hours,
            row.potential_hours,
            row.utilization,
            row.billable_utilization
        );
    }
    Ok(())
}
