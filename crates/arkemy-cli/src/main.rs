//! `arkemy` operator CLI

mod commands;

use anyhow::{Context, Result};
use arkemy_analytics::{ComparisonMode, Dimension, Measure};
use arkemy_core::AppConfig;
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Unified dataset file")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn kind_arg() -> Arg {
    Arg::new("kind")
        .long("kind")
        .default_value("actual")
        .help("Record type to read")
}

fn build_cli() -> Command {
    Command::new("arkemy")
        .version(arkemy_core::VERSION)
        .about("Load, aggregate and compare Arkemy time-tracking datasets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("YAML application config"),
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Schema file instead of the built-in one"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("schema").about("Show the schema in use"))
        .subcommand(
            Command::new("discover")
                .about("List datasets and satellite files")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory to search; repeatable"),
                ),
        )
        .subcommand(
            Command::new("load")
                .about("Load a dataset and print what was found")
                .arg(file_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("aggregate")
                .about("Aggregate one record type by a dimension")
                .arg(file_arg())
                .arg(
                    Arg::new("by")
                        .long("by")
                        .required_unless_present("tag")
                        .value_parser(|s: &str| s.parse::<Dimension>())
                        .help("Dimension, e.g. customer, project, person, day, week, month, year, tag:<column>"),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .help("Tag column, overrides --by"),
                )
                .arg(
                    Arg::new("within")
                        .long("within")
                        .value_parser(|s: &str| s.parse::<Dimension>())
                        .help("Parent dimension for a two-level aggregation"),
                )
                .arg(kind_arg())
                .arg(
                    Arg::new("sort")
                        .long("sort")
                        .value_parser(|s: &str| s.parse::<Measure>())
                        .help("Measure to sort by, descending"),
                )
                .arg(
                    Arg::new("top")
                        .long("top")
                        .value_parser(value_parser!(usize))
                        .conflicts_with("within")
                        .help("Keep only the first N rows; not with --within"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare the current period against a previous one")
                .arg(file_arg())
                .arg(
                    Arg::new("anchor")
                        .long("anchor")
                        .value_parser(|s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                        .help("Last day of the current period; defaults to the latest record"),
                )
                .arg(
                    Arg::new("months")
                        .long("months")
                        .default_value("3")
                        .value_parser(value_parser!(u32))
                        .help("Window length in months"),
                )
                .arg(
                    Arg::new("ytd")
                        .long("ytd")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("all")
                        .help("Year to date"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("All available data"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .default_value("adjacent")
                        .value_parser(|s: &str| s.parse::<ComparisonMode>())
                        .help("adjacent or yoy"),
                )
                .arg(kind_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("utilization")
                .about("Hours against the working days each person logged")
                .arg(file_arg())
                .arg(
                    Arg::new("hours-per-day")
                        .long("hours-per-day")
                        .value_parser(value_parser!(f64))
                        .help("Standard working day; overrides the config"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Compare actual against planned work per project")
                .arg(file_arg())
                .arg(json_arg()),
        )
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    let writer = std::io::stderr;
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }
}

fn app_config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(schema) = matches.get_one::<PathBuf>("schema") {
        config = config.with_schema_path(schema);
    }
    if matches.get_flag("debug") {
        config = config.with_debug(true);
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = app_config(matches)?;
    init_tracing(config.log_level(), matches.get_flag("log-json"));
    tracing::debug!(command = matches.subcommand_name(), "starting");

    match matches.subcommand() {
        Some(("schema", _)) => commands::schema(config),
        Some(("discover", args)) => commands::discover(config, args),
        Some(("load", args)) => commands::load(config, args),
        Some(("aggregate", args)) => commands::aggregate(config, args),
        Some(("compare", args)) => commands::compare(config, args),
        Some(("plan", args)) => commands::plan(config, args),
        Some(("utilization", args)) => commands::utilization(config, args),
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn aggregate_parses_dimension_and_measure() {
        let matches = build_cli()
            .try_get_matches_from(["arkemy", "aggregate", "data.csv", "--by", "tag:project_tag_1", "--sort", "fee"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(
            args.get_one::<Dimension>("by"),
            Some(&Dimension::Tag("project_tag_1".to_string()))
        );
        assert_eq!(args.get_one::<Measure>("sort"), Some(&Measure::Fee));
    }

    #[test]
    fn tag_replaces_required_dimension() {
        let matches = build_cli()
            .try_get_matches_from(["arkemy", "aggregate", "data.csv", "--tag", "project_tag_1"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_one::<Dimension>("by").is_none());
    }

    #[test]
    fn aggregate_rejects_top_within_hierarchy() {
        let result = build_cli().try_get_matches_from([
            "arkemy", "aggregate", "data.csv", "--by", "customer", "--within", "customer_group", "--top", "2",
        ]);
        assert_eq!(
            result.map(|_| ()).map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ArgumentConflict)
        );
    }

    #[test]
    fn utilization_parses_working_day() {
        let matches = build_cli()
            .try_get_matches_from(["arkemy", "utilization", "data.csv", "--hours-per-day", "7.5"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "utilization");
        assert_eq!(args.get_one::<f64>("hours-per-day"), Some(&7.5));
    }

    #[test]
    fn compare_rejects_ytd_with_all() {
        let result = build_cli().try_get_matches_from(["arkemy", "compare", "data.csv", "--ytd", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_override_config() {
        let matches = build_cli()
            .try_get_matches_from(["arkemy", "--debug", "--schema", "s.yaml", "schema"])
            .unwrap();
        let config = app_config(&matches).unwrap();
        assert!(config.debug);
        assert_eq!(config.schema_path, Some(PathBuf::from("s.yaml")));
    }
}
