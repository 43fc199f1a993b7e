//! neurotriage: prediction history and dashboard metrics
//!
//! Command-line entry point over the per-user history store.
//!
//! # Usage
//!
//! ```bash
//! neurotriage [--db <path>] [--user <id> | --guest] <command>
//!
//!   ingest --file <name> [--result <path>]   append a classifier result (stdin if no --result)
//!   history [--limit N] [--search TEXT] [--class CLASS] [--sort KEY]
//!   metrics                                  summary and per-class breakdown
//!   window [--period 24h|7d|30d|90d]         trailing window vs the one before it
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neurotriage::adapters::sanitize::SanitizingMakeWriter;
use neurotriage::adapters::sqlite::SqliteKeyValueStore;
use neurotriage::config::{LogMode, TriageConfig};
use neurotriage::domain::{format_relative, Period};
use neurotriage::{
    ClassificationResult, HistoryQuery, PredictionClass, PredictionStore, SortOrder, TriageError,
};

const USAGE: &str = "Usage: neurotriage [--db <path>] [--user <id> | --guest] <ingest|history|metrics|window> [options]";

/// Exit code for malformed input.
const EXIT_BAD_INPUT: u8 = 2;

/// Exit code for any other failure.
const EXIT_FAILURE: u8 = 1;

enum Command {
    Ingest {
        filename: String,
        result_path: Option<PathBuf>,
    },
    History {
        limit: Option<usize>,
        query: HistoryQuery,
    },
    Metrics,
    Window {
        period: Period,
    },
}

fn usage_error(msg: &str) -> ! {
    eprintln!("{msg}\n{USAGE}");
    std::process::exit(i32::from(EXIT_BAD_INPUT));
}

fn required(value: Option<String>, flag: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| usage_error(&format!("{flag} requires a value")))
}

fn parse_args(cfg: &mut TriageConfig) -> Command {
    let mut args = std::env::args().skip(1);
    let mut command: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut result_path: Option<PathBuf> = None;
    let mut limit: Option<usize> = None;
    let mut query = HistoryQuery::default();
    let mut period = Period::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => cfg.db_path = PathBuf::from(required(args.next(), "--db")),
            "--user" => cfg.user = Some(required(args.next(), "--user")),
            "--guest" => cfg.user = None,
            "--file" => filename = Some(required(args.next(), "--file")),
            "--result" => result_path = Some(PathBuf::from(required(args.next(), "--result"))),
            "--limit" => {
                let v = required(args.next(), "--limit");
                limit = Some(
                    v.parse()
                        .unwrap_or_else(|_| usage_error(&format!("Invalid --limit: {v}"))),
                );
            }
            "--search" => query.search = Some(required(args.next(), "--search")),
            "--class" => {
                let v = required(args.next(), "--class");
                query.class = Some(
                    PredictionClass::from_code(&v)
                        .unwrap_or_else(|| usage_error(&format!("Unknown class: {v}"))),
                );
            }
            "--sort" => query.sort = SortOrder::from_key(&required(args.next(), "--sort")),
            "--period" => period = Period::parse_or_default(&required(args.next(), "--period")),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with('-') => usage_error(&format!("Unknown arg: {other}")),
            other if command.is_none() => command = Some(other.to_string()),
            other => usage_error(&format!("Unexpected argument: {other}")),
        }
    }

    match command.as_deref() {
        Some("ingest") => Command::Ingest {
            filename: filename.unwrap_or_else(|| usage_error("ingest requires --file")),
            result_path,
        },
        Some("history") => Command::History { limit, query },
        Some("metrics") => Command::Metrics,
        Some("window") => Command::Window { period },
        Some(other) => usage_error(&format!("Unknown command: {other}")),
        None => usage_error("Missing command"),
    }
}

fn init_logging(cfg: &TriageConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = match cfg.log_mode {
        LogMode::File => {
            if let Some(parent) = cfg.log_file.parent() {
                // Best-effort: a missing directory should not block startup.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&cfg.log_file)
                .with_context(|| format!("opening log file {}", cfg.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry<'a> {
    #[serde(flatten)]
    record: &'a neurotriage::PredictionRecord,
    age: String,
}

fn parse_result(body: &str) -> neurotriage::Result<ClassificationResult> {
    ClassificationResult::from_json(body)
        .map_err(|e| TriageError::Validation(format!("malformed classification result: {e}")))
}

fn read_result(path: Option<&PathBuf>) -> Result<ClassificationResult> {
    let body = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    Ok(parse_result(&body)?)
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TriageError>() {
        Some(TriageError::Validation(_)) => EXIT_BAD_INPUT,
        _ => EXIT_FAILURE,
    }
}

fn run(cfg: &TriageConfig, command: Command) -> Result<()> {
    let storage = Arc::new(
        SqliteKeyValueStore::new(&cfg.db_path)
            .with_context(|| format!("opening {}", cfg.db_path.display()))?,
    );
    let mut store = PredictionStore::open(storage)?;

    store.bind(&cfg.identity());

    match command {
        Command::Ingest {
            filename,
            result_path,
        } => {
            let result = read_result(result_path.as_ref())?;
            let record = store.append(result, filename)?;
            print_json(&record)?;
        }
        Command::History { limit, query } => {
            let now = chrono::Utc::now();
            let limit = limit.unwrap_or(cfg.recent_limit);
            let entries: Vec<HistoryEntry<'_>> = store
                .query(&query)
                .into_iter()
                .take(limit)
                .map(|record| HistoryEntry {
                    record,
                    age: format_relative(record.timestamp, now),
                })
                .collect();
            print_json(&entries)?;
        }
        Command::Metrics => print_json(store.dashboard())?,
        Command::Window { period } => print_json(&store.windowed(period, chrono::Utc::now()))?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let mut cfg = TriageConfig::from_env();
    let command = parse_args(&mut cfg);

    let guard = match init_logging(&cfg) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let outcome = run(&cfg, command);
    if let Err(e) = &outcome {
        tracing::warn!("Command failed: {:#}", e);
    }
    // Flushes the non-blocking writer.
    drop(guard);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}
