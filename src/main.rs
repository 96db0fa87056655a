//! Binary entry point for sqlaccess.
//!
//! This binary runs statements against a database through the gateway and
//! prints query rows as JSON.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use sqlaccess::config::AccessConfig;
use sqlaccess::{Gateway, Lane, TransactionUnit, Value, observability};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// sqlaccess - run statements against an embedded `SQLite` database.
#[derive(Parser)]
#[command(name = "sqlaccess")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the database file.
    #[arg(long, global = true, env = "SQLACCESS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Database file name.
    #[arg(long = "db", global = true, env = "SQLACCESS_DB_NAME")]
    database_name: Option<String>,

    /// Directory holding a template database to seed from.
    #[arg(long = "seed", global = true, env = "SQLACCESS_SEED_DIR")]
    seed_dir: Option<PathBuf>,

    /// Create the database file if it does not exist.
    #[arg(long, global = true)]
    create: bool,

    /// Run on the background lane instead of the foreground lane.
    #[arg(long, global = true)]
    background: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Execute one statement.
    Exec {
        /// Statement text with `?` placeholders.
        sql: String,
        /// Positional parameters (`null`, `true`/`false`, numbers, or text).
        params: Vec<String>,
    },

    /// Run a query and print the rows as JSON.
    Query {
        /// Statement text with `?` placeholders.
        sql: String,
        /// Positional parameters (`null`, `true`/`false`, numbers, or text).
        params: Vec<String>,
    },

    /// Run a JSON file of `{"sql": .., "params": [..]}` units, each in its
    /// own transaction.
    Batch {
        /// Batch file.
        file: PathBuf,
        /// Roll back a unit that fails.
        #[arg(long)]
        rollback: bool,
        /// Treat units as queries and print the collected rows.
        #[arg(long)]
        read: bool,
    },

    /// Print the crate and engine versions.
    Version,
}

/// One unit of a batch file.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    sql: String,
    #[serde(default)]
    params: Vec<serde_json::Value>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<AccessConfig> {
    let mut config = match &cli.config {
        Some(path) => AccessConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => AccessConfig::load_default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(name) = &cli.database_name {
        config.database_name.clone_from(name);
    }
    if let Some(dir) = &cli.seed_dir {
        config.seed_dir = Some(dir.clone());
    }
    if cli.create {
        config.create_if_missing = true;
    }
    Ok(config)
}

/// Runs the selected command.
fn run_command(cli: Cli, config: AccessConfig) -> Result<()> {
    if matches!(cli.command, Commands::Version) {
        println!(
            "sqlaccess {} (SQLite {})",
            env!("CARGO_PKG_VERSION"),
            Gateway::engine_version()
        );
        return Ok(());
    }

    let lane = if cli.background {
        Lane::Background
    } else {
        Lane::Foreground
    };
    let copy_seed = config.seed_dir.is_some();
    let gateway = Gateway::new(config)?;
    gateway
        .open(copy_seed)
        .with_context(|| format!("opening {}", gateway.database_path().display()))?;

    let result = match cli.command {
        Commands::Exec { sql, params } => cmd_exec(&gateway, lane, &sql, &params),
        Commands::Query { sql, params } => cmd_query(&gateway, lane, &sql, &params),
        Commands::Batch {
            file,
            rollback,
            read,
        } => cmd_batch(&gateway, lane, &file, rollback || gateway.rollback_on_error(), read),
        Commands::Version => Ok(()),
    };
    gateway.close();
    result
}

fn cmd_exec(gateway: &Gateway, lane: Lane, sql: &str, params: &[String]) -> Result<()> {
    let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
    gateway.lane(lane).try_execute(sql, &params)?;
    Ok(())
}

fn cmd_query(gateway: &Gateway, lane: Lane, sql: &str, params: &[String]) -> Result<()> {
    let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
    let rows = gateway.lane(lane).try_query(sql, &params)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn cmd_batch(gateway: &Gateway, lane: Lane, file: &Path, rollback: bool, read: bool) -> Result<()> {
    let contents =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let entries: Vec<BatchEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", file.display()))?;
    let batch: Vec<TransactionUnit> = entries
        .into_iter()
        .map(|entry| {
            TransactionUnit::new(entry.sql, entry.params.iter().map(json_to_value).collect())
        })
        .collect();

    let handle = gateway.lane(lane);
    if read {
        let rows = handle.try_query_batch(&batch, rollback)?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        handle.try_execute_batch(&batch, rollback)?;
    }
    Ok(())
}

/// Parses a command-line parameter: `null`, a boolean, an integer, a
/// float, or else text.
fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int64(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Double(f);
    }
    Value::Text(raw.to_string())
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int64)
            .or_else(|| n.as_f64().map(Value::Double))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("NULL"), Value::Null);
        assert_eq!(parse_param("true"), Value::Bool(true));
        assert_eq!(parse_param("42"), Value::Int64(42));
        assert_eq!(parse_param("2.5"), Value::Double(2.5));
        assert_eq!(parse_param("hello"), Value::from("hello"));
    }

    #[test]
    fn test_json_to_value() {
        let json: serde_json::Value =
            serde_json::from_str(r#"[null, false, 7, 1.5, "x", [1]]"#).unwrap();
        let values: Vec<Value> = json
            .as_array()
            .unwrap()
            .iter()
            .map(json_to_value)
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(false),
                Value::Int64(7),
                Value::Double(1.5),
                Value::from("x"),
                Value::from("[1]"),
            ]
        );
    }

    #[test]
    fn test_cli_parses_batch() {
        let cli = Cli::try_parse_from([
            "sqlaccess",
            "--db",
            "app.db",
            "batch",
            "units.json",
            "--rollback",
        ])
        .unwrap();
        assert_eq!(cli.database_name.as_deref(), Some("app.db"));
        assert!(matches!(
            cli.command,
            Commands::Batch {
                rollback: true,
                read: false,
                ..
            }
        ));
    }
}
