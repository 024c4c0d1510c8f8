//! `temporal` — manage history tables of a SQLite database.
//!
//! # Usage
//!
//! ```text
//! temporal --database app.db migrate migrations/001_orders.toml
//! temporal enable orders
//! temporal check --json
//! ```
//!
//! The temporal policy is read from `[policy]` in `temporal.toml` (or the
//! file given with `--config`) and from `TEMPORAL_`-prefixed environment
//! variables, e.g. `TEMPORAL_POLICY__CREATE_BY_DEFAULT=true`.

mod migration;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use migration::Migration;
use serde::{Deserialize, Serialize};
use temporal_core::{
  Error as CoreError, SchemaExecutor, TemporalAdapter, TemporalPolicy, mirror::live_name,
};
use temporal_sqlite::SqliteEngine;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Temporal history tables for SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "temporal.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `database` from the config file.
  #[arg(short, long)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Apply a TOML migration file step by step.
  Migrate { file: PathBuf },
  /// Start tracking history for an existing table.
  Enable { table: String },
  /// Stop tracking history for a table and drop its history table.
  Disable { table: String },
  /// Verify that every history table mirrors its live table.
  Check {
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
  },
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Settings {
  #[serde(default = "default_database")]
  database: PathBuf,
  #[serde(default)]
  policy:   TemporalPolicy,
}

fn default_database() -> PathBuf { PathBuf::from("temporal.db") }

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("TEMPORAL")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("policy.skip")
        .with_list_parse_key("policy.attribution_skip"),
    )
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli.config)?;

  let database = expand_tilde(cli.database.as_deref().unwrap_or(&settings.database));
  let engine = SqliteEngine::open(&database)
    .await
    .with_context(|| format!("failed to open database at {database:?}"))?;
  let adapter = engine.adapter(settings.policy);

  match cli.command {
    Command::Migrate { file } => {
      let source = std::fs::read_to_string(&file)
        .with_context(|| format!("reading migration {}", file.display()))?;
      Migration::parse(&source)?.apply(&adapter).await?;
      tracing::info!(migration = %file.display(), "migration applied");
    }
    Command::Enable { table } => {
      adapter
        .add_temporal_tracking(&table)
        .await
        .with_context(|| format!("enabling history for {table}"))?;
    }
    Command::Disable { table } => {
      adapter
        .remove_temporal_tracking(&table)
        .await
        .with_context(|| format!("disabling history for {table}"))?;
    }
    Command::Check { json } => {
      let report = check(&adapter).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
      } else {
        for entry in &report {
          match &entry.problem {
            Some(problem) => println!("{:<32} INCONSISTENT  {problem}", entry.table),
            None => println!("{:<32} ok", entry.table),
          }
        }
      }
      let broken = report.iter().filter(|e| e.problem.is_some()).count();
      if broken > 0 {
        bail!("{broken} history table(s) inconsistent");
      }
    }
  }

  Ok(())
}

// ─── Check ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CheckEntry {
  table:   String,
  history: String,
  problem: Option<String>,
}

/// Verify every history table in the database, including orphans whose live
/// table is gone.
async fn check(
  adapter: &TemporalAdapter<SqliteEngine, SqliteEngine>,
) -> anyhow::Result<Vec<CheckEntry>> {
  let names = adapter
    .executor()
    .table_names()
    .await
    .context("listing tables")?;

  let mut report = Vec::new();
  for history in &names {
    let Some(table) = live_name(history) else {
      continue;
    };
    let problem = if !names.iter().any(|n| n == table) {
      Some("live table does not exist".to_owned())
    } else {
      match adapter.history().verify(table).await {
        Ok(()) => None,
        Err(CoreError::InconsistentState { reason, .. }) => Some(reason),
        Err(other) => {
          return Err(anyhow::Error::new(other).context(format!("checking {table}")));
        }
      }
    };
    report.push(CheckEntry {
      table: table.to_owned(),
      history: history.clone(),
      problem,
    });
  }
  Ok(report)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
