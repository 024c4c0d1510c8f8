//! TOML migration files.
//!
//! A migration is an ordered list of `[[step]]` tables, each tagged by `op`:
//!
//! ```toml
//! [[step]]
//! op = "create_table"
//! name = "orders"
//! temporal = true
//! columns = [
//!   { name = "status", type = "string", limit = 20, nullable = false, default = "'pending'" },
//!   { name = "total", type = "decimal" },
//! ]
//!
//! [[step]]
//! op = "add_column"
//! table = "orders"
//! column = { name = "notes", type = "text" }
//! ```

use anyhow::Context as _;
use serde::Deserialize;
use temporal_core::{
  Column, DropOptions, SchemaExecutor, TableOptions, TemporalAdapter, TriggerInstaller,
};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Migration {
  #[serde(default, rename = "step")]
  pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
  CreateTable {
    name:     String,
    #[serde(default)]
    temporal: bool,
    #[serde(default)]
    columns:  Vec<Column>,
  },
  DropTable {
    name:      String,
    #[serde(default)]
    if_exists: bool,
  },
  RenameTable {
    name: String,
    to:   String,
  },
  AddColumn {
    table:  String,
    column: Column,
  },
  RemoveColumn {
    table:   String,
    columns: Vec<String>,
  },
  ChangeColumn {
    table:  String,
    column: Column,
  },
  RenameColumn {
    table:  String,
    column: String,
    to:     String,
  },
  AddTemporal {
    table: String,
  },
  RemoveTemporal {
    table: String,
  },
}

impl Step {
  pub fn op(&self) -> &'static str {
    match self {
      Self::CreateTable { .. } => "create_table",
      Self::DropTable { .. } => "drop_table",
      Self::RenameTable { .. } => "rename_table",
      Self::AddColumn { .. } => "add_column",
      Self::RemoveColumn { .. } => "remove_column",
      Self::ChangeColumn { .. } => "change_column",
      Self::RenameColumn { .. } => "rename_column",
      Self::AddTemporal { .. } => "add_temporal",
      Self::RemoveTemporal { .. } => "remove_temporal",
    }
  }

  async fn run<E, T>(&self, adapter: &TemporalAdapter<E, T>) -> temporal_core::Result<()>
  where
    E: SchemaExecutor,
    T: TriggerInstaller,
  {
    match self {
      Self::CreateTable { name, temporal, columns } => {
        let options = TableOptions { temporal: *temporal };
        adapter
          .create_table(name, &options, |t| {
            for column in columns {
              t.column(column.clone());
            }
          })
          .await
      }
      Self::DropTable { name, if_exists } => {
        adapter
          .drop_table(name, DropOptions { if_exists: *if_exists })
          .await
      }
      Self::RenameTable { name, to } => adapter.rename_table(name, to).await,
      Self::AddColumn { table, column } => adapter.add_column(table, column).await,
      Self::RemoveColumn { table, columns } => adapter.remove_columns(table, columns).await,
      Self::ChangeColumn { table, column } => adapter.change_column(table, column).await,
      Self::RenameColumn { table, column, to } => adapter.rename_column(table, column, to).await,
      Self::AddTemporal { table } => adapter.add_temporal_tracking(table).await,
      Self::RemoveTemporal { table } => adapter.remove_temporal_tracking(table).await,
    }
  }
}

impl Migration {
  pub fn parse(source: &str) -> anyhow::Result<Self> {
    toml::from_str(source).context("parsing migration file")
  }

  /// Apply every step in order, stopping at the first failure.
  pub async fn apply<E, T>(&self, adapter: &TemporalAdapter<E, T>) -> anyhow::Result<()>
  where
    E: SchemaExecutor,
    T: TriggerInstaller,
  {
    for (index, step) in self.steps.iter().enumerate() {
      let number = index + 1;
      info!(step = number, op = step.op(), "applying");
      step
        .run(adapter)
        .await
        .with_context(|| format!("step {number} ({}) failed", step.op()))?;
    }
    Ok(())
  }
}
