//! History Table Manager: creates, drops, renames, and verifies shadow
//! tables, and reinstalls capture triggers at the right points.

use tracing::{debug, info};

use crate::{
  Error, Result,
  capture::TriggerGenerator,
  column::DropOptions,
  executor::{SchemaExecutor, TriggerInstaller},
  mirror::{
    BOOKKEEPING, check_mirrorable, history_definition, history_name, mirror, mirrorable,
    mirrored_part,
  },
};

/// History-side operations for tables on one executor.
pub struct HistoryTables<'a, E, T> {
  executor: &'a E,
  triggers: TriggerGenerator<'a, E, T>,
}

impl<'a, E, T> HistoryTables<'a, E, T>
where
  E: SchemaExecutor,
  T: TriggerInstaller,
{
  pub fn new(executor: &'a E, installer: &'a T) -> Self {
    Self {
      executor,
      triggers: TriggerGenerator::new(executor, installer),
    }
  }

  pub fn triggers(&self) -> &TriggerGenerator<'a, E, T> { &self.triggers }

  /// Whether `table` currently has a history table. Always asks the
  /// executor.
  pub async fn exists(&self, table: &str) -> Result<bool> {
    self
      .executor
      .table_exists(&history_name(table))
      .await
      .map_err(Error::executor)
  }

  /// Create the history table for `table` from its current columns and
  /// install capture triggers. Refuses live columns that share a name with
  /// a bookkeeping column.
  pub async fn create(&self, table: &str) -> Result<()> {
    let columns = self
      .executor
      .columns_of(table)
      .await
      .map_err(Error::executor)?;
    check_mirrorable(table, mirrorable(&columns).iter().map(|c| c.name.as_str()))?;
    let definition = history_definition(&columns);
    let history = history_name(table);

    self
      .executor
      .create_table(&history, &definition)
      .await
      .map_err(Error::executor)?;
    self.triggers.create_triggers(table).await?;

    info!(table, history = %history, "history table created");
    Ok(())
  }

  /// Drop the triggers and the history table of `table`. No-op if absent.
  pub async fn remove(&self, table: &str) -> Result<()> {
    if !self.exists(table).await? {
      debug!(table, "no history table to drop");
      return Ok(());
    }
    let history = history_name(table);

    self.triggers.drop_triggers(table).await?;
    self
      .executor
      .drop_table(&history, DropOptions::default())
      .await
      .map_err(Error::executor)?;

    info!(table, history = %history, "history table dropped");
    Ok(())
  }

  /// Rename the history table of `table` to follow `new_table`.
  pub async fn rename(&self, table: &str, new_table: &str) -> Result<()> {
    let (from, to) = (history_name(table), history_name(new_table));
    self
      .executor
      .rename_table(&from, &to)
      .await
      .map_err(Error::executor)?;
    info!(%from, %to, "history table renamed");
    Ok(())
  }

  /// Check that the history table of `table` exists, carries every
  /// bookkeeping column, and mirrors the live columns exactly.
  pub async fn verify(&self, table: &str) -> Result<()> {
    if !self.exists(table).await? {
      return Err(Error::inconsistent(table, "history table is missing"));
    }

    let history = self
      .executor
      .columns_of(&history_name(table))
      .await
      .map_err(Error::executor)?;
    let live = self
      .executor
      .columns_of(table)
      .await
      .map_err(Error::executor)?;

    for name in BOOKKEEPING {
      if !history.iter().any(|c| c.name == name) {
        return Err(Error::inconsistent(
          table,
          format!("history table lacks bookkeeping column {name:?}"),
        ));
      }
    }

    let expected = mirror(&mirrorable(&live));
    let actual = mirror(&mirrored_part(&history));
    if expected != actual {
      let names = |cols: &[crate::Column]| {
        cols.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
      };
      return Err(Error::inconsistent(
        table,
        format!(
          "history columns [{}] do not mirror live columns [{}]",
          names(&actual),
          names(&expected),
        ),
      ));
    }
    Ok(())
  }
}
