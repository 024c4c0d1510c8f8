//! Schema-Change Interceptor.
//!
//! [`TemporalAdapter`] exposes the same operation set as the wrapped
//! [`SchemaExecutor`] and keeps history tables and capture triggers in step
//! with every structural change. Each operation runs the live change first;
//! a failure there returns before any history table is touched. Column names
//! that would collide with history bookkeeping are refused before either
//! table changes.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  capture::TriggerGenerator,
  column::{Column, DropOptions, TableBuilder, TableDefinition, TableOptions},
  executor::{NoCaptureTriggers, SchemaExecutor, TriggerInstaller},
  history::HistoryTables,
  mirror::{ROW_ID, check_mirrorable, history_name, live_name, mirror_column, mirrorable},
  policy::TemporalPolicy,
};

/// Wraps a schema executor with temporal bookkeeping.
pub struct TemporalAdapter<E, T = NoCaptureTriggers> {
  executor:  E,
  installer: T,
  policy:    TemporalPolicy,
}

impl<E, T> TemporalAdapter<E, T>
where
  E: SchemaExecutor,
  T: TriggerInstaller,
{
  pub fn new(executor: E, installer: T, policy: TemporalPolicy) -> Self {
    Self { executor, installer, policy }
  }

  pub fn executor(&self) -> &E { &self.executor }

  pub fn installer(&self) -> &T { &self.installer }

  pub fn policy(&self) -> &TemporalPolicy { &self.policy }

  pub fn history(&self) -> HistoryTables<'_, E, T> {
    HistoryTables::new(&self.executor, &self.installer)
  }

  // ── Table operations ──────────────────────────────────────────────────────

  /// Create a live table with the columns added by `build`, plus the
  /// attribution column when the policy asks for it. A history table follows
  /// if `options.temporal` is set or the policy tracks `name` by default.
  pub async fn create_table<F>(
    &self,
    name: &str,
    options: &TableOptions,
    build: F,
  ) -> Result<()>
  where
    F: FnOnce(&mut TableBuilder),
  {
    let mut builder = TableBuilder::default();
    build(&mut builder);

    let attribution = &self.policy.attribution_column;
    if self.policy.wants_attribution(name) && !builder.has_column(attribution) {
      builder.column(Column::new(
        attribution.as_str(),
        self.policy.attribution_column_type,
      ));
    }

    let definition = TableDefinition {
      primary_key: ROW_ID.to_owned(),
      columns:     builder.into_columns(),
    };
    let tracked = options.temporal || self.policy.tracks_by_default(name);
    if tracked {
      let columns = mirrorable(&definition.columns);
      check_mirrorable(name, columns.iter().map(|c| c.name.as_str()))?;
    }

    self
      .executor
      .create_table(name, &definition)
      .await
      .map_err(Error::executor)?;

    if tracked {
      self.history().create(name).await?;
    } else {
      debug!(table = name, "created without history");
    }
    Ok(())
  }

  /// Drop the live table, then its history table and triggers if present.
  pub async fn drop_table(&self, name: &str, options: DropOptions) -> Result<()> {
    self
      .executor
      .drop_table(name, options)
      .await
      .map_err(Error::executor)?;
    self.history().remove(name).await
  }

  /// Rename the live table and, when tracked, its history table; triggers
  /// are regenerated against `new_name`.
  ///
  /// If the live rename fails, the old triggers are reinstalled and nothing
  /// else changes. A failure after the live rename leaves the live table
  /// under its new name with tracking suspended; [`HistoryTables::verify`]
  /// reports that state.
  pub async fn rename_table(&self, name: &str, new_name: &str) -> Result<()> {
    if !self.history().exists(name).await? {
      return self
        .executor
        .rename_table(name, new_name)
        .await
        .map_err(Error::executor);
    }

    self.triggers().drop_triggers(name).await?;
    if let Err(err) = self.executor.rename_table(name, new_name).await {
      let err = Error::executor(err);
      self.restore_triggers(name, &err).await;
      return Err(err);
    }

    self.history().rename(name, new_name).await?;
    self.triggers().create_triggers(new_name).await
  }

  // ── Column operations ─────────────────────────────────────────────────────

  /// Add a column to the live table and its history. The existing triggers
  /// keep capturing the other columns until they are regenerated at the end.
  pub async fn add_column(&self, table: &str, column: &Column) -> Result<()> {
    let tracked = self.history().exists(table).await?;
    if tracked {
      check_mirrorable(table, [column.name.as_str()])?;
    }

    self
      .executor
      .add_column(table, column)
      .await
      .map_err(Error::executor)?;

    if tracked {
      self
        .executor
        .add_column(&history_name(table), &mirror_column(column))
        .await
        .map_err(Error::executor)?;
      self.triggers().create_triggers(table).await?;
      info!(table, column = %column.name, "history column added");
    }
    Ok(())
  }

  pub async fn remove_columns(&self, table: &str, columns: &[String]) -> Result<()> {
    if !self.history().exists(table).await? {
      return self
        .executor
        .remove_columns(table, columns)
        .await
        .map_err(Error::executor);
    }

    self
      .with_triggers_suspended(table, async {
        self
          .executor
          .remove_columns(table, columns)
          .await
          .map_err(Error::executor)?;
        self
          .executor
          .remove_columns(&history_name(table), columns)
          .await
          .map_err(Error::executor)
      })
      .await?;
    info!(table, columns = ?columns, "history columns removed");
    Ok(())
  }

  /// Change a column's declaration. Triggers copy columns by name, so they
  /// are left alone.
  pub async fn change_column(&self, table: &str, column: &Column) -> Result<()> {
    self
      .executor
      .change_column(table, column)
      .await
      .map_err(Error::executor)?;

    if self.history().exists(table).await? {
      self
        .executor
        .change_column(&history_name(table), &mirror_column(column))
        .await
        .map_err(Error::executor)?;
      info!(table, column = %column.name, "history column changed");
    }
    Ok(())
  }

  pub async fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<()> {
    if !self.history().exists(table).await? {
      return self
        .executor
        .rename_column(table, column, new_name)
        .await
        .map_err(Error::executor);
    }
    check_mirrorable(table, [new_name])?;

    self
      .with_triggers_suspended(table, async {
        self
          .executor
          .rename_column(table, column, new_name)
          .await
          .map_err(Error::executor)?;
        self
          .executor
          .rename_column(&history_name(table), column, new_name)
          .await
          .map_err(Error::executor)
      })
      .await?;
    info!(table, column, new_name, "history column renamed");
    Ok(())
  }

  // ── Explicit tracking ─────────────────────────────────────────────────────

  /// Start tracking an existing live table.
  pub async fn add_temporal_tracking(&self, table: &str) -> Result<()> {
    if !self
      .executor
      .table_exists(table)
      .await
      .map_err(Error::executor)?
    {
      return Err(Error::inconsistent(table, "live table does not exist"));
    }
    if self.history().exists(table).await? {
      return Err(Error::inconsistent(table, "history table already exists"));
    }
    self.history().create(table).await
  }

  /// Stop tracking `table`, dropping its history. No-op if untracked.
  pub async fn remove_temporal_tracking(&self, table: &str) -> Result<()> {
    self.history().remove(table).await
  }

  /// Live tables that currently have a history table.
  pub async fn tracked_tables(&self) -> Result<Vec<String>> {
    let names = self
      .executor
      .table_names()
      .await
      .map_err(Error::executor)?;
    Ok(
      names
        .iter()
        .filter_map(|n| live_name(n))
        .filter(|live| names.iter().any(|n| n.as_str() == *live))
        .map(str::to_owned)
        .collect(),
    )
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  fn triggers(&self) -> TriggerGenerator<'_, E, T> {
    TriggerGenerator::new(&self.executor, &self.installer)
  }

  /// Run a change to a tracked table whose capture triggers would block it.
  /// Triggers are removed first and regenerated afterwards, also when the
  /// change fails part way; the regenerated set copies only the columns live
  /// and history still share.
  async fn with_triggers_suspended<F>(&self, table: &str, change: F) -> Result<()>
  where
    F: Future<Output = Result<()>>,
  {
    self.triggers().drop_triggers(table).await?;
    match change.await {
      Ok(()) => self.triggers().create_triggers(table).await,
      Err(err) => {
        self.restore_triggers(table, &err).await;
        Err(err)
      }
    }
  }

  async fn restore_triggers(&self, table: &str, cause: &Error) {
    warn!(table, error = %cause, "schema change failed; reinstalling capture triggers");
    if let Err(restore) = self.triggers().create_triggers(table).await {
      warn!(table, error = %restore, "could not reinstall capture triggers");
    }
  }
}
