//! Contracts for the external collaborators the core drives.
//!
//! [`SchemaExecutor`] performs structural changes and introspection on the
//! database; [`TriggerInstaller`] turns a [`CaptureTrigger`] into
//! engine-level trigger logic. Backends (e.g. `temporal-sqlite`) implement
//! both. The core performs no storage I/O of its own.

use std::future::Future;

use crate::{
  capture::CaptureTrigger,
  column::{Column, DropOptions, TableDefinition},
};

/// The underlying schema-change surface the interceptor wraps.
///
/// Every method maps to exactly one structural change or introspection
/// query. Implementations must report the database's current state, not a
/// cached view: migrations may span process restarts.
pub trait SchemaExecutor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_table<'a>(
    &'a self,
    name: &'a str,
    definition: &'a TableDefinition,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn drop_table<'a>(
    &'a self,
    name: &'a str,
    options: DropOptions,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn rename_table<'a>(
    &'a self,
    name: &'a str,
    new_name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn add_column<'a>(
    &'a self,
    table: &'a str,
    column: &'a Column,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn remove_columns<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Replace the declaration of `column.name` with `column`.
  fn change_column<'a>(
    &'a self,
    table: &'a str,
    column: &'a Column,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn rename_column<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
    new_name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn table_exists<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Columns of `name` in declaration order, primary key included.
  fn columns_of<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<Column>, Self::Error>> + Send + 'a;

  /// Names of every user table, sorted.
  fn table_names(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}

/// Installs and removes engine-level capture triggers.
pub trait TriggerInstaller: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Install `trigger`. The caller has already removed any trigger with the
  /// same name.
  fn install<'a>(
    &'a self,
    trigger: &'a CaptureTrigger,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the trigger called `name`. Must succeed if it does not exist.
  fn uninstall<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Placeholder installer for engines without trigger support.
///
/// Every call fails with [`Error::Unimplemented`](crate::Error::Unimplemented)
/// at call time, so enabling tracking on such an engine fails loudly instead
/// of producing a history table that is never written.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptureTriggers;

impl TriggerInstaller for NoCaptureTriggers {
  type Error = crate::Error;

  async fn install(&self, _trigger: &CaptureTrigger) -> crate::Result<()> {
    Err(crate::Error::Unimplemented("create_temporal_triggers"))
  }

  async fn uninstall(&self, _name: &str) -> crate::Result<()> {
    Err(crate::Error::Unimplemented("drop_temporal_triggers"))
  }
}
