//! Column value objects shared by the interceptor, the mirror, and every
//! executor backend.
//!
//! A [`Column`] is read from (or handed to) the schema executor once per
//! operation and never mutated afterwards.

use serde::{Deserialize, Serialize};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Declared type of a column. Engine-specific spelling is the executor's
/// concern; the core only compares and copies these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
  Integer,
  BigInteger,
  Float,
  Decimal,
  String,
  Text,
  Boolean,
  Date,
  Time,
  Timestamp,
  Binary,
}

/// A single column as declared on, or introspected from, a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
  /// Size limit (e.g. `VARCHAR(40)` has a limit of 40).
  #[serde(default)]
  pub limit:       Option<u32>,
  #[serde(default = "default_nullable")]
  pub nullable:    bool,
  /// Default value as a SQL literal, e.g. `'pending'` or `0`.
  #[serde(default)]
  pub default:     Option<String>,
  #[serde(default)]
  pub primary_key: bool,
}

fn default_nullable() -> bool { true }

impl Column {
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self {
      name: name.into(),
      column_type,
      limit: None,
      nullable: true,
      default: None,
      primary_key: false,
    }
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  pub fn default_value(mut self, literal: impl Into<String>) -> Self {
    self.default = Some(literal.into());
    self
  }
}

// ─── Table definitions ───────────────────────────────────────────────────────

/// Everything the schema executor needs to create a table.
///
/// The primary key is always an auto-assigned integer surrogate named
/// `primary_key`; it is not listed in `columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
  pub primary_key: String,
  pub columns:     Vec<Column>,
}

/// Options accepted by [`TemporalAdapter::create_table`](crate::TemporalAdapter::create_table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableOptions {
  /// Request a history table regardless of the create-by-default policy.
  #[serde(default)]
  pub temporal: bool,
}

/// Options accepted by `drop_table`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DropOptions {
  #[serde(default)]
  pub if_exists: bool,
}

/// Collects the caller's columns inside a `create_table` callback.
#[derive(Debug, Default)]
pub struct TableBuilder {
  columns: Vec<Column>,
}

impl TableBuilder {
  pub fn column(&mut self, column: Column) -> &mut Self {
    self.columns.push(column);
    self
  }

  pub fn string(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::String))
  }

  pub fn text(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::Text))
  }

  pub fn integer(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::Integer))
  }

  pub fn decimal(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::Decimal))
  }

  pub fn boolean(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::Boolean))
  }

  pub fn timestamp(&mut self, name: &str) -> &mut Self {
    self.column(Column::new(name, ColumnType::Timestamp))
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.columns.iter().any(|c| c.name == name)
  }

  pub fn into_columns(self) -> Vec<Column> { self.columns }
}
