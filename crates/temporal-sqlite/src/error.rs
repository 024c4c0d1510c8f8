//! Error type for `temporal-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A declared column type this backend cannot map to a `ColumnType`.
  #[error("unknown column type: {0:?}")]
  UnknownColumnType(String),

  #[error("no such table: {0}")]
  NoSuchTable(String),

  #[error("no such column: {table}.{column}")]
  NoSuchColumn { table: String, column: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
