//! Encoding and decoding between `temporal-core` column values and SQLite
//! declarations.
//!
//! Size limits live in the declared type (`VARCHAR(40)`), which SQLite
//! stores verbatim and reports back through `pragma_table_info`.

use temporal_core::{Column, ColumnType};

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

pub fn quote_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
  names
    .into_iter()
    .map(quote_ident)
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── ColumnType ──────────────────────────────────────────────────────────────

pub fn encode_column_type(ty: ColumnType) -> &'static str {
  match ty {
    ColumnType::Integer => "INTEGER",
    ColumnType::BigInteger => "BIGINT",
    ColumnType::Float => "REAL",
    ColumnType::Decimal => "DECIMAL",
    ColumnType::String => "VARCHAR",
    ColumnType::Text => "TEXT",
    ColumnType::Boolean => "BOOLEAN",
    ColumnType::Date => "DATE",
    ColumnType::Time => "TIME",
    ColumnType::Timestamp => "TIMESTAMP",
    ColumnType::Binary => "BLOB",
  }
}

pub fn decode_column_type(base: &str) -> Result<ColumnType> {
  match base.to_ascii_uppercase().as_str() {
    "INTEGER" | "INT" => Ok(ColumnType::Integer),
    "BIGINT" => Ok(ColumnType::BigInteger),
    "REAL" | "FLOAT" | "DOUBLE" => Ok(ColumnType::Float),
    "DECIMAL" | "NUMERIC" => Ok(ColumnType::Decimal),
    "VARCHAR" => Ok(ColumnType::String),
    "TEXT" => Ok(ColumnType::Text),
    "BOOLEAN" => Ok(ColumnType::Boolean),
    "DATE" => Ok(ColumnType::Date),
    "TIME" => Ok(ColumnType::Time),
    "TIMESTAMP" | "DATETIME" => Ok(ColumnType::Timestamp),
    "BLOB" => Ok(ColumnType::Binary),
    _ => Err(Error::UnknownColumnType(base.to_owned())),
  }
}

/// `VARCHAR(40)` for a string column limited to 40.
pub fn encode_declared_type(ty: ColumnType, limit: Option<u32>) -> String {
  match limit {
    Some(n) => format!("{}({n})", encode_column_type(ty)),
    None => encode_column_type(ty).to_owned(),
  }
}

/// Split a declared type into its tag and limit. Only the first size
/// argument is kept (`DECIMAL(10,2)` has a limit of 10).
pub fn decode_declared_type(declared: &str) -> Result<(ColumnType, Option<u32>)> {
  let declared = declared.trim();
  let Some((base, args)) = declared.split_once('(') else {
    return Ok((decode_column_type(declared)?, None));
  };

  let limit = args
    .trim_end_matches(')')
    .split(',')
    .next()
    .and_then(|n| n.trim().parse().ok())
    .ok_or_else(|| Error::UnknownColumnType(declared.to_owned()))?;
  Ok((decode_column_type(base.trim())?, Some(limit)))
}

// ─── Column definitions ──────────────────────────────────────────────────────

/// Column definition as it appears inside `CREATE TABLE` / `ADD COLUMN`.
pub fn encode_column(column: &Column) -> String {
  if column.primary_key {
    return primary_key_sql(&column.name);
  }

  let mut sql = format!(
    "{} {}",
    quote_ident(&column.name),
    encode_declared_type(column.column_type, column.limit)
  );
  if !column.nullable {
    sql.push_str(" NOT NULL");
  }
  if let Some(default) = &column.default {
    sql.push_str(" DEFAULT ");
    sql.push_str(default);
  }
  sql
}

pub fn primary_key_sql(name: &str) -> String {
  format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(name))
}

/// A row of `pragma_table_info`, before type decoding.
pub struct RawColumn {
  pub name:     String,
  pub declared: String,
  pub not_null: bool,
  pub default:  Option<String>,
  pub pk:       bool,
}

impl RawColumn {
  pub fn into_column(self) -> Result<Column> {
    let (column_type, limit) = decode_declared_type(&self.declared)?;
    Ok(Column {
      name: self.name,
      column_type,
      limit,
      nullable: !self.not_null,
      default: self.default,
      primary_key: self.pk,
    })
  }
}
