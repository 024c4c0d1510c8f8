//! Column Mirror: derives history-table columns from live-table columns.
//!
//! History rows are immutable snapshots, so only the declared type and size
//! limit are carried over. Defaults, nullability, and key flags stay on the
//! live table.

use crate::{
  Error, Result,
  column::{Column, ColumnType, TableDefinition},
};

/// Suffix appended to a live table name to form its history table name.
pub const HISTORY_SUFFIX: &str = "_h";

/// Surrogate primary key of every history table.
pub const HISTORY_KEY: &str = "history_id";

/// Identifier of the originating live row. Not unique in history.
pub const ROW_ID: &str = "id";

pub const EFF_FROM: &str = "eff_from";
pub const EFF_TO: &str = "eff_to";

/// `eff_to` value of the one open version of a live row.
pub const EFF_TO_SENTINEL: &str = "9999-12-31 00:00:00.000";

/// Columns every history table carries ahead of the mirrored ones.
pub const BOOKKEEPING: [&str; 4] = [HISTORY_KEY, ROW_ID, EFF_FROM, EFF_TO];

/// History table name for `table`.
///
/// Pure suffixing, so `history_name(new)` after a rename is exactly the name
/// the old history table must be renamed to.
pub fn history_name(table: &str) -> String { format!("{table}{HISTORY_SUFFIX}") }

/// Inverse of [`history_name`], if `name` looks like a history table.
pub fn live_name(name: &str) -> Option<&str> {
  name.strip_suffix(HISTORY_SUFFIX).filter(|live| !live.is_empty())
}

/// Mirror a single live column.
pub fn mirror_column(column: &Column) -> Column {
  Column {
    name:        column.name.clone(),
    column_type: column.column_type,
    limit:       column.limit,
    nullable:    true,
    default:     None,
    primary_key: false,
  }
}

/// Mirror a live column set, preserving order.
pub fn mirror(columns: &[Column]) -> Vec<Column> {
  columns.iter().map(mirror_column).collect()
}

/// The live columns that get mirrored: everything but the live primary key,
/// whose value lands in the `id` bookkeeping column instead.
pub fn mirrorable(columns: &[Column]) -> Vec<Column> {
  columns.iter().filter(|c| !c.primary_key).cloned().collect()
}

/// Fail if any of `names` would land on a bookkeeping column of `table`'s
/// history. Checked before anything is changed.
pub fn check_mirrorable<'n>(table: &str, names: impl IntoIterator<Item = &'n str>) -> Result<()> {
  match names.into_iter().find(|n| BOOKKEEPING.contains(n)) {
    Some(column) => Err(Error::inconsistent(
      table,
      format!("column {column:?} collides with a history bookkeeping column"),
    )),
    None => Ok(()),
  }
}

/// Full definition of the history table for a live table with `columns`.
pub fn history_definition(columns: &[Column]) -> TableDefinition {
  let mut all = vec![
    Column::new(ROW_ID, ColumnType::Integer),
    Column::new(EFF_FROM, ColumnType::Timestamp).not_null(),
    Column::new(EFF_TO, ColumnType::Timestamp)
      .not_null()
      .default_value(format!("'{EFF_TO_SENTINEL}'")),
  ];
  all.extend(mirror(&mirrorable(columns)));

  TableDefinition {
    primary_key: HISTORY_KEY.to_owned(),
    columns:     all,
  }
}

/// Split introspected history columns into the mirrored part, dropping the
/// bookkeeping columns.
pub fn mirrored_part(history_columns: &[Column]) -> Vec<Column> {
  history_columns
    .iter()
    .filter(|c| !BOOKKEEPING.contains(&c.name.as_str()))
    .cloned()
    .collect()
}
