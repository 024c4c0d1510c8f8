//! [`SqliteEngine`]: the SQLite implementation of [`SchemaExecutor`] and
//! [`TriggerInstaller`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use temporal_core::{
  Column, DropOptions, SchemaExecutor, TableDefinition, TemporalAdapter, TemporalPolicy,
  TriggerInstaller, capture::CaptureTrigger,
};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{RawColumn, encode_column, primary_key_sql, quote_ident, quote_list},
  render::{create_trigger_sql, drop_trigger_sql},
};

// ─── Engine ──────────────────────────────────────────────────────────────────

/// A schema executor and trigger installer over one SQLite connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteEngine {
  conn: tokio_rusqlite::Connection,
}

impl SqliteEngine {
  /// Open (or create) a database at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory database — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn })
  }

  /// Wrap this engine in a [`TemporalAdapter`] that uses it for both schema
  /// changes and trigger installation.
  pub fn adapter(&self, policy: TemporalPolicy) -> TemporalAdapter<Self, Self> {
    TemporalAdapter::new(self.clone(), self.clone(), policy)
  }

  /// The underlying connection, for application reads and writes.
  pub fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn execute(&self, sql: String) -> Result<()> {
    debug!(%sql, "execute");
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SchemaExecutor impl ─────────────────────────────────────────────────────

impl SchemaExecutor for SqliteEngine {
  type Error = Error;

  async fn create_table(&self, name: &str, definition: &TableDefinition) -> Result<()> {
    let columns = std::iter::once(primary_key_sql(&definition.primary_key))
      .chain(definition.columns.iter().map(encode_column))
      .collect::<Vec<_>>()
      .join(",\n  ");
    self
      .execute(format!("CREATE TABLE {} (\n  {columns}\n)", quote_ident(name)))
      .await
  }

  async fn drop_table(&self, name: &str, options: DropOptions) -> Result<()> {
    let if_exists = if options.if_exists { "IF EXISTS " } else { "" };
    self
      .execute(format!("DROP TABLE {if_exists}{}", quote_ident(name)))
      .await
  }

  async fn rename_table(&self, name: &str, new_name: &str) -> Result<()> {
    self
      .execute(format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(name),
        quote_ident(new_name)
      ))
      .await
  }

  async fn add_column(&self, table: &str, column: &Column) -> Result<()> {
    self
      .execute(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        encode_column(column)
      ))
      .await
  }

  async fn remove_columns(&self, table: &str, columns: &[String]) -> Result<()> {
    let statements: Vec<String> = columns
      .iter()
      .map(|c| format!("ALTER TABLE {} DROP COLUMN {}", quote_ident(table), quote_ident(c)))
      .collect();
    self
      .conn
      .call(move |conn| {
        let sp = conn.savepoint()?;
        for sql in &statements {
          sp.execute(sql, [])?;
        }
        sp.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// SQLite cannot alter a column in place, so the table is rebuilt: copy
  /// into a fresh table with the new declaration, drop the original, rename
  /// the copy, then restore the original's indexes and triggers.
  ///
  /// The `AUTOINCREMENT` counter is carried over as well, so ids of deleted
  /// rows are never handed out again.
  async fn change_column(&self, table: &str, column: &Column) -> Result<()> {
    let mut columns = self.columns_of(table).await?;
    let slot = columns
      .iter_mut()
      .find(|c| c.name == column.name)
      .ok_or_else(|| Error::NoSuchColumn {
        table:  table.to_owned(),
        column: column.name.clone(),
      })?;
    *slot = Column { primary_key: slot.primary_key, ..column.clone() };

    let table = table.to_owned();
    let scratch = format!("{table}__rebuild");
    let create = format!(
      "CREATE TABLE {} (\n  {}\n)",
      quote_ident(&scratch),
      columns.iter().map(encode_column).collect::<Vec<_>>().join(",\n  ")
    );
    let names = quote_list(columns.iter().map(|c| c.name.as_str()));

    debug!(%table, column = %column.name, "rebuilding table");
    self
      .conn
      .call(move |conn| {
        conn.pragma_update(None, "legacy_alter_table", true)?;
        let result = (|| {
          let sp = conn.savepoint()?;
          let dependents: Vec<String> = {
            let mut stmt = sp.prepare(
              "SELECT sql FROM sqlite_master
               WHERE type IN ('index', 'trigger') AND tbl_name = ?1 AND sql IS NOT NULL",
            )?;
            stmt
              .query_map(rusqlite::params![table], |r| r.get(0))?
              .collect::<rusqlite::Result<_>>()?
          };

          sp.execute_batch(&create)?;
          let seq: Option<i64> = sp
            .query_row(
              "SELECT seq FROM sqlite_sequence WHERE name = ?1",
              rusqlite::params![table],
              |r| r.get(0),
            )
            .optional()?;
          sp.execute_batch(&format!(
            "INSERT INTO {scratch_q} ({names}) SELECT {names} FROM {table_q};
             DROP TABLE {table_q};
             ALTER TABLE {scratch_q} RENAME TO {table_q};",
            scratch_q = quote_ident(&scratch),
            table_q = quote_ident(&table),
          ))?;
          if let Some(seq) = seq {
            sp.execute(
              "DELETE FROM sqlite_sequence WHERE name = ?1",
              rusqlite::params![table],
            )?;
            sp.execute(
              "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
              rusqlite::params![table, seq],
            )?;
          }
          for sql in &dependents {
            sp.execute_batch(sql)?;
          }
          sp.commit()
        })();
        conn.pragma_update(None, "legacy_alter_table", false)?;
        result?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<()> {
    self
      .execute(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote_ident(table),
        quote_ident(column),
        quote_ident(new_name)
      ))
      .await
  }

  async fn table_exists(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();
    let exists = self
      .conn
      .call(move |conn| {
        let count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
          rusqlite::params![name],
          |r| r.get(0),
        )?;
        Ok(count > 0)
      })
      .await?;
    Ok(exists)
  }

  async fn columns_of(&self, name: &str) -> Result<Vec<Column>> {
    let owned = name.to_owned();
    let raws: Vec<RawColumn> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, type, \"notnull\", dflt_value, pk
           FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owned], |row| {
            Ok(RawColumn {
              name:     row.get(0)?,
              declared: row.get(1)?,
              not_null: row.get(2)?,
              default:  row.get(3)?,
              pk:       row.get::<_, i64>(4)? > 0,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    if raws.is_empty() {
      return Err(Error::NoSuchTable(name.to_owned()));
    }
    raws.into_iter().map(RawColumn::into_column).collect()
  }

  async fn table_names(&self) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM sqlite_master
           WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
      })
      .await?;
    Ok(names)
  }
}

// ─── TriggerInstaller impl ───────────────────────────────────────────────────

impl TriggerInstaller for SqliteEngine {
  type Error = Error;

  async fn install(&self, trigger: &CaptureTrigger) -> Result<()> {
    self.execute(create_trigger_sql(trigger)).await
  }

  async fn uninstall(&self, name: &str) -> Result<()> { self.execute(drop_trigger_sql(name)).await }
}
