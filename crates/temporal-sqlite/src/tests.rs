//! Integration tests for `SqliteEngine` against an in-memory database.
//!
//! These drive real SQLite triggers, so they check the capture protocol end
//! to end: every live write must leave the history intervals of its row
//! contiguous, non-overlapping, and with at most one open version.

use chrono::NaiveDateTime;
use temporal_core::{
  Column, ColumnType, DropOptions, Error as CoreError, SchemaExecutor, TableOptions,
  TemporalAdapter, TemporalPolicy, mirror::EFF_TO_SENTINEL,
};

use crate::SqliteEngine;

type Adapter = TemporalAdapter<SqliteEngine, SqliteEngine>;

async fn setup(policy: TemporalPolicy) -> (SqliteEngine, Adapter) {
  let engine = SqliteEngine::open_in_memory()
    .await
    .expect("in-memory engine");
  let adapter = engine.adapter(policy);
  (engine, adapter)
}

async fn orders(a: &Adapter) {
  a.create_table("orders", &TableOptions { temporal: true }, |t| {
    t.column(
      Column::new("status", ColumnType::String)
        .limit(20)
        .not_null()
        .default_value("'pending'"),
    )
    .decimal("total");
  })
  .await
  .unwrap();
}

async fn exec(e: &SqliteEngine, sql: &str) {
  let sql = sql.to_owned();
  e.connection()
    .call(move |conn| {
      conn.execute_batch(&sql)?;
      Ok(())
    })
    .await
    .unwrap();
}

async fn scalar(e: &SqliteEngine, sql: &str) -> Option<String> {
  let sql = sql.to_owned();
  e.connection()
    .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
    .await
    .unwrap()
}

async fn count(e: &SqliteEngine, sql: &str) -> i64 {
  let sql = sql.to_owned();
  e.connection()
    .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
    .await
    .unwrap()
}

async fn trigger_sql(e: &SqliteEngine) -> Vec<String> {
  e.connection()
    .call(|conn| {
      let mut stmt =
        conn.prepare("SELECT sql FROM sqlite_master WHERE type = 'trigger' ORDER BY name")?;
      let rows = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
      Ok(rows)
    })
    .await
    .unwrap()
}

// ─── Interval helpers ────────────────────────────────────────────────────────

#[derive(Debug)]
struct Version {
  eff_from: String,
  eff_to:   String,
}

async fn versions(e: &SqliteEngine, history: &str, id: i64) -> Vec<Version> {
  let sql = format!(
    "SELECT eff_from, eff_to FROM \"{history}\" WHERE id = ?1 ORDER BY history_id"
  );
  e.connection()
    .call(move |conn| {
      let mut stmt = conn.prepare(&sql)?;
      let rows = stmt
        .query_map([id], |r| {
          Ok(Version {
            eff_from: r.get(0)?,
            eff_to:   r.get(1)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap()
}

fn ts(s: &str) -> NaiveDateTime {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.3f")
    .unwrap_or_else(|e| panic!("bad timestamp {s:?}: {e}"))
}

/// Versions of one id partition time: each closes exactly where the next
/// opens, none runs backwards, and only the last may be open.
fn assert_partition(versions: &[Version], live: bool) {
  assert!(!versions.is_empty());
  for pair in versions.windows(2) {
    assert_eq!(pair[0].eff_to, pair[1].eff_from, "gap or overlap in {versions:?}");
  }
  for v in versions {
    assert!(ts(&v.eff_from) <= ts(&v.eff_to), "backwards interval {v:?}");
  }
  let open = versions.iter().filter(|v| v.eff_to == EFF_TO_SENTINEL).count();
  assert_eq!(open, usize::from(live), "open versions in {versions:?}");
}

// ─── Capture protocol ────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_update_delete_scenario() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;
  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 1);
  assert_eq!(v[0].eff_to, EFF_TO_SENTINEL);

  exec(&e, "UPDATE orders SET total = 12 WHERE id = 1").await;
  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 2);
  assert_ne!(v[0].eff_to, EFF_TO_SENTINEL);
  assert_eq!(v[0].eff_to, v[1].eff_from);
  assert_eq!(v[1].eff_to, EFF_TO_SENTINEL);
  assert_eq!(
    scalar(&e, "SELECT CAST(total AS TEXT) FROM orders_h WHERE id = 1 ORDER BY history_id DESC").await,
    Some("12".to_owned())
  );

  exec(&e, "DELETE FROM orders WHERE id = 1").await;
  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 2);
  assert_partition(&v, false);
}

#[tokio::test]
async fn history_rows_copy_live_defaults() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  exec(&e, "INSERT INTO orders (total) VALUES (5)").await;
  assert_eq!(
    scalar(&e, "SELECT status FROM orders_h").await,
    Some("pending".to_owned())
  );
}

#[tokio::test]
async fn intervals_partition_time_across_many_writes() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 0), (2, 0)").await;
  for i in 1..=20 {
    exec(&e, &format!("UPDATE orders SET total = {i} WHERE id = 1")).await;
    if i % 3 == 0 {
      exec(&e, &format!("UPDATE orders SET total = {i} WHERE id = 2")).await;
    }
  }
  // One statement touching every row closes and reopens each id once.
  exec(&e, "UPDATE orders SET status = 'shipped'").await;
  exec(&e, "DELETE FROM orders WHERE id = 2").await;

  let one = versions(&e, "orders_h", 1).await;
  assert_eq!(one.len(), 22);
  assert_partition(&one, true);

  let two = versions(&e, "orders_h", 2).await;
  assert_eq!(two.len(), 8);
  assert_partition(&two, false);
}

#[tokio::test]
async fn updates_inside_one_transaction_stay_contiguous() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 1)").await;
  exec(
    &e,
    "BEGIN; UPDATE orders SET total = 2 WHERE id = 1; UPDATE orders SET total = 3 WHERE id = 1; COMMIT;",
  )
  .await;

  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 3);
  assert_partition(&v, true);
}

// ─── Schema changes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn add_column_reaches_new_history_rows() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;

  a.add_column("orders", &Column::new("notes", ColumnType::Text))
    .await
    .unwrap();
  a.history().verify("orders").await.unwrap();

  exec(&e, "INSERT INTO orders (id, total, notes) VALUES (2, 3, 'gift')").await;
  exec(&e, "UPDATE orders SET notes = 'rush' WHERE id = 1").await;

  assert_eq!(
    scalar(&e, "SELECT notes FROM orders_h WHERE id = 2").await,
    Some("gift".to_owned())
  );
  assert_eq!(
    scalar(&e, "SELECT notes FROM orders_h WHERE id = 1 AND eff_to = '9999-12-31 00:00:00.000'")
      .await,
    Some("rush".to_owned())
  );
  assert_partition(&versions(&e, "orders_h", 1).await, true);
}

#[tokio::test]
async fn remove_column_keeps_capture_working() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;

  a.remove_columns("orders", &["total".to_owned()]).await.unwrap();
  a.history().verify("orders").await.unwrap();

  let history = e.columns_of("orders_h").await.unwrap();
  assert!(history.iter().all(|c| c.name != "total"));

  exec(&e, "UPDATE orders SET status = 'paid' WHERE id = 1").await;
  assert_partition(&versions(&e, "orders_h", 1).await, true);
}

#[tokio::test]
async fn rename_column_follows_into_history() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;

  a.rename_column("orders", "total", "amount").await.unwrap();
  a.history().verify("orders").await.unwrap();

  exec(&e, "UPDATE orders SET amount = 11 WHERE id = 1").await;
  assert_eq!(
    count(&e, "SELECT COUNT(*) FROM orders_h WHERE id = 1 AND amount IS NOT NULL").await,
    2
  );
}

#[tokio::test]
async fn change_column_rebuilds_without_losing_triggers_or_rows() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "INSERT INTO orders (id, status, total) VALUES (1, 'new', 10)").await;
  let before = trigger_sql(&e).await;

  let status = Column::new("status", ColumnType::String)
    .limit(64)
    .not_null()
    .default_value("'pending'");
  a.change_column("orders", &status).await.unwrap();
  a.history().verify("orders").await.unwrap();

  let live = e.columns_of("orders").await.unwrap();
  let changed = live.iter().find(|c| c.name == "status").unwrap();
  assert_eq!(changed.limit, Some(64));
  assert!(!changed.nullable);

  let history = e.columns_of("orders_h").await.unwrap();
  let mirrored = history.iter().find(|c| c.name == "status").unwrap();
  assert_eq!(mirrored.limit, Some(64));
  assert!(mirrored.nullable);

  assert_eq!(trigger_sql(&e).await, before);
  exec(&e, "UPDATE orders SET status = 'paid' WHERE id = 1").await;
  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 2);
  assert_partition(&v, true);
}

#[tokio::test]
async fn change_column_rejects_unknown_column() {
  let (_, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  let err = a
    .change_column("orders", &Column::new("missing", ColumnType::Text))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Executor(_)));
  assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn change_column_never_reuses_deleted_ids() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(
    &e,
    "INSERT INTO orders (total) VALUES (1);
     INSERT INTO orders (total) VALUES (2);
     INSERT INTO orders (total) VALUES (3);
     DELETE FROM orders WHERE id = 3;",
  )
  .await;

  let status = Column::new("status", ColumnType::Text).not_null().default_value("'pending'");
  a.change_column("orders", &status).await.unwrap();

  exec(&e, "INSERT INTO orders (total) VALUES (4)").await;
  assert_eq!(count(&e, "SELECT MAX(id) FROM orders").await, 4);

  assert_partition(&versions(&e, "orders_h", 3).await, false);
  assert_partition(&versions(&e, "orders_h", 4).await, true);
}

#[tokio::test]
async fn bookkeeping_column_names_leave_capture_intact() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  let err = a
    .add_column("orders", &Column::new("eff_to", ColumnType::Text))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InconsistentState { .. }), "{err}");
  assert!(!e.columns_of("orders").await.unwrap().iter().any(|c| c.name == "eff_to"));

  assert_eq!(trigger_sql(&e).await.len(), 3);
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;
  assert_eq!(count(&e, "SELECT COUNT(*) FROM orders_h").await, 1);
  assert_eq!(a.tracked_tables().await.unwrap(), ["orders"]);

  let err = a
    .create_table("notes", &TableOptions { temporal: true }, |t| {
      t.text("eff_from");
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InconsistentState { .. }), "{err}");
  assert!(!e.table_exists("notes").await.unwrap());
  assert!(!e.table_exists("notes_h").await.unwrap());
}

#[tokio::test]
async fn failed_history_column_rename_keeps_capture_running() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  // History already holds the target name, so only the live rename succeeds.
  e.add_column("orders_h", &Column::new("amount", ColumnType::Decimal))
    .await
    .unwrap();

  assert!(a.rename_column("orders", "total", "amount").await.is_err());

  assert_eq!(trigger_sql(&e).await.len(), 3);
  exec(&e, "INSERT INTO orders (id, amount) VALUES (1, 10)").await;
  exec(&e, "UPDATE orders SET status = 'paid' WHERE id = 1").await;
  assert_partition(&versions(&e, "orders_h", 1).await, true);
  assert_eq!(
    scalar(&e, "SELECT status FROM orders_h WHERE eff_to = '9999-12-31 00:00:00.000'").await,
    Some("paid".to_owned())
  );
  assert!(a.history().verify("orders").await.is_err());
}

#[tokio::test]
async fn rename_round_trip_keeps_every_history_row() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;
  let triggers = trigger_sql(&e).await;

  a.rename_table("orders", "purchases").await.unwrap();
  assert_eq!(count(&e, "SELECT COUNT(*) FROM purchases_h").await, 1);
  exec(&e, "UPDATE purchases SET total = 11 WHERE id = 1").await;
  assert_partition(&versions(&e, "purchases_h", 1).await, true);

  a.rename_table("purchases", "orders").await.unwrap();
  assert_eq!(count(&e, "SELECT COUNT(*) FROM orders_h").await, 2);
  assert_eq!(trigger_sql(&e).await, triggers);

  exec(&e, "UPDATE orders SET total = 12 WHERE id = 1").await;
  let v = versions(&e, "orders_h", 1).await;
  assert_eq!(v.len(), 3);
  assert_partition(&v, true);
}

#[tokio::test]
async fn failed_rename_keeps_tracking_active() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "CREATE TABLE taken (id INTEGER PRIMARY KEY)").await;

  let err = a.rename_table("orders", "taken").await.unwrap_err();
  assert!(matches!(err, CoreError::Executor(_)));

  assert_eq!(trigger_sql(&e).await.len(), 3);
  exec(&e, "INSERT INTO orders (id, total) VALUES (1, 10)").await;
  assert_eq!(versions(&e, "orders_h", 1).await.len(), 1);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn drop_table_removes_history_and_triggers() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;

  a.drop_table("orders", DropOptions::default()).await.unwrap();

  assert!(!e.table_exists("orders").await.unwrap());
  assert!(!e.table_exists("orders_h").await.unwrap());
  assert!(trigger_sql(&e).await.is_empty());
}

#[tokio::test]
async fn create_by_default_policy_applies_automatically() {
  let (e, a) = setup(TemporalPolicy {
    create_by_default: true,
    skip: ["sessions".to_owned()].into(),
    add_attribution_column: true,
    ..Default::default()
  })
  .await;

  a.create_table("accounts", &TableOptions::default(), |t| {
    t.string("email");
  })
  .await
  .unwrap();
  a.create_table("sessions", &TableOptions::default(), |t| {
    t.string("token");
  })
  .await
  .unwrap();

  assert_eq!(a.tracked_tables().await.unwrap(), ["accounts"]);
  assert!(
    e.columns_of("sessions")
      .await
      .unwrap()
      .iter()
      .any(|c| c.name == "updated_by")
  );

  exec(&e, "INSERT INTO accounts (email, updated_by) VALUES ('a@example.com', 'ops')").await;
  assert_eq!(
    scalar(&e, "SELECT updated_by FROM accounts_h").await,
    Some("ops".to_owned())
  );
}

#[tokio::test]
async fn tracking_can_be_added_and_removed_later() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  a.create_table("notes", &TableOptions::default(), |t| {
    t.text("body");
  })
  .await
  .unwrap();
  exec(&e, "INSERT INTO notes (id, body) VALUES (1, 'before')").await;

  a.add_temporal_tracking("notes").await.unwrap();
  exec(&e, "UPDATE notes SET body = 'after' WHERE id = 1").await;
  // Existing rows are not backfilled; the first captured write has nothing
  // to close.
  let v = versions(&e, "notes_h", 1).await;
  assert_eq!(v.len(), 1);
  assert_eq!(v[0].eff_to, EFF_TO_SENTINEL);

  a.remove_temporal_tracking("notes").await.unwrap();
  assert!(!e.table_exists("notes_h").await.unwrap());
  assert!(trigger_sql(&e).await.is_empty());
  exec(&e, "UPDATE notes SET body = 'untracked' WHERE id = 1").await;
}

#[tokio::test]
async fn regenerating_triggers_is_idempotent() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  let once = trigger_sql(&e).await;

  let history = a.history();
  let generator = history.triggers();
  generator.drop_triggers("orders").await.unwrap();
  generator.create_triggers("orders").await.unwrap();
  generator.drop_triggers("orders").await.unwrap();
  generator.create_triggers("orders").await.unwrap();
  generator.create_triggers("orders").await.unwrap();

  assert_eq!(trigger_sql(&e).await, once);
}

#[tokio::test]
async fn verify_detects_history_drift() {
  let (e, a) = setup(TemporalPolicy::default()).await;
  orders(&a).await;
  exec(&e, "ALTER TABLE orders ADD COLUMN sneaky TEXT").await;

  let err = a.history().verify("orders").await.unwrap_err();
  assert!(matches!(err, CoreError::InconsistentState { .. }), "{err}");
}
