//! Trigger Generator: the capture protocol bound to a tracked live table.
//!
//! Each live table gets three triggers. Their bodies are rendered by the
//! engine, but the steps they take are fixed here:
//!
//! | event  | steps                                              |
//! |--------|----------------------------------------------------|
//! | insert | open a version from `NEW`                          |
//! | update | close the open version of `OLD.id`, then open from `NEW` |
//! | delete | close the open version of `OLD.id`                 |
//!
//! "Close" sets `eff_to` to the transaction time on the row matching the id
//! whose `eff_to` is the sentinel. "Open" inserts a row with
//! `eff_from` = transaction time and `eff_to` = sentinel. Both steps of an
//! update run inside the triggering statement, so the engine's write locking
//! serialises concurrent updates to the same id and at most one version is
//! ever open.

use tracing::debug;

use crate::{
  Error, Result,
  executor::{SchemaExecutor, TriggerInstaller},
  mirror::{history_name, mirrored_part},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
  Insert,
  Update,
  Delete,
}

impl CaptureEvent {
  pub const ALL: [CaptureEvent; 3] = [Self::Insert, Self::Update, Self::Delete];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Insert => "insert",
      Self::Update => "update",
      Self::Delete => "delete",
    }
  }
}

/// Which row image a step reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowImage {
  Old,
  New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
  /// Set `eff_to` = now on the open version whose `id` is the image's id.
  CloseOpenVersion(RowImage),
  /// Insert a new open version copying the image's id and mirrored columns.
  OpenVersion(RowImage),
}

/// One engine-independent capture trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTrigger {
  pub name:          String,
  pub table:         String,
  pub history_table: String,
  pub event:         CaptureEvent,
  pub steps:         Vec<CaptureStep>,
  /// Mirrored column names copied by [`CaptureStep::OpenVersion`].
  pub columns:       Vec<String>,
}

/// Trigger name for `event` on `table`.
pub fn trigger_name(table: &str, event: CaptureEvent) -> String {
  format!("{table}_temporal_{}", event.as_str())
}

/// The full trigger set for `table`, copying `columns` into history.
pub fn capture_plan(table: &str, columns: &[String]) -> Vec<CaptureTrigger> {
  CaptureEvent::ALL
    .into_iter()
    .map(|event| {
      let steps = match event {
        CaptureEvent::Insert => vec![CaptureStep::OpenVersion(RowImage::New)],
        CaptureEvent::Update => vec![
          CaptureStep::CloseOpenVersion(RowImage::Old),
          CaptureStep::OpenVersion(RowImage::New),
        ],
        CaptureEvent::Delete => vec![CaptureStep::CloseOpenVersion(RowImage::Old)],
      };
      CaptureTrigger {
        name: trigger_name(table, event),
        table: table.to_owned(),
        history_table: history_name(table),
        event,
        steps,
        columns: columns.to_vec(),
      }
    })
    .collect()
}

// ─── Install / remove ────────────────────────────────────────────────────────

/// Installs and removes the capture triggers of a table.
///
/// The column list is read from both tables at call time, so the generated
/// triggers never copy a column history cannot hold.
pub struct TriggerGenerator<'a, E, T> {
  executor:  &'a E,
  installer: &'a T,
}

impl<'a, E, T> TriggerGenerator<'a, E, T>
where
  E: SchemaExecutor,
  T: TriggerInstaller,
{
  pub fn new(executor: &'a E, installer: &'a T) -> Self { Self { executor, installer } }

  /// Replace the trigger set of `table`. Safe to call repeatedly.
  ///
  /// Only columns present on both tables are copied, so triggers stay valid
  /// while a column change has reached one table but not the other.
  pub async fn create_triggers(&self, table: &str) -> Result<()> {
    let live: Vec<String> = self
      .executor
      .columns_of(table)
      .await
      .map_err(Error::executor)?
      .into_iter()
      .map(|c| c.name)
      .collect();
    let columns: Vec<String> = mirrored_part(
      &self
        .executor
        .columns_of(&history_name(table))
        .await
        .map_err(Error::executor)?,
    )
    .into_iter()
    .map(|c| c.name)
    .filter(|name| live.contains(name))
    .collect();

    for trigger in capture_plan(table, &columns) {
      self
        .installer
        .uninstall(&trigger.name)
        .await
        .map_err(Error::trigger)?;
      self
        .installer
        .install(&trigger)
        .await
        .map_err(Error::trigger)?;
    }
    debug!(table, columns = columns.len(), "capture triggers installed");
    Ok(())
  }

  /// Remove every capture trigger of `table`. No-op for absent triggers.
  pub async fn drop_triggers(&self, table: &str) -> Result<()> {
    for event in CaptureEvent::ALL {
      self
        .installer
        .uninstall(&trigger_name(table, event))
        .await
        .map_err(Error::trigger)?;
    }
    debug!(table, "capture triggers removed");
    Ok(())
  }
}
