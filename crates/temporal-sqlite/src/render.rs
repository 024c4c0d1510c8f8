//! Renders capture triggers as SQLite `CREATE TRIGGER` statements.
//!
//! SQLite evaluates `'now'` once per statement step, so every step of a
//! trigger (and every row it fires for within one statement) sees the same
//! time. The time is per statement, not per transaction: two statements in
//! one transaction stamp their versions with their own, increasing times.
//! Timestamps are UTC text with millisecond precision, which orders
//! correctly as plain strings.

use temporal_core::{
  capture::{CaptureEvent, CaptureStep, CaptureTrigger, RowImage},
  mirror::{EFF_FROM, EFF_TO, EFF_TO_SENTINEL, ROW_ID},
};

use crate::encode::{quote_ident, quote_list};

const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn image(img: RowImage) -> &'static str {
  match img {
    RowImage::Old => "OLD",
    RowImage::New => "NEW",
  }
}

fn event(event: CaptureEvent) -> &'static str {
  match event {
    CaptureEvent::Insert => "AFTER INSERT",
    CaptureEvent::Update => "AFTER UPDATE",
    CaptureEvent::Delete => "AFTER DELETE",
  }
}

fn step(trigger: &CaptureTrigger, step: CaptureStep) -> String {
  let history = quote_ident(&trigger.history_table);
  let id = quote_ident(ROW_ID);
  let eff_to = quote_ident(EFF_TO);

  match step {
    CaptureStep::CloseOpenVersion(img) => format!(
      "  UPDATE {history} SET {eff_to} = {NOW}\n    WHERE {id} = {}.{id} AND {eff_to} = '{EFF_TO_SENTINEL}';",
      image(img),
    ),
    CaptureStep::OpenVersion(img) => {
      let img = image(img);
      let targets = quote_list(
        [ROW_ID, EFF_FROM, EFF_TO]
          .into_iter()
          .chain(trigger.columns.iter().map(String::as_str)),
      );
      let values = std::iter::once(format!("{img}.{id}"))
        .chain([NOW.to_owned(), format!("'{EFF_TO_SENTINEL}'")])
        .chain(
          trigger
            .columns
            .iter()
            .map(|c| format!("{img}.{}", quote_ident(c))),
        )
        .collect::<Vec<_>>()
        .join(", ");
      format!("  INSERT INTO {history} ({targets})\n    VALUES ({values});")
    }
  }
}

pub fn create_trigger_sql(trigger: &CaptureTrigger) -> String {
  let body = trigger
    .steps
    .iter()
    .map(|s| step(trigger, *s))
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    "CREATE TRIGGER {} {} ON {} FOR EACH ROW BEGIN\n{body}\nEND;",
    quote_ident(&trigger.name),
    event(trigger.event),
    quote_ident(&trigger.table),
  )
}

pub fn drop_trigger_sql(name: &str) -> String {
  format!("DROP TRIGGER IF EXISTS {}", quote_ident(name))
}
