//! Process-wide temporal policy.
//!
//! Read once at startup (see the `temporal` binary) and handed to the
//! interceptor by value. The core never mutates it.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::column::ColumnType;

/// Policy consulted by [`TemporalAdapter`](crate::TemporalAdapter) when a live
/// table is created.
///
/// History tracking and the attribution column are configured independently:
/// `skip` only suppresses automatic history creation and `attribution_skip`
/// only suppresses the attribution column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemporalPolicy {
  pub create_by_default:       bool,
  pub skip:                    BTreeSet<String>,
  pub add_attribution_column:  bool,
  pub attribution_column:      String,
  pub attribution_column_type: ColumnType,
  pub attribution_skip:        BTreeSet<String>,
}

impl Default for TemporalPolicy {
  fn default() -> Self {
    Self {
      create_by_default:       false,
      skip:                    BTreeSet::new(),
      add_attribution_column:  false,
      attribution_column:      "updated_by".to_owned(),
      attribution_column_type: ColumnType::String,
      attribution_skip:        BTreeSet::new(),
    }
  }
}

impl TemporalPolicy {
  /// Whether a newly created table gets a history table without being asked.
  pub fn tracks_by_default(&self, table: &str) -> bool {
    self.create_by_default && !self.skip.contains(table)
  }

  /// Whether a newly created table gets the attribution column.
  pub fn wants_attribution(&self, table: &str) -> bool {
    self.add_attribution_column && !self.attribution_skip.contains(table)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn skip_set_only_affects_history_creation() {
    let policy = TemporalPolicy {
      create_by_default: true,
      skip: ["sessions".to_owned()].into(),
      add_attribution_column: true,
      ..Default::default()
    };

    assert!(policy.tracks_by_default("orders"));
    assert!(!policy.tracks_by_default("sessions"));
    assert!(policy.wants_attribution("sessions"));
  }

  #[test]
  fn defaults_are_off() {
    let policy = TemporalPolicy::default();
    assert!(!policy.tracks_by_default("orders"));
    assert!(!policy.wants_attribution("orders"));
    assert_eq!(policy.attribution_column, "updated_by");
  }
}
