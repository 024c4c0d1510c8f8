//! Error types for `temporal-core`.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
  /// The schema executor rejected a structural change or an introspection
  /// query. Nothing on the history side has been touched when this surfaces
  /// from a live-table step.
  #[error("schema executor failed: {0}")]
  Executor(#[source] BoxError),

  #[error("trigger installer failed: {0}")]
  Trigger(#[source] BoxError),

  /// A history table was expected but missing, or its columns no longer
  /// mirror the live table. Never repaired automatically.
  #[error("inconsistent temporal state for {table:?}: {reason}")]
  InconsistentState { table: String, reason: String },

  #[error("{0} is not implemented for this engine")]
  Unimplemented(&'static str),
}

impl Error {
  pub fn executor<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    unwrap_or(Box::new(err), Self::Executor)
  }

  pub fn trigger<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    unwrap_or(Box::new(err), Self::Trigger)
  }

  pub(crate) fn inconsistent(table: &str, reason: impl Into<String>) -> Self {
    Self::InconsistentState {
      table:  table.to_owned(),
      reason: reason.into(),
    }
  }
}

/// Collaborators may report core errors directly (e.g. [`Unimplemented`]);
/// pass those through instead of nesting them.
///
/// [`Unimplemented`]: Error::Unimplemented
fn unwrap_or(err: BoxError, wrap: fn(BoxError) -> Error) -> Error {
  match err.downcast::<Error>() {
    Ok(inner) => *inner,
    Err(other) => wrap(other),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
