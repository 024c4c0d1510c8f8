//! SQLite backend for temporal history tables.
//!
//! [`SqliteEngine`] implements both collaborator contracts of
//! `temporal-core`: it executes schema changes and installs capture triggers
//! rendered as SQLite `CREATE TRIGGER` statements. All database access runs
//! on the [`tokio_rusqlite`] connection thread.

mod encode;
mod engine;
mod render;

pub mod error;

pub use engine::SqliteEngine;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
