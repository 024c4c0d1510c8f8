//! Shadow history tables for live tables that opt into temporal tracking.
//!
//! [`TemporalAdapter`] wraps any [`SchemaExecutor`] and, after each
//! structural change to a live table succeeds, applies the matching change
//! to the table's history table and regenerates its capture triggers. The
//! crate holds no database code; backends implement [`SchemaExecutor`] and
//! [`TriggerInstaller`].

// Collaborator traits return `impl Future + Send` and are implemented with
// native `async fn`.
#![allow(async_fn_in_trait)]

pub mod adapter;
pub mod capture;
pub mod column;
pub mod error;
pub mod executor;
pub mod history;
pub mod mirror;
pub mod policy;

pub use adapter::TemporalAdapter;
pub use column::{Column, ColumnType, DropOptions, TableBuilder, TableDefinition, TableOptions};
pub use error::{Error, Result};
pub use executor::{NoCaptureTriggers, SchemaExecutor, TriggerInstaller};
pub use policy::TemporalPolicy;
