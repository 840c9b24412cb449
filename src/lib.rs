//! Table-agnostic record store over SQLite.
//!
//! A [`Connection`] owns one database handle; a [`RecordStore`] wraps it and
//! offers CRUD, bulk loading, backup/restore and CSV exchange for any table,
//! driven by runtime table names and [`Record`]s.

// Core infrastructure modules
pub mod config;
pub mod core;

// Feature-specific modules
pub mod store;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{Connection, Fetch, Outcome};
pub use crate::core::{ErrorCategory, Record, Result, Value, VaultError};
pub use crate::store::{InsertTally, RecordStore};
