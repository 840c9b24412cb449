/// Core Module for vaultdb
///
/// This module contains the fundamental components shared by the record
/// store: the database layer (connection, query building, schema
/// introspection), the dynamic record representation, and error handling.

pub mod db;
pub mod error;
pub mod record;

// Re-export commonly used types for convenience
pub use error::{ErrorCategory, Result, VaultError};
pub use record::{Record, Value};
