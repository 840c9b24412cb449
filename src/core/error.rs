/// Vault Error Module
///
/// This module defines the error type shared by every layer of vaultdb.
/// Failures are returned as values, never raised: each variant belongs to
/// exactly one [`ErrorCategory`], so callers can tell a dead handle apart
/// from a statement that merely failed.
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`VaultError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The database handle could not be acquired or is no longer open
    Connection,
    /// A statement or a store-level operation failed
    Operation,
}

/// Error type for every vaultdb operation.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Opening the database at `location` failed
    #[error("Connection error: could not open '{location}': {source}")]
    Connect {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The handle was closed or never opened
    #[error("Connection error: database handle is unavailable")]
    Unavailable,

    /// Statement preparation or execution failed inside SQLite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: no such table '{0}'")]
    UnknownTable(String),

    #[error("Schema error: table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    /// A record or criteria map without any columns was supplied where one is required
    #[error("Query error: {0} must name at least one column")]
    EmptyFields(&'static str),

    #[error("Operation error: no records found for deletion")]
    NoRecordsFound,

    #[error("Operation error: multiple records found for deletion ({0} matches)")]
    MultipleRecordsFound(usize),

    /// A bulk batch contained a record whose columns differ from the first record's
    #[error("Bulk insert error: record {index} does not match the columns of the first record")]
    ShapeMismatch { index: usize },

    #[error("CSV error: header {found:?} does not match table columns {expected:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Export error: table '{0}' has no rows to export")]
    EmptyTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup error: could not copy database to '{}': {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Restore error: could not copy '{}' into the live database: {source}", .path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Restore source file does not exist
    #[error("Restore error: backup file '{}' not found", .0.display())]
    MissingBackup(PathBuf),

    /// An index named after `table`/`column` exists but does not index that column as asked
    #[error("Index error: '{name}' already exists and does not cover {table}({column}) as requested")]
    IndexConflict {
        name: String,
        table: String,
        column: String,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Returns the category this error is reported under.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VaultError::Connect { .. } | VaultError::Unavailable => ErrorCategory::Connection,
            _ => ErrorCategory::Operation,
        }
    }

    /// Shorthand for `category() == ErrorCategory::Connection`.
    pub fn is_connection_error(&self) -> bool {
        self.category() == ErrorCategory::Connection
    }
}

/// Type alias for Result to use VaultError as the error type.
pub type Result<T> = std::result::Result<T, VaultError>;
