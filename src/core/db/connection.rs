/// Connection Management Module
///
/// This module owns the single database handle behind a record store:
/// opening it with the configured pragmas, running statements inside
/// scoped transactions, and releasing it on close or drop.

use crate::config::DatabaseConfig;
use crate::core::db::query::{Fetch, NamedParams, Outcome, QueryExecutor, SqlQuery};
use crate::core::{Result, VaultError};
use rusqlite::Transaction;
use std::time::Duration;
use tracing::{debug, info, warn};

/// State of the underlying SQLite handle
#[derive(Debug)]
enum Handle {
    Open(rusqlite::Connection),
    /// Never opened, failed to open, or closed
    Unavailable,
}

/// Owns exactly one handle to the database at `location`.
///
/// Construction opens the handle immediately. A failed open leaves the
/// connection in the unavailable state instead of returning an error; every
/// later call then fails with [`VaultError::Unavailable`].
#[derive(Debug)]
pub struct Connection {
    location: String,
    config: DatabaseConfig,
    handle: Handle,
}

impl Connection {
    /// Opens `location` with the default pragmas (foreign keys, WAL, normal sync).
    ///
    /// # Arguments
    ///
    /// * `location` - Path to the SQLite database file, or ":memory:" for an in-memory database
    ///
    /// # Examples
    ///
    /// ```
    /// let conn = vaultdb::Connection::open(":memory:");
    /// assert!(conn.is_available());
    /// ```
    pub fn open(location: impl Into<String>) -> Self {
        Self::open_with_config(location, &DatabaseConfig::default())
    }

    /// Opens `location` with the pragmas from `config`.
    pub fn open_with_config(location: impl Into<String>, config: &DatabaseConfig) -> Self {
        let mut conn = Connection {
            location: location.into(),
            config: config.clone(),
            handle: Handle::Unavailable,
        };
        conn.reopen();
        conn
    }

    /// Like [`Connection::open`], but reports why the handle could not be acquired.
    pub fn try_open(location: impl Into<String>, config: &DatabaseConfig) -> Result<Self> {
        let location = location.into();
        let handle = connect(&location, config)?;
        Ok(Connection {
            location,
            config: config.clone(),
            handle: Handle::Open(handle),
        })
    }

    /// Re-acquires the handle for the stored location, closing any open one first.
    pub(crate) fn reopen(&mut self) {
        self.close();
        match connect(&self.location, &self.config) {
            Ok(handle) => {
                info!(location = %self.location, "database opened");
                self.handle = Handle::Open(handle);
            }
            Err(e) => {
                warn!(location = %self.location, error = %e, "database unavailable");
                self.handle = Handle::Unavailable;
            }
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_available(&self) -> bool {
        matches!(self.handle, Handle::Open(_))
    }

    /// True for SQLite's private in-memory database, which cannot be reopened by path.
    pub fn is_in_memory(&self) -> bool {
        self.location == ":memory:" || self.location.is_empty()
    }

    pub(crate) fn handle(&self) -> Result<&rusqlite::Connection> {
        match &self.handle {
            Handle::Open(conn) => Ok(conn),
            Handle::Unavailable => Err(VaultError::Unavailable),
        }
    }

    pub(crate) fn handle_mut(&mut self) -> Result<&mut rusqlite::Connection> {
        match &mut self.handle {
            Handle::Open(conn) => Ok(conn),
            Handle::Unavailable => Err(VaultError::Unavailable),
        }
    }

    /// Runs one statement inside its own transaction.
    ///
    /// The transaction commits when the statement succeeds and rolls back
    /// when it fails. With `Fetch::All` every result row is returned; with
    /// `Fetch::One` the first row, the change count, `Done` or `Empty`.
    ///
    /// # Errors
    ///
    /// `VaultError::Unavailable` when there is no open handle, otherwise
    /// `VaultError::Database` carrying the SQLite failure.
    pub fn execute(&mut self, sql: &str, params: NamedParams, fetch: Fetch) -> Result<Outcome> {
        self.run(&SqlQuery::new(sql).with_params(params), fetch)
    }

    /// [`Connection::execute`] for a prebuilt query.
    pub fn run(&mut self, query: &SqlQuery, fetch: Fetch) -> Result<Outcome> {
        self.with_transaction(|tx| QueryExecutor::new(tx).run(query, fetch))
    }

    /// Runs `f` against one transaction: commit on `Ok`, rollback on `Err`.
    pub fn with_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let conn = self.handle_mut()?;
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "rolling back transaction");
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Releases the handle. Calling close on a closed connection does nothing.
    pub fn close(&mut self) {
        if let Handle::Open(conn) = std::mem::replace(&mut self.handle, Handle::Unavailable) {
            match conn.close() {
                Ok(()) => info!(location = %self.location, "database closed"),
                Err((_, e)) => warn!(location = %self.location, error = %e, "error while closing database"),
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens a raw handle and applies the configured pragmas.
fn connect(location: &str, config: &DatabaseConfig) -> Result<rusqlite::Connection> {
    let wrap = |source: rusqlite::Error| VaultError::Connect {
        location: location.to_string(),
        source,
    };

    let conn = rusqlite::Connection::open(location).map_err(wrap)?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(wrap)?;
    let journal_mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
            row.get(0)
        })
        .map_err(wrap)?;
    conn.pragma_update(None, "synchronous", config.synchronous.as_str())
        .map_err(wrap)?;
    if let Some(ms) = config.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(ms)).map_err(wrap)?;
    }

    debug!(location, journal_mode = %journal_mode, "pragmas applied");
    Ok(conn)
}
