//! Online backup and restore through SQLite's backup API.

use super::RecordStore;
use crate::core::{Result, VaultError};
use rusqlite::backup::Progress;
use rusqlite::DatabaseName;
use std::path::Path;
use tracing::{info, warn};

impl RecordStore {
    /// Copies the live database into a standalone file at `destination`.
    pub fn backup(&self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        self.conn
            .handle()?
            .backup(DatabaseName::Main, destination, None)
            .map_err(|source| VaultError::Backup {
                path: destination.to_path_buf(),
                source,
            })?;
        info!(destination = %destination.display(), "backup written");
        Ok(())
    }

    /// Replaces the live database with the contents of `source`.
    ///
    /// File databases are closed, overwritten page by page, and reopened.
    /// The connection is reopened whether or not the copy succeeded, so a
    /// failed restore leaves the previous database usable. In-memory
    /// databases are restored into the live handle.
    ///
    /// # Errors
    ///
    /// `VaultError::MissingBackup` if `source` is not a file (the live
    /// connection is left untouched), `VaultError::Restore` if the copy
    /// failed, or `VaultError::Unavailable` if the database could not be
    /// reopened afterwards.
    pub fn restore(&mut self, source: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(VaultError::MissingBackup(source.to_path_buf()));
        }
        let failed = |e: rusqlite::Error| VaultError::Restore {
            path: source.to_path_buf(),
            source: e,
        };

        if self.conn.is_in_memory() {
            self.conn
                .handle_mut()?
                .restore(DatabaseName::Main, source, None::<fn(Progress)>)
                .map_err(failed)?;
            info!(source = %source.display(), "in-memory database restored");
            return Ok(());
        }

        self.conn.close();
        let copied = copy_into(self.conn.location(), source);
        self.conn.reopen();

        if let Err(e) = copied {
            warn!(source = %source.display(), error = %e, "restore copy failed");
            return Err(failed(e));
        }
        if !self.conn.is_available() {
            return Err(VaultError::Unavailable);
        }
        info!(source = %source.display(), "database restored");
        Ok(())
    }
}

/// Overwrites the database file at `live` with the pages of `source`.
fn copy_into(live: &str, source: &Path) -> rusqlite::Result<()> {
    let mut target = rusqlite::Connection::open(live)?;
    target.restore(DatabaseName::Main, source, None::<fn(Progress)>)?;
    target.close().map_err(|(_, e)| e)
}
