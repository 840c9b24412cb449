//! Multi-record loading: a forgiving per-record loop and an all-or-nothing batch.

use super::RecordStore;
use crate::core::db::query::{self, Outcome};
use crate::core::{Record, Result, VaultError};
use rusqlite::params_from_iter;
use tracing::{debug, info};

/// Per-record results of [`RecordStore::insert_individually`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl RecordStore {
    /// Inserts each record on its own. A failed record does not undo the
    /// ones before it; an insert that errors or changes nothing counts as failed.
    pub fn insert_individually(&mut self, table: &str, records: &[Record]) -> InsertTally {
        let mut tally = InsertTally::default();
        for (index, record) in records.iter().enumerate() {
            match self.insert(table, record) {
                Ok(outcome) if !outcome.is_empty() => tally.succeeded += 1,
                Ok(_) => tally.failed += 1,
                Err(e) => {
                    debug!(table, index, error = %e, "record insert failed");
                    tally.failed += 1;
                }
            }
        }
        info!(table, succeeded = tally.succeeded, failed = tally.failed, "individual inserts finished");
        tally
    }

    /// Inserts every record through one prepared statement inside one transaction.
    ///
    /// The column list comes from the first record. Any failure, including a
    /// record with a different column set, rolls back the whole batch.
    /// An empty slice returns `Outcome::Empty`.
    pub fn bulk_insert(&mut self, table: &str, records: &[Record]) -> Result<Outcome> {
        let Some(first) = records.first() else {
            return Ok(Outcome::Empty);
        };
        if first.is_empty() {
            return Err(VaultError::EmptyFields("record"));
        }
        self.require_columns(table, first.columns())?;

        let columns: Vec<String> = first.columns().map(String::from).collect();
        let template = query::insert_template(table, &columns);

        let inserted = self.conn.with_transaction(|tx| {
            let mut stmt = tx.prepare(&template)?;
            let mut inserted = 0;
            for (index, record) in records.iter().enumerate() {
                if !record.same_columns(first) {
                    return Err(VaultError::ShapeMismatch { index });
                }
                let values = columns.iter().filter_map(|column| record.get(column));
                inserted += stmt.execute(params_from_iter(values))?;
            }
            Ok(inserted)
        })?;

        info!(table, rows = inserted, "bulk insert committed");
        Ok(if inserted > 0 {
            Outcome::Changed(inserted)
        } else {
            Outcome::Empty
        })
    }
}
