//! Generic record store over an arbitrary SQLite schema.
//!
//! [`RecordStore`] wraps a [`Connection`] and exposes table-agnostic CRUD,
//! bulk loading, backup/restore and CSV exchange. Table and column names are
//! treated as trusted identifiers: they are checked against the live schema
//! (unless disabled in [`StoreConfig`]) and quoted, while every value is
//! bound as a parameter.

mod archive;
mod bulk;
mod exchange;

pub use bulk::InsertTally;

use crate::config::{Config, StoreConfig};
use crate::core::db::query::{self, Fetch, Outcome, QueryExecutor};
use crate::core::db::{schema, Column, Connection, Index};
use crate::core::{Record, Result, Value, VaultError};
use tracing::{debug, warn};

pub struct RecordStore {
    conn: Connection,
    config: StoreConfig,
}

impl RecordStore {
    pub fn new(conn: Connection) -> Self {
        Self::with_config(conn, StoreConfig::default())
    }

    pub fn with_config(conn: Connection, config: StoreConfig) -> Self {
        RecordStore { conn, config }
    }

    /// Opens `location` with default settings and wraps it.
    pub fn open(location: impl Into<String>) -> Self {
        Self::new(Connection::open(location))
    }

    /// Opens `location` using both the database and store sections of `config`.
    pub fn open_with_config(location: impl Into<String>, config: &Config) -> Self {
        Self::with_config(
            Connection::open_with_config(location, &config.database),
            config.store.clone(),
        )
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    /// Names of all user-defined tables, in creation order.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        schema::table_names(self.conn.handle()?)
    }

    /// Column names of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// `VaultError::UnknownTable` if the table does not exist.
    pub fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .describe_table(table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Full column metadata of `table`.
    pub fn describe_table(&self, table: &str) -> Result<Vec<Column>> {
        let columns = schema::table_columns(self.conn.handle()?, table)?;
        if columns.is_empty() {
            return Err(VaultError::UnknownTable(table.to_string()));
        }
        Ok(columns)
    }

    pub fn list_indexes(&self, table: &str) -> Result<Vec<Index>> {
        self.require_table(table)?;
        schema::table_indexes(self.conn.handle()?, table)
    }

    fn require_table(&self, table: &str) -> Result<()> {
        if !self.config.validate_identifiers {
            return Ok(());
        }
        if self.list_tables()?.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(VaultError::UnknownTable(table.to_string()))
        }
    }

    fn require_columns<'c>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = &'c str>,
    ) -> Result<()> {
        if !self.config.validate_identifiers {
            return Ok(());
        }
        self.require_table(table)?;
        let known = self.list_columns(table)?;
        for column in columns {
            if !known.iter().any(|k| k == column) {
                return Err(VaultError::UnknownColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Every row of `table`.
    pub fn fetch_all(&mut self, table: &str) -> Result<Vec<Record>> {
        self.require_table(table)?;
        Ok(self.conn.run(&query::select_all(table), Fetch::All)?.into_rows())
    }

    /// Inserts one record; its keys become the column list.
    ///
    /// Returns `Outcome::Changed(1)` on success.
    pub fn insert(&mut self, table: &str, record: &Record) -> Result<Outcome> {
        let statement = query::insert(table, record)?;
        self.require_columns(table, record.columns())?;
        self.conn.run(&statement, Fetch::One)
    }

    /// All rows whose columns equal every value in `criteria`.
    pub fn search(&mut self, table: &str, criteria: &Record) -> Result<Vec<Record>> {
        self.require_columns(table, criteria.columns())?;
        Ok(self
            .conn
            .run(&query::select(table, criteria), Fetch::All)?
            .into_rows())
    }

    /// Sets `new` on every row matching `old`; `Outcome::Empty` when nothing matched.
    pub fn update(&mut self, table: &str, old: &Record, new: &Record) -> Result<Outcome> {
        let statement = query::update(table, old, new)?;
        self.require_columns(table, old.columns().chain(new.columns()))?;
        self.conn.run(&statement, Fetch::One)
    }

    /// Deletes the single row matching `criteria`.
    ///
    /// The lookup and the delete share one transaction. Nothing is deleted
    /// unless exactly one row matches.
    ///
    /// # Errors
    ///
    /// `VaultError::NoRecordsFound` for zero matches and
    /// `VaultError::MultipleRecordsFound` for more than one.
    pub fn delete(&mut self, table: &str, criteria: &Record) -> Result<Outcome> {
        let removal = query::delete(table, criteria)?;
        self.require_columns(table, criteria.columns())?;
        let lookup = query::select(table, criteria);

        self.conn.with_transaction(|tx| {
            let executor = QueryExecutor::new(tx);
            match executor.run(&lookup, Fetch::All)?.into_rows().len() {
                0 => Err(VaultError::NoRecordsFound),
                1 => executor.run(&removal, Fetch::One),
                n => Err(VaultError::MultipleRecordsFound(n)),
            }
        })
    }

    /// Number of rows in `table`, optionally restricted to those matching `criteria`.
    pub fn count(&mut self, table: &str, criteria: Option<&Record>) -> Result<i64> {
        match criteria {
            Some(c) => self.require_columns(table, c.columns())?,
            None => self.require_table(table)?,
        }
        let row = self.conn.run(&query::count(table, criteria), Fetch::One)?;
        Ok(row
            .into_row()
            .and_then(|r| r.get("count").and_then(Value::as_i64))
            .unwrap_or(0))
    }

    /// Creates `idx_<table>_<column>` if it does not exist yet.
    ///
    /// The name is not unique across tables (`a`.`b_c` and `a_b`.`c` share
    /// it), so the index found under that name afterwards must be on `table`,
    /// cover exactly `column` and have the requested uniqueness, otherwise
    /// `VaultError::IndexConflict` is returned.
    pub fn create_index(&mut self, table: &str, column: &str, unique: bool) -> Result<Outcome> {
        self.require_columns(table, [column])?;
        debug!(table, column, unique, "creating index");
        let outcome = self
            .conn
            .run(&query::create_index(table, column, unique), Fetch::One)?;

        let name = query::index_name(table, column);
        let indexes = schema::table_indexes(self.conn.handle()?, table)?;
        let matches = indexes
            .iter()
            .any(|i| i.name == name && i.unique == unique && i.columns == [column]);
        if !matches {
            warn!(table, column, index = %name, "index name taken by a different index");
            return Err(VaultError::IndexConflict {
                name,
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        Ok(outcome)
    }
}
