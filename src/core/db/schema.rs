/// Schema Introspection Module
///
/// Lists tables, columns and indexes of the live database. Table names are
/// passed to the `pragma_*` table-valued functions as bound parameters, so
/// introspection never splices a caller-supplied name into SQL text.

use crate::core::Result;
use rusqlite::{Connection, Row};

/// Represents a database column with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type (e.g., "INTEGER", "TEXT", "DATE"); empty when undeclared
    pub type_name: String,
    /// Whether the column is declared NOT NULL
    pub notnull: bool,
    /// Whether this column is part of the primary key
    pub pk: bool,
    /// Default value expression (if any)
    pub dflt_value: Option<String>,
}

impl Column {
    /// Creates a Column from a `pragma_table_info` row
    fn from_pragma_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Column {
            name: row.get("name")?,
            type_name: row.get("type")?,
            notnull: row.get("notnull")?,
            pk: row.get::<_, i64>("pk")? > 0,
            dflt_value: row.get("dflt_value")?,
        })
    }
}

/// Represents a database index
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    /// Indexed column names, in index order
    pub columns: Vec<String>,
}

/// User-defined table names in creation order; `sqlite_%` tables are excluded.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY rowid",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Column metadata for `table` in declaration order. Unknown tables yield an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
    let mut stmt = conn.prepare("SELECT * FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], Column::from_pragma_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Indexes defined on `table`, including the implicit ones behind UNIQUE constraints.
pub fn table_indexes(conn: &Connection, table: &str) -> Result<Vec<Index>> {
    let mut stmt = conn.prepare("SELECT name, \"unique\" FROM pragma_index_list(?1) ORDER BY name")?;
    let listed = stmt
        .query_map([table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut info = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let mut indexes = Vec::with_capacity(listed.len());
    for (name, unique) in listed {
        let columns = info
            .query_map([&name], |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        indexes.push(Index {
            name,
            unique,
            columns,
        });
    }
    Ok(indexes)
}
