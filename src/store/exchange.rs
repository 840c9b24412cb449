//! CSV export and import.
//!
//! Files are UTF-8, comma-delimited, with a header row equal to the table's
//! ordered column list. Nulls and empty text are both written as empty
//! fields. On import an empty field becomes empty text in a `NOT NULL`
//! column and null everywhere else, so `""` in a nullable column comes back
//! as null.
//!
//! Every other field is read as text and left to SQLite's column affinity:
//! numeric text turns into numbers in `INTEGER`, `REAL` and `NUMERIC`
//! columns, but a column declared without a type has no affinity and keeps
//! the text. Blobs are exported as hex and come back as text.

use super::RecordStore;
use crate::core::db::query::Outcome;
use crate::core::{Record, Result, Value, VaultError};
use std::path::Path;
use tracing::info;

impl RecordStore {
    /// Writes the header and every row of `table` to `path`, returning the row count.
    ///
    /// # Errors
    ///
    /// `VaultError::EmptyTable` when there is nothing to export, or the
    /// underlying CSV/I/O error.
    pub fn export_to_csv(&mut self, table: &str, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let columns = self.list_columns(table)?;
        let rows = self.fetch_all(table)?;
        if rows.is_empty() {
            return Err(VaultError::EmptyTable(table.to_string()));
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&columns)?;
        for row in &rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| row.get(column).map(Value::to_string).unwrap_or_default()),
            )?;
        }
        writer.flush()?;

        info!(table, rows = rows.len(), path = %path.display(), "table exported");
        Ok(rows.len())
    }

    /// Bulk-inserts the rows of a CSV file whose header exactly matches the
    /// columns of `table`, in order. All rows land or none do.
    pub fn import_from_csv(&mut self, table: &str, path: impl AsRef<Path>) -> Result<Outcome> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        let columns = self.describe_table(table)?;
        let expected: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        if header != expected {
            return Err(VaultError::HeaderMismatch {
                expected,
                found: header,
            });
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record: Record = columns
                .iter()
                .zip(row.iter())
                .map(|(column, field)| (column.name.as_str(), field_value(field, column.notnull)))
                .collect();
            records.push(record);
        }

        let outcome = self.bulk_insert(table, &records)?;
        info!(table, rows = records.len(), path = %path.display(), "table imported");
        Ok(outcome)
    }
}

/// A `NOT NULL` column never exported a null, so its empty fields are empty text.
fn field_value(field: &str, notnull: bool) -> Value {
    if field.is_empty() && !notnull {
        Value::Null
    } else {
        Value::Text(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::query::Fetch;
    use tempfile::tempdir;

    const CREDENTIALS: &str = "(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        id_type TEXT NOT NULL,
        id_number TEXT NOT NULL UNIQUE,
        issued_date DATE NOT NULL,
        expiry_date DATE
    )";

    fn store_with(tables: &[&str]) -> RecordStore {
        let mut store = RecordStore::open(":memory:");
        for table in tables {
            store
                .connection_mut()
                .execute(&format!("CREATE TABLE {} {}", table, CREDENTIALS), Vec::new(), Fetch::One)
                .unwrap();
        }
        store
    }

    fn credential(kind: &str, number: &str, expiry: Option<&str>) -> Record {
        Record::new()
            .with("id_type", kind)
            .with("id_number", number)
            .with("issued_date", "2020-06-01")
            .with("expiry_date", expiry)
    }

    #[test]
    fn test_export_import_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.csv");
        let mut store = store_with(&["credentials", "credentials_copy"]);
        store
            .bulk_insert(
                "credentials",
                &[
                    credential("passport", "P-001", Some("2030-06-01")),
                    credential("license", "L, \"quoted\"", None),
                ],
            )
            .unwrap();

        assert_eq!(store.export_to_csv("credentials", &path).unwrap(), 2);
        store.import_from_csv("credentials_copy", &path).unwrap();

        assert_eq!(
            store.fetch_all("credentials_copy").unwrap(),
            store.fetch_all("credentials").unwrap()
        );
    }

    #[test]
    fn test_empty_text_survives_not_null_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        let mut store = RecordStore::open(":memory:");
        for table in ["notes", "notes_copy"] {
            store
                .connection_mut()
                .execute(
                    &format!("CREATE TABLE {} (note TEXT NOT NULL)", table),
                    Vec::new(),
                    Fetch::One,
                )
                .unwrap();
        }
        store
            .bulk_insert(
                "notes",
                &[Record::new().with("note", ""), Record::new().with("note", "x")],
            )
            .unwrap();

        store.export_to_csv("notes", &path).unwrap();
        assert_eq!(store.import_from_csv("notes_copy", &path).unwrap().changed(), 2);

        let copied = store.fetch_all("notes_copy").unwrap();
        assert_eq!(copied, store.fetch_all("notes").unwrap());
        assert_eq!(copied[0].get("note"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_empty_text_in_nullable_column_reads_back_as_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        let mut store = RecordStore::open(":memory:");
        for table in ["notes", "notes_copy"] {
            store
                .connection_mut()
                .execute(&format!("CREATE TABLE {} (note TEXT)", table), Vec::new(), Fetch::One)
                .unwrap();
        }
        store
            .bulk_insert(
                "notes",
                &[
                    Record::new().with("note", ""),
                    Record::new().with("note", None::<&str>),
                ],
            )
            .unwrap();

        store.export_to_csv("notes", &path).unwrap();
        store.import_from_csv("notes_copy", &path).unwrap();

        let notes: Vec<Option<Value>> = store
            .fetch_all("notes_copy")
            .unwrap()
            .into_iter()
            .map(|r| r.get("note").cloned())
            .collect();
        assert_eq!(notes, vec![Some(Value::Null), Some(Value::Null)]);
    }

    #[test]
    fn test_untyped_column_keeps_numbers_as_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loose.csv");
        let mut store = RecordStore::open(":memory:");
        for table in ["loose", "loose_copy"] {
            store
                .connection_mut()
                .execute(&format!("CREATE TABLE {} (n INTEGER, raw)", table), Vec::new(), Fetch::One)
                .unwrap();
        }
        store
            .insert("loose", &Record::new().with("n", 7).with("raw", 7))
            .unwrap();

        store.export_to_csv("loose", &path).unwrap();
        store.import_from_csv("loose_copy", &path).unwrap();

        let row = &store.fetch_all("loose_copy").unwrap()[0];
        assert_eq!(row.get("n"), Some(&Value::Integer(7)));
        assert_eq!(row.get("raw"), Some(&Value::Text("7".to_string())));
    }

    #[test]
    fn test_export_writes_header_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut store = store_with(&["credentials"]);
        store
            .insert("credentials", &credential("passport", "P-9", None))
            .unwrap();
        store.export_to_csv("credentials", &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,id_type,id_number,issued_date,expiry_date")
        );
        assert_eq!(lines.next(), Some("1,passport,P-9,2020-06-01,"));
    }

    #[test]
    fn test_export_empty_table_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let mut store = store_with(&["credentials"]);
        match store.export_to_csv("credentials", &path) {
            Err(VaultError::EmptyTable(t)) => assert_eq!(t, "credentials"),
            other => panic!("Expected EmptyTable, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_import_rejects_reordered_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reordered.csv");
        std::fs::write(
            &path,
            "id_type,id,id_number,issued_date,expiry_date\npassport,1,P-1,2020-01-01,\n",
        )
        .unwrap();

        let mut store = store_with(&["credentials"]);
        match store.import_from_csv("credentials", &path) {
            Err(VaultError::HeaderMismatch { expected, found }) => {
                assert_eq!(expected[0], "id");
                assert_eq!(found[0], "id_type");
            }
            other => panic!("Expected HeaderMismatch, got {:?}", other),
        }
        assert_eq!(store.count("credentials", None).unwrap(), 0);
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dupes.csv");
        std::fs::write(
            &path,
            "id,id_type,id_number,issued_date,expiry_date\n\
             1,passport,P-1,2020-01-01,\n\
             2,license,P-1,2021-01-01,2031-01-01\n",
        )
        .unwrap();

        let mut store = store_with(&["credentials"]);
        assert!(store.import_from_csv("credentials", &path).is_err());
        assert_eq!(store.count("credentials", None).unwrap(), 0);
    }

    #[test]
    fn test_import_unknown_table_or_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("any.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let mut store = store_with(&["credentials"]);
        assert!(matches!(
            store.import_from_csv("ghosts", &path),
            Err(VaultError::UnknownTable(_))
        ));
        assert!(matches!(
            store.import_from_csv("credentials", dir.path().join("missing.csv")),
            Err(VaultError::Csv(_))
        ));
    }
}
