/// # Test Utilities Module
///
/// Fixtures shared by the in-crate test modules: stores backed by a
/// temporary directory, a sample vault schema with realistic rows, and
/// assertion helpers for error categories.

use crate::core::db::query::Fetch;
use crate::core::{Record, Result};
use crate::store::RecordStore;
use std::path::PathBuf;
use tempfile::TempDir;

const VAULT_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS debit_cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_number TEXT NOT NULL UNIQUE,
        cardholder_name TEXT NOT NULL,
        expiry_date DATE NOT NULL,
        cvv TEXT NOT NULL,
        bank_name TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS online_accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        platform TEXT NOT NULL,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS identification_credentials (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        id_type TEXT NOT NULL,
        id_number TEXT NOT NULL UNIQUE,
        issued_by TEXT NOT NULL,
        issued_date DATE NOT NULL,
        expiry_date DATE
    )",
];

/// File-backed store living in its own temporary directory
pub struct StoreFixture {
    pub dir: TempDir,
    pub store: RecordStore,
}

impl StoreFixture {
    /// Create an empty file-backed store
    pub fn new(name: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(format!("{}.db", name));
        let store = RecordStore::open(path.to_string_lossy());
        Ok(StoreFixture { dir, store })
    }

    /// Create fixture with the vault schema and sample rows
    pub fn with_sample_data(name: &str) -> Result<Self> {
        let mut fixture = Self::new(name)?;
        fixture.setup_vault_schema()?;
        fixture.populate_sample_data()?;
        Ok(fixture)
    }

    /// Path inside the fixture's directory, for backups and CSV files
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    pub fn setup_vault_schema(&mut self) -> Result<()> {
        let conn = self.store.connection_mut();
        for ddl in VAULT_SCHEMA {
            conn.execute(ddl, Vec::new(), Fetch::One)?;
        }
        Ok(())
    }

    pub fn populate_sample_data(&mut self) -> Result<()> {
        let cards = vec![
            ("4000123412341234", "Ana Ruiz", "2027-04-30", "123", "North Bank"),
            ("5100987698769876", "Ben Okafor", "2026-11-30", "456", "River Credit"),
        ];
        for (number, holder, expiry, cvv, bank) in cards {
            self.store.insert(
                "debit_cards",
                &Record::new()
                    .with("card_number", number)
                    .with("cardholder_name", holder)
                    .with("expiry_date", expiry)
                    .with("cvv", cvv)
                    .with("bank_name", bank),
            )?;
        }

        let accounts: Vec<Record> = [
            ("forge", "ana", "ana@example.com"),
            ("mail", "ana.r", "ana@example.com"),
            ("chat", "benny", "ben@example.com"),
        ]
        .into_iter()
        .map(|(platform, username, email)| {
            Record::new()
                .with("platform", platform)
                .with("username", username)
                .with("email", email)
                .with("password", "hunter2")
        })
        .collect();
        self.store.bulk_insert("online_accounts", &accounts)?;

        self.store.insert(
            "identification_credentials",
            &Record::new()
                .with("id_type", "passport")
                .with("id_number", "X1234567")
                .with("issued_by", "Passport Office")
                .with("issued_date", "2019-08-01")
                .with("expiry_date", "2029-08-01"),
        )?;

        Ok(())
    }
}

/// Error testing utilities
pub mod error_testing {
    use crate::core::{ErrorCategory, VaultError};

    /// Assert that `result` failed with an error of `category`
    pub fn assert_category<T: std::fmt::Debug>(
        result: &std::result::Result<T, VaultError>,
        category: ErrorCategory,
        context: &str,
    ) {
        match result {
            Ok(value) => panic!("Expected {:?} error but got Ok({:?}) in {}", category, value, context),
            Err(e) => assert_eq!(
                e.category(),
                category,
                "Wrong category for '{}' in {}",
                e,
                context
            ),
        }
    }

    /// Verify error message quality (non-empty and names what went wrong)
    pub fn verify_error_message_quality<T, E>(result: &std::result::Result<T, E>, context: &str)
    where
        E: std::fmt::Display,
    {
        if let Err(ref error) = result {
            let error_str = error.to_string();
            assert!(error_str.len() > 10, "Error message should be descriptive in {}", context);
            assert!(
                error_str.contains("error"),
                "Error should indicate what kind of operation failed: '{}' in {}",
                error_str,
                context
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_fixture() {
        let mut fixture = StoreFixture::with_sample_data("fixture").unwrap();
        assert_eq!(
            fixture.store.list_tables().unwrap(),
            vec!["debit_cards", "online_accounts", "identification_credentials"]
        );
        assert_eq!(fixture.store.count("debit_cards", None).unwrap(), 2);
        assert_eq!(fixture.store.count("online_accounts", None).unwrap(), 3);
        assert_eq!(fixture.store.count("identification_credentials", None).unwrap(), 1);
    }
}
