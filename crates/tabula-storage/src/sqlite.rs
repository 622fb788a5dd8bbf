//! Durable [`Storage`] backed by the `kv_store` table.

use std::path::Path;
use std::sync::Arc;

use rusqlite::OptionalExtension;

use tabula_core::error::{Result, TabulaError};

use crate::db::Database;
use crate::storage::Storage;

/// SQLite-backed key/value store; survives restarts.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db: Arc<Database>,
}

impl SqliteStorage {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(Database::new(path)?)))
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TabulaError::Storage(format!("Failed to read '{}': {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                rusqlite::params![key, value],
            )
            .map_err(|e| TabulaError::Storage(format!("Failed to write '{}': {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| TabulaError::Storage(format!("Failed to delete '{}': {}", key, e)))?;
            Ok(())
        })
    }
}
