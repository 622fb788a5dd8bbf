//! SQLite file behind durable storage.
//!
//! Tabula keeps one table, `kv_store`, and in practice one row in it: the
//! query history log. Session data never reaches this file.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use tabula_core::error::TabulaError;

use crate::migrations;

/// The history database: a single connection shared by every
/// [`SqliteStorage`](crate::SqliteStorage) call.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the history file at `path`, creating it and its directory on
    /// first run. The schema is brought up to date before returning.
    pub fn new(path: &Path) -> Result<Self, TabulaError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TabulaError::Storage(format!("Cannot open history database: {}", e))
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| TabulaError::Storage(format!("Cannot configure history database: {}", e)))?;

        info!(path = %path.display(), "History database opened");
        Self::migrated(conn)
    }

    /// Throwaway database with the same schema.
    pub fn in_memory() -> Result<Self, TabulaError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TabulaError::Storage(format!("Cannot open in-memory database: {}", e)))?;
        Self::migrated(conn)
    }

    fn migrated(conn: Connection) -> Result<Self, TabulaError> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` while holding the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, TabulaError>
    where
        F: FnOnce(&Connection) -> Result<T, TabulaError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TabulaError::Storage(format!("History database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
