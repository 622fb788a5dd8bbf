//! Tabula storage crate - key/value persistence behind a `Storage` trait.
//!
//! Provides an in-memory store for session-scoped state (the uploaded
//! dataset) and a WAL-mode SQLite store for durable state (query history).

pub mod db;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod storage;

pub use db::Database;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use storage::{read_json, write_json, Storage};
