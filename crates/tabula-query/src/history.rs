//! Bounded, persisted log of past queries (newest first).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use tabula_core::types::{QueryHistoryItem, QueryResult};
use tabula_storage::{read_json, write_json, Storage};

use crate::error::QueryError;

/// Durable storage key holding the serialized history log.
pub const HISTORY_KEY: &str = "queryHistory";

/// Default number of entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub struct HistoryStore {
    storage: Arc<dyn Storage>,
    limit: usize,
    items: Mutex<Vec<QueryHistoryItem>>,
}

impl HistoryStore {
    /// Empty store; call [`load`](Self::load) to read persisted entries.
    pub fn new(storage: Arc<dyn Storage>, limit: usize) -> Self {
        Self {
            storage,
            limit: limit.max(1),
            items: Mutex::new(Vec::new()),
        }
    }

    /// Store with persisted entries already loaded.
    pub fn open(storage: Arc<dyn Storage>, limit: usize) -> Self {
        let store = Self::new(storage, limit);
        store.load();
        store
    }

    /// Replace the in-memory log with the persisted one.
    ///
    /// An unreadable log is reported and treated as empty.
    pub fn load(&self) -> Vec<QueryHistoryItem> {
        let mut loaded: Vec<QueryHistoryItem> =
            match read_json(self.storage.as_ref(), HISTORY_KEY) {
                Ok(items) => items.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Error loading query history");
                    Vec::new()
                }
            };
        loaded.truncate(self.limit);
        info!(entries = loaded.len(), "Query history loaded");

        let mut items = self.lock_items();
        *items = loaded;
        items.clone()
    }

    /// Prepend a summary of `result`, drop entries beyond the limit, and
    /// write the whole log through to storage.
    ///
    /// The in-memory log is updated even if persisting fails.
    pub fn record(&self, query: &str, result: &QueryResult) -> Result<QueryHistoryItem, QueryError> {
        let now = Utc::now();
        let snapshot = {
            let mut items = self.lock_items();
            let id = match items.first() {
                Some(newest) => now.timestamp_millis().max(newest.id + 1),
                None => now.timestamp_millis(),
            };
            items.insert(
                0,
                QueryHistoryItem {
                    id,
                    query: query.to_string(),
                    timestamp: now,
                    result_type: result.result_type().to_string(),
                    has_chart: result.chart().is_some(),
                    has_table: result.table().is_some(),
                },
            );
            items.truncate(self.limit);
            items.clone()
        };

        write_json(self.storage.as_ref(), HISTORY_KEY, &snapshot)?;
        Ok(snapshot[0].clone())
    }

    /// Current entries, newest first.
    pub fn items(&self) -> Vec<QueryHistoryItem> {
        self.lock_items().clone()
    }

    pub fn get(&self, id: i64) -> Option<QueryHistoryItem> {
        self.lock_items().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<QueryHistoryItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_core::error::{Result as TabulaResult, TabulaError};
    use tabula_core::types::{ChartSpec, Dataset, QueryFailure, QuerySuccess};
    use tabula_storage::MemoryStorage;

    fn text_result() -> QueryResult {
        QueryResult::Success(QuerySuccess {
            message: "ok".into(),
            ..Default::default()
        })
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> TabulaResult<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> TabulaResult<()> {
            Err(TabulaError::Storage("read-only".into()))
        }
        fn remove(&self, _key: &str) -> TabulaResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_record_caps_at_limit_newest_first() {
        let store = HistoryStore::new(Arc::new(MemoryStorage::new()), DEFAULT_HISTORY_LIMIT);
        for i in 0..25 {
            store.record(&format!("q{}", i), &text_result()).unwrap();
        }

        let items = store.items();
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].query, "q24");
        assert_eq!(items[19].query, "q5");
        assert!(items.iter().all(|item| item.query != "q0"));
    }

    #[test]
    fn test_ids_strictly_decrease_from_newest() {
        let store = HistoryStore::new(Arc::new(MemoryStorage::new()), 20);
        for i in 0..5 {
            store.record(&format!("q{}", i), &text_result()).unwrap();
        }
        let items = store.items();
        for pair in items.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn test_summary_fields() {
        let store = HistoryStore::new(Arc::new(MemoryStorage::new()), 20);
        let result = QueryResult::Success(QuerySuccess {
            message: "chart".into(),
            result_type: Some("chart".into()),
            chart: Some(ChartSpec(json!({"type": "bar"}))),
            table: Some(Dataset::default()),
            logs: vec![],
        });
        let item = store.record("plot sales", &result).unwrap();
        assert_eq!(item.result_type, "chart");
        assert!(item.has_chart);
        assert!(item.has_table);

        let failure = QueryResult::Error(QueryFailure {
            message: "bad".into(),
            ..Default::default()
        });
        let item = store.record("oops", &failure).unwrap();
        assert_eq!(item.result_type, "error");
        assert!(!item.has_chart);
        assert!(!item.has_table);
    }

    #[test]
    fn test_write_through_and_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = HistoryStore::new(storage.clone(), 20);
        store.record("first", &text_result()).unwrap();
        store.record("second", &text_result()).unwrap();

        let raw = storage.get(HISTORY_KEY).unwrap().unwrap();
        let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted[0]["query"], "second");
        assert_eq!(persisted[0]["resultType"], "text");

        let reopened = HistoryStore::open(storage, 20);
        let queries: Vec<_> = reopened.items().into_iter().map(|i| i.query).collect();
        assert_eq!(queries, vec!["second", "first"]);
    }

    #[test]
    fn test_load_truncates_oversized_log() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let big = HistoryStore::new(storage.clone(), 50);
        for i in 0..30 {
            big.record(&format!("q{}", i), &text_result()).unwrap();
        }
        let small = HistoryStore::open(storage, 20);
        assert_eq!(small.len(), 20);
        assert_eq!(small.items()[0].query, "q29");
    }

    #[test]
    fn test_corrupt_log_loads_empty() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(HISTORY_KEY, "not json").unwrap();
        let store = HistoryStore::open(storage, 20);
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let store = HistoryStore::new(Arc::new(MemoryStorage::new()), 20);
        let item = store.record("find me", &text_result()).unwrap();
        assert_eq!(store.get(item.id).unwrap().query, "find me");
        assert!(store.get(item.id + 1000).is_none());
    }

    #[test]
    fn test_persist_failure_still_updates_memory() {
        let store = HistoryStore::new(Arc::new(ReadOnlyStorage), 20);
        let result = store.record("q", &text_result());
        assert!(matches!(result, Err(QueryError::Storage(_))));
        assert_eq!(store.len(), 1);
    }
}
