//! Chooses the dataset a query runs against.
//!
//! Precedence: the dataset loaded in this session > the upload persisted in
//! session storage > the built-in sample.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use tabula_core::types::{Dataset, Record};
use tabula_storage::{read_json, write_json, Storage};

use crate::error::QueryError;
use crate::sample::sample_dataset;

/// Session storage key holding the uploaded rows.
pub const UPLOADED_DATA_KEY: &str = "uploadedData";
/// Session storage key holding the uploaded column names.
pub const UPLOADED_COLUMNS_KEY: &str = "uploadedColumns";

/// Where a resolved dataset came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    Explicit,
    Session,
    Sample,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedDataset {
    pub dataset: Dataset,
    pub source: DatasetSource,
}

pub struct DatasetResolver {
    session: Arc<dyn Storage>,
    sample: Dataset,
}

impl DatasetResolver {
    /// Resolver falling back to the built-in sample dataset.
    pub fn new(session: Arc<dyn Storage>) -> Self {
        Self::with_sample(session, sample_dataset())
    }

    pub fn with_sample(session: Arc<dyn Storage>, sample: Dataset) -> Self {
        Self { session, sample }
    }

    /// Pick the dataset for a query. The result may be empty; callers decide
    /// whether that is an error.
    pub fn resolve(&self, explicit: Option<&Dataset>) -> ResolvedDataset {
        if let Some(dataset) = explicit {
            return ResolvedDataset {
                dataset: dataset.clone(),
                source: DatasetSource::Explicit,
            };
        }

        if let Some(dataset) = self.session_dataset() {
            return ResolvedDataset {
                dataset,
                source: DatasetSource::Session,
            };
        }

        debug!(rows = self.sample.len(), "Using built-in sample dataset");
        ResolvedDataset {
            dataset: self.sample.clone(),
            source: DatasetSource::Sample,
        }
    }

    /// Persist an uploaded dataset to session storage.
    pub fn store_upload(&self, dataset: &Dataset) -> Result<(), QueryError> {
        write_json(self.session.as_ref(), UPLOADED_DATA_KEY, &dataset.rows)?;
        write_json(
            self.session.as_ref(),
            UPLOADED_COLUMNS_KEY,
            &dataset.column_names,
        )?;
        Ok(())
    }

    /// Forget the uploaded dataset.
    pub fn clear_upload(&self) -> Result<(), QueryError> {
        self.session.remove(UPLOADED_DATA_KEY)?;
        self.session.remove(UPLOADED_COLUMNS_KEY)?;
        Ok(())
    }

    fn session_dataset(&self) -> Option<Dataset> {
        let rows: Vec<Record> = match read_json(self.session.as_ref(), UPLOADED_DATA_KEY) {
            Ok(Some(rows)) => rows,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable uploaded dataset");
                return None;
            }
        };

        let columns: Vec<String> =
            match read_json(self.session.as_ref(), UPLOADED_COLUMNS_KEY) {
                Ok(columns) => columns.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable uploaded columns");
                    Vec::new()
                }
            };

        Some(Dataset::new(rows, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_storage::MemoryStorage;

    fn dataset(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    fn resolver() -> (Arc<MemoryStorage>, DatasetResolver) {
        let session = Arc::new(MemoryStorage::new());
        let resolver = DatasetResolver::new(session.clone());
        (session, resolver)
    }

    #[test]
    fn test_explicit_wins_over_session_and_sample() {
        let (_, resolver) = resolver();
        resolver
            .store_upload(&dataset(json!([{"a": 1}, {"a": 2}])))
            .unwrap();
        let explicit = dataset(json!([{"b": 1}]));

        let resolved = resolver.resolve(Some(&explicit));
        assert_eq!(resolved.source, DatasetSource::Explicit);
        assert_eq!(resolved.dataset, explicit);
    }

    #[test]
    fn test_session_wins_over_sample() {
        let (_, resolver) = resolver();
        resolver
            .store_upload(&dataset(json!({"rows": [{"a": 1, "b": 2}], "columns": ["b", "a"]})))
            .unwrap();

        let resolved = resolver.resolve(None);
        assert_eq!(resolved.source, DatasetSource::Session);
        assert_eq!(resolved.dataset.len(), 1);
        assert_eq!(resolved.dataset.column_names, vec!["b", "a"]);
    }

    #[test]
    fn test_sample_when_nothing_uploaded() {
        let (_, resolver) = resolver();
        let resolved = resolver.resolve(None);
        assert_eq!(resolved.source, DatasetSource::Sample);
        assert!(!resolved.dataset.is_empty());
    }

    #[test]
    fn test_upload_visible_to_fresh_resolver_on_same_session() {
        let (session, resolver) = resolver();
        resolver
            .store_upload(&dataset(json!([{"city": "Oslo"}])))
            .unwrap();

        let other = DatasetResolver::new(session);
        let resolved = other.resolve(None);
        assert_eq!(resolved.source, DatasetSource::Session);
        assert_eq!(resolved.dataset.column_names, vec!["city"]);
    }

    #[test]
    fn test_missing_columns_key_derives_from_rows() {
        let (session, resolver) = resolver();
        session
            .set(UPLOADED_DATA_KEY, r#"[{"x": 1, "y": 2}]"#)
            .unwrap();
        let resolved = resolver.resolve(None);
        assert_eq!(resolved.dataset.column_names, vec!["x", "y"]);
    }

    #[test]
    fn test_corrupt_session_falls_back_to_sample() {
        let (session, resolver) = resolver();
        session.set(UPLOADED_DATA_KEY, "{{{").unwrap();
        assert_eq!(resolver.resolve(None).source, DatasetSource::Sample);
    }

    #[test]
    fn test_clear_upload() {
        let (_, resolver) = resolver();
        resolver
            .store_upload(&dataset(json!([{"a": 1}])))
            .unwrap();
        resolver.clear_upload().unwrap();
        assert_eq!(resolver.resolve(None).source, DatasetSource::Sample);
    }

    #[test]
    fn test_empty_sample_resolves_empty() {
        let session = Arc::new(MemoryStorage::new());
        let resolver = DatasetResolver::with_sample(session, Dataset::default());
        let resolved = resolver.resolve(None);
        assert_eq!(resolved.source, DatasetSource::Sample);
        assert!(resolved.dataset.is_empty());
    }
}
