//! Query lifecycle: dataset resolution, the service call, result assembly,
//! view state and history.
//!
//! Every submission takes a request-generation token. Only the holder of the
//! latest token may write view state; older submissions finish as
//! [`SubmitOutcome::Superseded`] without touching anything.

pub mod state_machine;

pub use state_machine::{validate_transition, Phase};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tabula_core::types::{
    Dataset, DatasetSummary, LogEntry, QueryHistoryItem, QueryResult, ERROR_MARKER,
};

use crate::assemble::ResultAssembler;
use crate::dataset::{DatasetResolver, ResolvedDataset};
use crate::error::QueryError;
use crate::history::HistoryStore;
use crate::service::{QueryRequest, QueryService};

/// First log line of every submission that reaches the service.
pub const PROCESSING_STARTED: &str = "Query processing started...";

/// Placeholder for the `Details:` log line when there is no stack.
pub const NO_ADDITIONAL_INFO: &str = "No additional information";

const STACK_PREVIEW_CHARS: usize = 500;

/// Snapshot of what a front end shows.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub phase: Phase,
    pub loading: bool,
    /// Last non-empty query submitted.
    pub query: String,
    pub result: Option<QueryResult>,
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Blank query; nothing happened.
    Ignored,
    Completed(QueryResult),
    /// A newer submission started before this one finished.
    Superseded,
}

impl SubmitOutcome {
    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            SubmitOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

pub struct QueryOrchestrator {
    service: Arc<dyn QueryService>,
    resolver: DatasetResolver,
    history: HistoryStore,
    assembler: ResultAssembler,
    dataset: Mutex<Option<Dataset>>,
    generation: AtomicU64,
    state: Mutex<ViewState>,
}

impl QueryOrchestrator {
    pub fn new(
        service: Arc<dyn QueryService>,
        resolver: DatasetResolver,
        history: HistoryStore,
    ) -> Self {
        Self {
            service,
            resolver,
            history,
            assembler: ResultAssembler::new(),
            dataset: Mutex::new(None),
            generation: AtomicU64::new(0),
            state: Mutex::new(ViewState::default()),
        }
    }

    /// Run one query end to end.
    ///
    /// Errors never escape: they become an error [`QueryResult`] with the
    /// failure appended to the log stream.
    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        let query = query.trim();
        if query.is_empty() {
            debug!("Ignoring blank query");
            return SubmitOutcome::Ignored;
        }

        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = Uuid::new_v4();
        let _guard = SubmissionGuard { owner: self, token };

        let explicit = self.current_dataset();
        let resolved = self.resolver.resolve(explicit.as_ref());

        if resolved.dataset.is_empty() {
            warn!(%request_id, source = ?resolved.source, "No data to analyze");
            return self.fail_without_data(token, query);
        }

        {
            let mut state = self.lock_state();
            if !self.is_latest(token) {
                return SubmitOutcome::Superseded;
            }
            advance(&mut state, Phase::Submitting);
            state.loading = true;
            state.query = query.to_string();
            state.result = None;
            state.logs = vec![LogEntry::info(PROCESSING_STARTED)];
        }

        info!(
            %request_id,
            token,
            rows = resolved.dataset.len(),
            columns = resolved.dataset.column_count(),
            source = ?resolved.source,
            "Submitting query"
        );

        let request = QueryRequest::new(query, &resolved.dataset);
        let answer = match self.service.query(&request).await {
            Ok(response) => {
                debug!(%request_id, status = response.status, "Service answered");
                self.assembler.interpret(response)
            }
            Err(e) => Err(e),
        };

        let result = {
            let mut state = self.lock_state();
            if !self.is_latest(token) {
                info!(%request_id, token, "Discarding superseded response");
                return SubmitOutcome::Superseded;
            }
            let result = match answer {
                Ok(success) => {
                    advance(&mut state, Phase::Succeeded);
                    if !success.logs.is_empty() {
                        state.logs = success.logs.clone();
                    }
                    info!(%request_id, result_type = ?success.result_type, "Query succeeded");
                    QueryResult::Success(success)
                }
                Err(e) => {
                    advance(&mut state, Phase::Failed);
                    warn!(%request_id, error = %e, "Query failed");
                    let mut failure = self.assembler.from_error(&e);
                    state.logs.push(LogEntry::error(format!(
                        "{} ERROR: {}",
                        ERROR_MARKER, failure.message
                    )));
                    state.logs.push(LogEntry::error(format!(
                        "Details: {}",
                        stack_preview(failure.stack.as_deref())
                    )));
                    failure.logs = state.logs.clone();
                    QueryResult::Error(failure)
                }
            };
            state.result = Some(result.clone());
            result
        };

        self.record_history(query, &result);
        SubmitOutcome::Completed(result)
    }

    /// Submit the query of a past history entry again.
    pub async fn repeat(&self, id: i64) -> Result<SubmitOutcome, QueryError> {
        let item = self.history.get(id).ok_or(QueryError::HistoryNotFound(id))?;
        info!(id, "Repeating query from history");
        Ok(self.submit(&item.query).await)
    }

    /// Make `dataset` the one queries run against and persist it to the
    /// session store.
    pub fn set_dataset(&self, dataset: Dataset) -> Result<DatasetSummary, QueryError> {
        let summary = dataset.summary();
        info!(
            rows = summary.rows,
            columns = summary.columns,
            "Dataset loaded"
        );
        *self.lock_dataset() = Some(dataset.clone());
        self.resolver.store_upload(&dataset)?;
        Ok(summary)
    }

    /// The dataset the next query would use.
    pub fn active_dataset(&self) -> ResolvedDataset {
        let explicit = self.current_dataset();
        self.resolver.resolve(explicit.as_ref())
    }

    pub fn dataset_summary(&self) -> DatasetSummary {
        self.active_dataset().dataset.summary()
    }

    pub fn view(&self) -> ViewState {
        self.lock_state().clone()
    }

    pub fn history(&self) -> Vec<QueryHistoryItem> {
        self.history.items()
    }

    fn fail_without_data(&self, token: u64, query: &str) -> SubmitOutcome {
        let mut failure = self.assembler.from_error(&QueryError::NoDataset);
        let logs = vec![LogEntry::error(format!(
            "{} ERROR: No data to analyze",
            ERROR_MARKER
        ))];
        failure.logs = logs.clone();
        let result = QueryResult::Error(failure);

        {
            let mut state = self.lock_state();
            if !self.is_latest(token) {
                return SubmitOutcome::Superseded;
            }
            advance(&mut state, Phase::Failed);
            state.loading = false;
            state.query = query.to_string();
            state.result = Some(result.clone());
            state.logs = logs;
        }

        self.record_history(query, &result);
        SubmitOutcome::Completed(result)
    }

    fn record_history(&self, query: &str, result: &QueryResult) {
        if let Err(e) = self.history.record(query, result) {
            warn!(error = %e, "Failed to save query history");
        }
    }

    fn current_dataset(&self) -> Option<Dataset> {
        self.lock_dataset().clone()
    }

    fn is_latest(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dataset(&self) -> MutexGuard<'_, Option<Dataset>> {
        self.dataset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears `loading` and returns to `Idle` however a submission ends,
/// including when its future is dropped mid-flight. Does nothing once a
/// newer submission owns the view.
struct SubmissionGuard<'a> {
    owner: &'a QueryOrchestrator,
    token: u64,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.owner.lock_state();
        if !self.owner.is_latest(self.token) {
            return;
        }
        state.loading = false;
        if state.phase != Phase::Idle {
            advance(&mut state, Phase::Idle);
        }
    }
}

fn advance(state: &mut ViewState, to: Phase) {
    if let Err(e) = validate_transition(state.phase, to) {
        warn!(error = %e, "Unexpected phase transition");
    }
    state.phase = to;
}

fn stack_preview(stack: Option<&str>) -> String {
    match stack {
        Some(s) if !s.is_empty() => s.chars().take(STACK_PREVIEW_CHARS).collect(),
        _ => NO_ADDITIONAL_INFO.to_string(),
    }
}
