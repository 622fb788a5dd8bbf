//! Error types for the query pipeline.

use serde_json::Value;
use tabula_core::error::TabulaError;

use crate::orchestrator::Phase;

/// Errors raised while answering a query.
///
/// None of these escape [`QueryOrchestrator::submit`]; they are converted
/// into an error [`QueryResult`] there.
///
/// [`QueryOrchestrator::submit`]: crate::orchestrator::QueryOrchestrator::submit
/// [`QueryResult`]: tabula_core::QueryResult
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no dataset available")]
    NoDataset,
    /// The service answered with a non-success status.
    #[error("{message}")]
    Service {
        message: String,
        details: Option<Value>,
        stack: Option<String>,
    },
    /// The call failed before a usable answer arrived.
    #[error("{message}")]
    Transport {
        message: String,
        stack: Option<String>,
    },
    #[error("history item not found: {0}")]
    HistoryNotFound(i64),
    #[error("invalid phase transition: {0} -> {1}")]
    InvalidTransition(Phase, Phase),
    #[error("storage error: {0}")]
    Storage(String),
}

impl QueryError {
    /// Transport failure carrying the error's source chain as its stack.
    pub fn transport(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        QueryError::Transport {
            message: err.to_string(),
            stack: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }
}

impl From<TabulaError> for QueryError {
    fn from(err: TabulaError) -> Self {
        QueryError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::transport(&err)
    }
}
