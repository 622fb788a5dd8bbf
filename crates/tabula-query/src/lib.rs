//! Query orchestration for Tabula.
//!
//! Resolves which dataset backs a query, sends it to the remote
//! query-answering service, turns the response into a [`QueryResult`],
//! and keeps a bounded, persisted history of past queries.
//!
//! [`QueryResult`]: tabula_core::QueryResult

pub mod assemble;
pub mod dataset;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod sample;
pub mod service;

pub use assemble::ResultAssembler;
pub use dataset::{DatasetResolver, DatasetSource, ResolvedDataset};
pub use error::QueryError;
pub use history::{HistoryStore, DEFAULT_HISTORY_LIMIT, HISTORY_KEY};
pub use orchestrator::{validate_transition, Phase, QueryOrchestrator, SubmitOutcome, ViewState};
pub use service::{HttpQueryService, QueryRequest, QueryService, ServiceResponse};
