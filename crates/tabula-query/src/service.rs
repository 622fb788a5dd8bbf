//! Client side of the remote query-answering service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use tabula_core::config::ServiceConfig;
use tabula_core::types::{Dataset, Record};

use crate::error::QueryError;

/// Body of `POST <endpoint>`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub data: &'a [Record],
    pub columns: &'a [String],
}

impl<'a> QueryRequest<'a> {
    pub fn new(query: &'a str, dataset: &'a Dataset) -> Self {
        Self {
            query,
            data: &dataset.rows,
            columns: &dataset.column_names,
        }
    }
}

/// Raw answer: HTTP status plus the decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can answer a query.
///
/// Returns `Err` only for transport failures; a non-success status is a
/// normal [`ServiceResponse`].
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, request: &QueryRequest<'_>) -> Result<ServiceResponse, QueryError>;
}

/// [`QueryService`] over HTTP + JSON.
#[derive(Debug, Clone)]
pub struct HttpQueryService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpQueryService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, QueryError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn query(&self, request: &QueryRequest<'_>) -> Result<ServiceResponse, QueryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, bytes = text.len(), "Service response received");

        let body = serde_json::from_str(&text).map_err(|e| QueryError::Transport {
            message: format!("Malformed JSON in service response (HTTP {}): {}", status, e),
            stack: Some(text.chars().take(500).collect()),
        })?;

        Ok(ServiceResponse::new(status, body))
    }
}
