//! Turns raw service answers and pipeline errors into [`QueryResult`]s.

use serde_json::Value;
use tracing::warn;

use tabula_core::types::{QueryFailure, QueryResult, QuerySuccess};

use crate::error::QueryError;
use crate::service::ServiceResponse;

/// Message used when a failed response carries neither `error` nor `message`.
pub const DEFAULT_ERROR_MESSAGE: &str = "Failed to process query";

/// Message shown when there is nothing to query.
pub const NO_DATASET_MESSAGE: &str = "Load data first";

#[derive(Clone, Copy, Debug, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Decode a response, surfacing anything but a well-formed success as
    /// a [`QueryError`].
    pub fn interpret(&self, response: ServiceResponse) -> Result<QuerySuccess, QueryError> {
        if !response.is_success() {
            return Err(Self::service_error(response.body));
        }

        let status = response.status;
        serde_json::from_value(response.body).map_err(|e| {
            warn!(status, error = %e, "Malformed service response");
            QueryError::Transport {
                message: format!("Malformed service response: {}", e),
                stack: None,
            }
        })
    }

    pub fn assemble(&self, response: ServiceResponse) -> QueryResult {
        match self.interpret(response) {
            Ok(success) => QueryResult::Success(success),
            Err(e) => QueryResult::Error(self.from_error(&e)),
        }
    }

    /// Failure shown for an error raised anywhere in the query path.
    pub fn from_error(&self, err: &QueryError) -> QueryFailure {
        let (message, details, stack) = match err {
            QueryError::NoDataset => (NO_DATASET_MESSAGE.to_string(), None, None),
            QueryError::Service {
                message,
                details,
                stack,
            } => (message.clone(), details.clone(), stack.clone()),
            QueryError::Transport { message, stack } => (message.clone(), None, stack.clone()),
            other => (other.to_string(), None, None),
        };
        QueryFailure {
            message,
            details,
            stack,
            logs: Vec::new(),
        }
    }

    /// Compose the user-facing error for a non-success response body.
    fn service_error(body: Value) -> QueryError {
        let mut message = text_field(&body, "error")
            .or_else(|| text_field(&body, "message"))
            .unwrap_or(DEFAULT_ERROR_MESSAGE)
            .to_string();

        let details = body.get("details").filter(|d| is_truthy(d)).cloned();
        if let Some(details) = &details {
            let pretty = serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string());
            message.push_str("\n\nDetails:\n");
            message.push_str(&pretty);

            match details.get("suggestion") {
                Some(Value::String(s)) if !s.is_empty() => {
                    message.push_str("\n\n\u{1F4A1} Suggestion: ");
                    message.push_str(s);
                }
                Some(other) if is_truthy(other) => {
                    message.push_str("\n\n\u{1F4A1} Suggestion: ");
                    message.push_str(&other.to_string());
                }
                _ => {}
            }
        }

        QueryError::Service {
            message,
            details,
            stack: text_field(&body, "stack").map(str::to_string),
        }
    }
}

fn text_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// `null`, `false`, `0` and `""` count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
