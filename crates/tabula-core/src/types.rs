use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Dataset
// =============================================================================

/// One row of a dataset: column name to scalar value, in column order.
pub type Record = Map<String, Value>;

/// Number of rows included in a [`DatasetSummary`] preview.
pub const PREVIEW_ROWS: usize = 5;

/// Tabular rows and their column names.
///
/// Deserializes from either a bare array of records or an object with a
/// `rows` array and optional `columnNames` (or `columns`). When no column
/// names are supplied they are taken from the keys of the first record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DatasetRepr")]
pub struct Dataset {
    pub rows: Vec<Record>,
    #[serde(rename = "columnNames")]
    pub column_names: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetRepr {
    Rows(Vec<Record>),
    Shaped {
        rows: Vec<Record>,
        #[serde(default, rename = "columnNames", alias = "columns")]
        column_names: Option<Vec<String>>,
    },
}

impl From<DatasetRepr> for Dataset {
    fn from(repr: DatasetRepr) -> Self {
        match repr {
            DatasetRepr::Rows(rows) => Dataset::from_rows(rows),
            DatasetRepr::Shaped { rows, column_names } => {
                Dataset::new(rows, column_names.unwrap_or_default())
            }
        }
    }
}

impl Dataset {
    /// Build a dataset; an empty `column_names` is derived from the first row.
    pub fn new(rows: Vec<Record>, column_names: Vec<String>) -> Self {
        if column_names.is_empty() {
            return Self::from_rows(rows);
        }
        Self { rows, column_names }
    }

    /// Build a dataset whose columns are the keys of the first row.
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let column_names = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self { rows, column_names }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.len(),
            columns: self.column_count(),
            column_names: self.column_names.clone(),
            preview: self.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
        }
    }
}

/// Shape of a loaded dataset, shown after upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub preview: Vec<Record>,
}

/// Chart description handed to the chart renderer untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartSpec(pub Value);

impl ChartSpec {
    /// The chart's `type` field (e.g. "bar", "line"), if any.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }
}

// =============================================================================
// Logs
// =============================================================================

/// Marker that older services prefix onto failure log lines.
pub const ERROR_MARKER: &str = "\u{274c}";

/// Literal markers that flag an unlabelled log line as an error.
const ERROR_MARKERS: [&str; 3] = [ERROR_MARKER, "ERROR", "ОШИБКА"];

/// Severity of a log line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Error,
}

impl Severity {
    /// Classify a log message from a producer that does not report severity.
    ///
    /// Markers are matched literally and case-sensitively, so "No errors
    /// found" stays `Info`.
    pub fn from_marker(message: &str) -> Self {
        if ERROR_MARKERS.iter().any(|marker| message.contains(marker)) {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

/// A timestamped line in the processing log of one query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LogEntryRepr")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

#[derive(Deserialize)]
struct LogEntryRepr {
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    message: String,
    #[serde(default, alias = "level")]
    severity: Option<Severity>,
}

impl From<LogEntryRepr> for LogEntry {
    fn from(repr: LogEntryRepr) -> Self {
        let severity = repr
            .severity
            .unwrap_or_else(|| Severity::from_marker(&repr.message));
        Self {
            timestamp: repr.timestamp,
            message: repr.message,
            severity,
        }
    }
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// =============================================================================
// Query results
// =============================================================================

/// Treat an explicit JSON `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A successful answer from the query service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySuccess {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Service-reported result type ("text", "table", "chart", ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Dataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<LogEntry>,
}

/// A failed query, ready for display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<LogEntry>,
}

/// Outcome of one query submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResult {
    Success(QuerySuccess),
    Error(QueryFailure),
}

impl QueryResult {
    pub fn message(&self) -> &str {
        match self {
            QueryResult::Success(s) => &s.message,
            QueryResult::Error(e) => &e.message,
        }
    }

    pub fn logs(&self) -> &[LogEntry] {
        match self {
            QueryResult::Success(s) => &s.logs,
            QueryResult::Error(e) => &e.logs,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }

    /// Result type recorded in history: the reported type, "text" when the
    /// service reported none, "error" for failures.
    pub fn result_type(&self) -> &str {
        match self {
            QueryResult::Success(s) => s.result_type.as_deref().unwrap_or("text"),
            QueryResult::Error(_) => "error",
        }
    }

    pub fn table(&self) -> Option<&Dataset> {
        match self {
            QueryResult::Success(s) => s.table.as_ref(),
            QueryResult::Error(_) => None,
        }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match self {
            QueryResult::Success(s) => s.chart.as_ref(),
            QueryResult::Error(_) => None,
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// Summary of one past query. Never holds the result payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryItem {
    pub id: i64,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub result_type: String,
    pub has_chart: bool,
    pub has_table: bool,
}
