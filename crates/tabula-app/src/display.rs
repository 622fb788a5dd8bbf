//! Terminal output for answers, logs, history and dataset summaries.

use chrono::Local;
use serde_json::Value;

use tabula_core::types::{Dataset, DatasetSummary, LogEntry, QueryHistoryItem, QueryResult};
use tabula_format::{render_plain, RenderOptions, TextBlockParser};

const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Rows of a result table printed under the answer.
const TABLE_PREVIEW_ROWS: usize = 10;

pub struct Display {
    parser: TextBlockParser,
    color: bool,
}

impl Display {
    pub fn new(color: bool) -> Self {
        Self {
            parser: TextBlockParser::new(),
            color,
        }
    }

    /// Render the answer text, then any table, chart or failure details.
    pub fn result(&self, result: &QueryResult) -> String {
        let doc = self.parser.parse(result.message());
        let mut out = render_plain(&doc, RenderOptions { color: self.color });

        match result {
            QueryResult::Success(success) => {
                if let Some(table) = &success.table {
                    out.push_str("\n\n");
                    out.push_str(&self.table(table));
                }
                if let Some(chart) = &success.chart {
                    out.push_str("\n\n");
                    out.push_str(&format!("Chart: {}", chart.kind().unwrap_or("unknown")));
                }
            }
            QueryResult::Error(failure) => {
                // Inline styles end in RESET; resume red after each one.
                out = self.paint(&out.replace(RESET, &format!("{RESET}{RED}")), RED);
                if let Some(stack) = &failure.stack {
                    out.push_str("\n\n");
                    out.push_str(&self.paint(&format!("Stack:\n{}", stack), DIM));
                }
            }
        }
        out
    }

    /// One line per log entry; error entries in red.
    pub fn logs(&self, logs: &[LogEntry]) -> String {
        logs.iter()
            .map(|entry| {
                let line = format!(
                    "[{}] {}",
                    entry.timestamp.with_timezone(&Local).format("%H:%M:%S"),
                    entry.message
                );
                if entry.is_error() {
                    self.paint(&line, RED)
                } else {
                    self.paint(&line, DIM)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn history(&self, items: &[QueryHistoryItem]) -> String {
        if items.is_empty() {
            return "No queries yet.".to_string();
        }
        items
            .iter()
            .map(|item| {
                let mut tags = vec![item.result_type.as_str()];
                if item.has_table && !tags.contains(&"table") {
                    tags.push("table");
                }
                if item.has_chart && !tags.contains(&"chart") {
                    tags.push("chart");
                }
                format!(
                    "{}  {}  [{}]  {}",
                    item.id,
                    item.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    tags.join(", "),
                    item.query
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn summary(&self, summary: &DatasetSummary) -> String {
        format!(
            "Loaded {} rows x {} columns: {}",
            summary.rows,
            summary.columns,
            summary.column_names.join(", ")
        )
    }

    fn table(&self, table: &Dataset) -> String {
        let columns = &table.column_names;
        let cells: Vec<Vec<String>> = table
            .rows
            .iter()
            .take(TABLE_PREVIEW_ROWS)
            .map(|row| columns.iter().map(|c| cell(row.get(c))).collect())
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = vec![self.paint(&line(columns.as_slice()), DIM)];
        out.extend(cells.iter().map(|r| line(r.as_slice())));
        if table.len() > TABLE_PREVIEW_ROWS {
            out.push(format!("... {} more rows", table.len() - TABLE_PREVIEW_ROWS));
        }
        out.join("\n")
    }

    fn paint(&self, text: &str, style: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tabula_core::types::{ChartSpec, QueryFailure, QuerySuccess};

    fn plain() -> Display {
        Display::new(false)
    }

    #[test]
    fn test_result_renders_blocks() {
        let result = QueryResult::Success(QuerySuccess {
            message: "**Top regions**\n\n1. North\n2. South\n\nNorth sold **42** `units`.".into(),
            ..Default::default()
        });
        assert_eq!(
            plain().result(&result),
            "Top regions\n\n• North\n• South\n\nNorth sold 42 units."
        );
    }

    #[test]
    fn test_result_with_table_and_chart() {
        let table: Dataset =
            serde_json::from_value(json!([{"region": "North", "sales": 42}, {"region": "South", "sales": null}]))
                .unwrap();
        let result = QueryResult::Success(QuerySuccess {
            message: "Done".into(),
            table: Some(table),
            chart: Some(ChartSpec(json!({"type": "bar"}))),
            ..Default::default()
        });
        assert_eq!(
            plain().result(&result),
            "Done\n\nregion  sales\nNorth   42\nSouth\n\nChart: bar"
        );
    }

    #[test]
    fn test_long_table_is_cut() {
        let rows: Vec<_> = (0..13).map(|i| json!({"i": i})).collect();
        let table: Dataset = serde_json::from_value(Value::Array(rows)).unwrap();
        let out = plain().table(&table);
        assert!(out.ends_with("... 3 more rows"));
        assert_eq!(out.lines().count(), 1 + TABLE_PREVIEW_ROWS + 1);
    }

    #[test]
    fn test_error_result_shows_stack() {
        let result = QueryResult::Error(QueryFailure {
            message: "bad".into(),
            stack: Some("at step".into()),
            ..Default::default()
        });
        assert_eq!(plain().result(&result), "bad\n\nStack:\nat step");
    }

    #[test]
    fn test_error_result_stays_red_after_inline_styles() {
        let result = QueryResult::Error(QueryFailure {
            message: "Column **region** not found, try `sales`".into(),
            ..Default::default()
        });
        let out = Display::new(true).result(&result);
        assert!(out.starts_with(RED));
        assert!(out.ends_with(RESET));
        let resumed = format!("{RESET}{RED}");
        assert_eq!(out.matches(resumed.as_str()).count(), 2);
        assert!(out.contains(&format!("{resumed} not found, try ")));
    }

    #[test]
    fn test_error_logs_are_red_with_color() {
        let logs = vec![LogEntry::info("started"), LogEntry::error("\u{274c} ERROR: bad")];
        let out = Display::new(true).logs(&logs);
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with(DIM));
        assert!(lines[1].starts_with(RED));
        assert!(lines[1].contains("ERROR: bad"));
    }

    #[test]
    fn test_history_lines() {
        let items = vec![QueryHistoryItem {
            id: 7,
            query: "sales by month".into(),
            timestamp: Utc::now(),
            result_type: "chart".into(),
            has_chart: true,
            has_table: true,
        }];
        let out = plain().history(&items);
        assert!(out.starts_with("7  "));
        assert!(out.ends_with("[chart, table]  sales by month"));
        assert_eq!(plain().history(&[]), "No queries yet.");
    }

    #[test]
    fn test_summary_line() {
        let ds: Dataset = serde_json::from_value(json!([{"a": 1, "b": 2}])).unwrap();
        assert_eq!(plain().summary(&ds.summary()), "Loaded 1 rows x 2 columns: a, b");
    }
}
