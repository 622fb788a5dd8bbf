//! Inline emphasis and code extraction.
//!
//! Bold spans are matched across the whole text first; code spans are only
//! looked for in the plain text between bold spans, never inside them.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{InlineRun, InlineSpan};

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid bold regex"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("Invalid code regex"));

/// Splits a line of text into plain, bold and code spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineFormatter;

impl InlineFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format `text` into spans. Unterminated markers are kept as literal text.
    pub fn format(&self, text: &str) -> InlineRun {
        let mut spans = Vec::new();
        let mut last = 0;

        for caps in BOLD_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_code_spans(&text[last..whole.start()], &mut spans);
            spans.push(InlineSpan::Bold(inner.as_str().to_string()));
            last = whole.end();
        }
        push_code_spans(&text[last..], &mut spans);

        spans
    }
}

/// Second pass over a plain segment: backtick runs become code spans.
fn push_code_spans(segment: &str, spans: &mut InlineRun) {
    let mut last = 0;

    for caps in CODE_RE.captures_iter(segment) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_plain(&segment[last..whole.start()], spans);
        spans.push(InlineSpan::Code(inner.as_str().to_string()));
        last = whole.end();
    }
    push_plain(&segment[last..], spans);
}

fn push_plain(text: &str, spans: &mut InlineRun) {
    if !text.is_empty() {
        spans.push(InlineSpan::PlainText(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::run_text;
    use proptest::prelude::*;
    use InlineSpan::{Bold, Code, PlainText};

    fn fmt(text: &str) -> InlineRun {
        InlineFormatter::new().format(text)
    }

    #[test]
    fn test_mixed_bold_and_code() {
        let spans = fmt("plain **bold** and `code`");
        assert_eq!(
            spans,
            vec![
                PlainText("plain ".into()),
                Bold("bold".into()),
                PlainText(" and ".into()),
                Code("code".into()),
            ]
        );
        assert_eq!(run_text(&spans), "plain bold and code");
    }

    #[test]
    fn test_unmatched_bold_marker_is_literal() {
        assert_eq!(fmt("a ** b"), vec![PlainText("a ** b".into())]);
    }

    #[test]
    fn test_unmatched_backtick_is_literal() {
        assert_eq!(fmt("use `x here"), vec![PlainText("use `x here".into())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(fmt("").is_empty());
    }

    #[test]
    fn test_code_inside_bold_stays_bold() {
        assert_eq!(fmt("**run `ls` now**"), vec![Bold("run `ls` now".into())]);
    }

    #[test]
    fn test_multiple_bold_spans() {
        assert_eq!(
            fmt("**a** then **b**"),
            vec![Bold("a".into()), PlainText(" then ".into()), Bold("b".into())]
        );
    }

    #[test]
    fn test_bold_is_non_greedy() {
        assert_eq!(
            fmt("**a**b**"),
            vec![Bold("a".into()), PlainText("b**".into())]
        );
    }

    #[test]
    fn test_bold_does_not_span_lines() {
        let spans = fmt("**start\nend**");
        assert_eq!(spans, vec![PlainText("**start\nend**".into())]);
    }

    #[test]
    fn test_adjacent_code_spans() {
        assert_eq!(
            fmt("`a``b`"),
            vec![Code("a".into()), Code("b".into())]
        );
    }

    #[test]
    fn test_empty_backticks_are_literal() {
        assert_eq!(fmt("``"), vec![PlainText("``".into())]);
    }

    #[test]
    fn test_lossless_except_markers() {
        let input = "Total **sales** in `region` were **42** (`sum`).";
        let visible = run_text(&fmt(input));
        assert_eq!(visible, input.replace("**", "").replace('`', ""));
    }

    #[test]
    fn test_unicode_text() {
        assert_eq!(
            fmt("Итого: **120 ₽** за `январь`"),
            vec![
                PlainText("Итого: ".into()),
                Bold("120 ₽".into()),
                PlainText(" за ".into()),
                Code("январь".into()),
            ]
        );
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Visible text of `text`: matched bold markers dropped everywhere,
    /// matched backticks dropped outside bold spans.
    fn without_markers(text: &str) -> String {
        let mut out = String::new();
        let mut last = 0;
        for caps in BOLD_RE.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            out.push_str(&CODE_RE.replace_all(&text[last..whole.start()], "$1"));
            out.push_str(&caps[1]);
            last = whole.end();
        }
        out.push_str(&CODE_RE.replace_all(&text[last..], "$1"));
        out
    }

    proptest! {
        #[test]
        fn prop_format_only_removes_matched_markers(text in "[a-z *`\n]{0,60}") {
            let spans = fmt(&text);
            prop_assert_eq!(run_text(&spans), without_markers(&text));
            prop_assert!(run_text(&spans).len() <= text.len());
        }

        #[test]
        fn prop_format_is_total(text in any::<String>()) {
            let visible = run_text(&fmt(&text));
            prop_assert!(visible.len() <= text.len());
        }

        #[test]
        fn prop_text_without_pairs_is_one_plain_span(text in "[a-z .,*]{0,20}`?[a-z .,*]{0,20}") {
            prop_assume!(!text.is_empty() && !text.contains("**"));
            prop_assert_eq!(fmt(&text), vec![PlainText(text.clone())]);
        }
    }
}
