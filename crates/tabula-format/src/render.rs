//! Plain-text rendering of a [`Document`] for terminals.

use crate::types::{Block, Document, InlineSpan};

const BOLD: &str = "\x1b[1m";
const HEADING: &str = "\x1b[1;38;5;105m";
const CODE: &str = "\x1b[38;5;141m";
const BULLET: &str = "\x1b[38;5;63m";
const RESET: &str = "\x1b[0m";

/// Rendering switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    /// Emit ANSI escape sequences.
    pub color: bool,
}

/// Render a document as text: one block per paragraph, blank line between.
pub fn render_plain(doc: &Document, options: RenderOptions) -> String {
    doc.iter()
        .map(|block| render_block(block, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(block: &Block, options: RenderOptions) -> String {
    match block {
        Block::Heading { text } => paint(text, HEADING, options),
        Block::List { items } => items
            .iter()
            .map(|item| {
                format!(
                    "{} {}",
                    paint("•", BULLET, options),
                    render_spans(item, options)
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Paragraph { runs } => render_spans(runs, options),
    }
}

fn render_spans(spans: &[InlineSpan], options: RenderOptions) -> String {
    spans
        .iter()
        .map(|span| match span {
            InlineSpan::PlainText(v) => v.clone(),
            InlineSpan::Bold(v) => paint(v, BOLD, options),
            InlineSpan::Code(v) => paint(v, CODE, options),
        })
        .collect()
}

fn paint(text: &str, style: &str, options: RenderOptions) -> String {
    if options.color {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}
