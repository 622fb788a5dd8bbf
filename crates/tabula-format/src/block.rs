//! Paragraph-level structure of a service answer.
//!
//! Text is split on blank lines and each paragraph is classified by
//! [`classify`] in a fixed priority order: heading, list, paragraph.

use regex::Regex;
use std::sync::LazyLock;

use crate::inline::InlineFormatter;
use crate::types::{Block, Document};

// =============================================================================
// Patterns
// =============================================================================

static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("Invalid paragraph break regex")
});

/// Whole single-line paragraph wrapped in `**`.
static BOLD_WRAPPED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*.*\*\*$").expect("Invalid heading regex"));

/// `1. **Title**` style numbered heading.
static NUMBERED_BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+\*\*").expect("Invalid numbered heading regex"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*•]\s").expect("Invalid bullet regex"));

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("Invalid numbered item regex"));

// =============================================================================
// Classification
// =============================================================================

/// Structural kind of a trimmed, non-empty paragraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    List,
    Paragraph,
}

/// Classify a trimmed paragraph. First match wins.
pub fn classify(paragraph: &str) -> BlockKind {
    if BOLD_WRAPPED_RE.is_match(paragraph) || NUMBERED_BOLD_RE.is_match(paragraph) {
        return BlockKind::Heading;
    }
    if BULLET_RE.is_match(paragraph) || NUMBERED_RE.is_match(paragraph) {
        return BlockKind::List;
    }
    BlockKind::Paragraph
}

/// Remove a leading bullet, then a leading number marker, from a list line.
fn strip_list_marker(line: &str) -> &str {
    let line = match BULLET_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let line = match NUMBERED_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    line.trim()
}

// =============================================================================
// TextBlockParser
// =============================================================================

/// Splits answer text into a [`Document`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextBlockParser {
    inline: InlineFormatter,
}

impl TextBlockParser {
    pub fn new() -> Self {
        Self {
            inline: InlineFormatter::new(),
        }
    }

    /// Parse `text` into blocks. Never fails; empty input gives an empty document.
    pub fn parse(&self, text: &str) -> Document {
        let blocks = PARAGRAPH_BREAK_RE
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| self.build_block(p))
            .collect();
        Document::new(blocks)
    }

    fn build_block(&self, paragraph: &str) -> Block {
        match classify(paragraph) {
            BlockKind::Heading => Block::Heading {
                text: paragraph.replace("**", ""),
            },
            BlockKind::List => Block::List {
                items: paragraph
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| self.inline.format(strip_list_marker(line)))
                    .collect(),
            },
            BlockKind::Paragraph => Block::Paragraph {
                runs: self.inline.format(paragraph),
            },
        }
    }
}
