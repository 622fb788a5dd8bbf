//! Document model produced by the block parser.

use serde::Serialize;

/// An inline fragment inside a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InlineSpan {
    PlainText(String),
    Bold(String),
    Code(String),
}

impl InlineSpan {
    /// The span's visible text, markers removed.
    pub fn text(&self) -> &str {
        match self {
            InlineSpan::PlainText(v) | InlineSpan::Bold(v) | InlineSpan::Code(v) => v,
        }
    }
}

/// Ordered inline spans making up one line of visible text.
pub type InlineRun = Vec<InlineSpan>;

/// Concatenate the visible text of a run.
pub fn run_text(run: &[InlineSpan]) -> String {
    run.iter().map(InlineSpan::text).collect()
}

/// One structural unit of rendered text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    List { items: Vec<InlineRun> },
    Paragraph { runs: InlineRun },
}

/// Ordered blocks of one rendered message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
