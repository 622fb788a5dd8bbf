//! Response formatting for Tabula.
//!
//! Turns the free-form text returned by the query service into a
//! [`Document`] of headings, lists and paragraphs with inline bold and
//! code spans, and renders documents for a terminal.

pub mod block;
pub mod inline;
pub mod render;
pub mod types;

pub use block::{classify, BlockKind, TextBlockParser};
pub use inline::InlineFormatter;
pub use render::{render_plain, RenderOptions};
pub use types::{run_text, Block, Document, InlineRun, InlineSpan};
