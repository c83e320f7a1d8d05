// src/core/report_ast.rs
//! 报告文档树 (Report document tree)
//!
//! The parser produces a `Document`; renderers consume it. Text stored in the
//! tree is the raw source text, escaping happens only at render time.

use serde::{Deserialize, Serialize};

/// Inline style of a text fragment. `BoldItalic` is italic text inside a bold span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
    BoldItalic,
}

impl SpanStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, SpanStyle::Bold | SpanStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, SpanStyle::Italic | SpanStyle::BoldItalic)
    }

    /// Style of an italic run found inside text of this style
    pub fn with_italic(self) -> SpanStyle {
        if self.is_bold() {
            SpanStyle::BoldItalic
        } else {
            SpanStyle::Italic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub style: SpanStyle,
    pub text: String,
}

impl Span {
    pub fn new(style: SpanStyle, text: impl Into<String>) -> Self {
        Self { style, text: text.into() }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self { style: SpanStyle::Plain, text: text.into() }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self { style: SpanStyle::Bold, text: text.into() }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self { style: SpanStyle::Italic, text: text.into() }
    }

    pub fn bold_italic(text: impl Into<String>) -> Self {
        Self { style: SpanStyle::BoldItalic, text: text.into() }
    }
}

/// A run of styled spans; adjacent plain spans are always merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineRun(pub Vec<Span>);

impl InlineRun {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, span: Span) {
        if span.text.is_empty() {
            return;
        }
        if span.style == SpanStyle::Plain {
            if let Some(last) = self.0.last_mut() {
                if last.style == SpanStyle::Plain {
                    last.text.push_str(&span.text);
                    return;
                }
            }
        }
        self.0.push(span);
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenated text of all spans, without markup
    pub fn text(&self) -> String {
        self.0.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Block-level node.
///
/// A paragraph keeps its source lines apart: each entry in `lines` is joined
/// to the next one by a hard line break when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: InlineRun },
    Paragraph { lines: Vec<InlineRun> },
    List { ordered: bool, items: Vec<InlineRun> },
}

impl Block {
    /// Plain text of the block; paragraph lines and list items are joined by newlines
    pub fn text(&self) -> String {
        match self {
            Block::Heading { text, .. } => text.text(),
            Block::Paragraph { lines } => join_runs(lines),
            Block::List { items, .. } => join_runs(items),
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, Block::Paragraph { .. })
    }
}

fn join_runs(runs: &[InlineRun]) -> String {
    runs.iter().map(InlineRun::text).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Single-paragraph document holding `text` verbatim
    pub fn placeholder(text: &str) -> Self {
        let mut run = InlineRun::new();
        run.push(Span::plain(text));
        Self { blocks: vec![Block::Paragraph { lines: vec![run] }] }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether any heading or list was recognised
    pub fn has_structure(&self) -> bool {
        self.blocks.iter().any(Block::is_structural)
    }

    /// All prose in document order, blocks separated by blank lines
    pub fn plain_text(&self) -> String {
        self.blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n\n")
    }
}
