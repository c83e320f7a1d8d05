// src/core/report_renderer.rs
//! HTML output for a parsed report.
//!
//! Class names are part of the stylesheet contract and must not change with
//! content. All text is escaped here; the tree holds unescaped source text.

use crate::core::report_ast::{Block, Document, InlineRun};

pub const CLASS_H2: &str = "md-h2";
pub const CLASS_H3: &str = "md-h3";
pub const CLASS_H4: &str = "md-h4";
pub const CLASS_PARAGRAPH: &str = "md-p";
pub const CLASS_ORDERED_LIST: &str = "md-ol";
pub const CLASS_UNORDERED_LIST: &str = "md-ul";
pub const CLASS_LIST_ITEM: &str = "md-li";
pub const CLASS_STRONG: &str = "md-strong";
pub const CLASS_EM: &str = "md-em";

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Render a document, one block per line
    pub fn render(document: &Document) -> String {
        document
            .blocks
            .iter()
            .map(Self::render_block)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_block(block: &Block) -> String {
        match block {
            Block::Heading { level, text } => {
                let (tag, class) = match level {
                    2 => ("h2", CLASS_H2),
                    3 => ("h3", CLASS_H3),
                    _ => ("h4", CLASS_H4),
                };
                format!("<{tag} class=\"{class}\">{}</{tag}>", Self::render_inline(text))
            }
            Block::Paragraph { lines } => {
                let body = lines
                    .iter()
                    .map(Self::render_inline)
                    .collect::<Vec<_>>()
                    .join("<br />");
                format!("<p class=\"{CLASS_PARAGRAPH}\">{body}</p>")
            }
            Block::List { ordered, items } => {
                let (tag, class) = if *ordered {
                    ("ol", CLASS_ORDERED_LIST)
                } else {
                    ("ul", CLASS_UNORDERED_LIST)
                };
                let body: String = items
                    .iter()
                    .map(|item| {
                        format!("<li class=\"{CLASS_LIST_ITEM}\">{}</li>", Self::render_inline(item))
                    })
                    .collect();
                format!("<{tag} class=\"{class}\">{body}</{tag}>")
            }
        }
    }

    /// Consecutive bold spans share one `<strong>`, so italics inside a bold
    /// span render as `<strong>..<em>..</em>..</strong>`.
    pub fn render_inline(run: &InlineRun) -> String {
        let mut out = String::new();
        let mut in_strong = false;
        for span in run.spans() {
            let bold = span.style.is_bold();
            if bold != in_strong {
                if bold {
                    out.push_str(&format!("<strong class=\"{CLASS_STRONG}\">"));
                } else {
                    out.push_str("</strong>");
                }
                in_strong = bold;
            }
            let text = escape_html(&span.text);
            if span.style.is_italic() {
                out.push_str(&format!("<em class=\"{CLASS_EM}\">{text}</em>"));
            } else {
                out.push_str(&text);
            }
        }
        if in_strong {
            out.push_str("</strong>");
        }
        out
    }
}
