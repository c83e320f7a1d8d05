// src/core/report_input.rs
//! 报告输入归一化 (Raw report normalisation)
//!
//! The backend's `result` field is usually a string but is not guaranteed to
//! be one. Everything here recovers instead of failing; what was recovered is
//! reported as a `RenderIssue`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::report_ast::Document;
use crate::core::report_parser::ReportParser;
use crate::core::report_renderer::HtmlRenderer;

/// Shown when there is no report text at all
pub const DEFAULT_PLACEHOLDER: &str = "暫無分析結果";

/// Problems the renderer recovered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderIssue {
    #[error("report was a JSON {found} instead of a string; rendered its serialized form")]
    InputTypeAnomaly { found: &'static str },

    #[error("report was missing or empty; rendered the placeholder")]
    EmptyInput,

    #[error("line {line}: unmatched '{marker}' rendered literally")]
    UnbalancedMarkup { line: usize, marker: &'static str },
}

/// Report text after coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReport {
    Text(String),
    Coerced { text: String, found: &'static str },
    Empty,
}

impl RawReport {
    /// Coerce an optional JSON value into report text
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawReport::Empty,
            Some(Value::String(s)) => Self::from_text(s),
            Some(other) => {
                let found = json_kind(other);
                let text = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
                RawReport::Coerced { text, found }
            }
        }
    }

    pub fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            RawReport::Empty
        } else {
            RawReport::Text(text.to_string())
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RawReport::Text(text) | RawReport::Coerced { text, .. } => Some(text),
            RawReport::Empty => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A rendered report: tree, markup and diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub document: Document,
    pub html: String,
    pub issues: Vec<RenderIssue>,
}

impl Report {
    pub fn from_value(value: Option<&Value>, placeholder: &str) -> Self {
        Self::from_raw(RawReport::from_value(value), placeholder)
    }

    pub fn from_text(text: &str, placeholder: &str) -> Self {
        Self::from_raw(RawReport::from_text(text), placeholder)
    }

    pub fn from_raw(raw: RawReport, placeholder: &str) -> Self {
        let mut issues = Vec::new();

        let document = match raw {
            RawReport::Empty => {
                issues.push(RenderIssue::EmptyInput);
                Document::placeholder(placeholder)
            }
            RawReport::Coerced { text, found } => {
                issues.push(RenderIssue::InputTypeAnomaly { found });
                let parsed = ReportParser::parse(&text);
                issues.extend(parsed.issues);
                parsed.document
            }
            RawReport::Text(text) => {
                let parsed = ReportParser::parse(&text);
                issues.extend(parsed.issues);
                parsed.document
            }
        };

        for issue in &issues {
            debug!("Report render recovered: {}", issue);
        }

        let html = HtmlRenderer::render(&document);
        Self { document, html, issues }
    }
}
