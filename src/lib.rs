// src/lib.rs

// ============================================================================
// 模块定义 (Modules)
// ============================================================================

pub mod core;

#[cfg(not(target_arch = "wasm32"))]
pub mod services;

#[cfg(not(target_arch = "wasm32"))]
pub mod ui;

// ============================================================================
// 公共导出 (Public Exports)
// ============================================================================

pub use crate::core::form::{AnalysisRequest, AnalysisResponse, BirthData, BirthHour, Domain, Gender};
pub use crate::core::report_ast::{Block, Document, InlineRun, Span, SpanStyle};
pub use crate::core::report_input::{RawReport, RenderIssue, Report, DEFAULT_PLACEHOLDER};
pub use crate::core::report_parser::ReportParser;
pub use crate::core::report_renderer::HtmlRenderer;
pub use crate::core::view_state::{ViewFlow, ViewState};

#[cfg(not(target_arch = "wasm32"))]
pub use crate::services::backend::AnalysisClient;

#[cfg(not(target_arch = "wasm32"))]
pub use crate::services::config::ZiweiConfig;

#[cfg(not(target_arch = "wasm32"))]
pub use crate::services::mcp::McpServer;

// ============================================================================
// WASM 专用接口 (仅在 wasm32 目标时编译)
// ============================================================================

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct ReportEngine {
    placeholder: String,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl ReportEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn set_placeholder(&mut self, placeholder: &str) {
        self.placeholder = placeholder.to_string();
    }

    /// Render the `result` field of a backend response (JSON text) to HTML
    pub fn render_html(&self, response_json: &str) -> Result<String, JsValue> {
        let value: serde_json::Value = serde_json::from_str(response_json)
            .map_err(|e| JsValue::from_str(&format!("JSON Error: {}", e)))?;
        Ok(Report::from_value(value.get("result"), &self.placeholder).html)
    }

    /// Render raw report text to HTML
    pub fn render_text(&self, text: &str) -> String {
        Report::from_text(text, &self.placeholder).html
    }

    /// Parse raw report text into the document tree
    pub fn parse_tree(&self, text: &str) -> Result<JsValue, JsValue> {
        let report = Report::from_text(text, &self.placeholder);
        serde_wasm_bindgen::to_value(&report.document).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
