// src/services/web_server.rs
#![cfg(not(target_arch = "wasm32"))]

use axum::{
    extract::Extension,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::form::{birth_hour_options, download_filename, AnalysisRequest, DOMAINS};
use crate::core::report_ast::Document;
use crate::core::report_input::{RenderIssue, Report};
use crate::core::report_renderer::escape_html;
use crate::services::backend::AnalysisClient;
use crate::services::config::ZiweiConfig;

struct WebState {
    client: AnalysisClient,
    placeholder: String,
    start_time: Instant,
    start_datetime: DateTime<Utc>,
    host: String,
    port: u16,
}

#[derive(Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Serialize)]
pub struct RenderResponse {
    pub html: String,
    pub document: Document,
    pub issues: Vec<RenderIssue>,
}

impl From<Report> for RenderResponse {
    fn from(report: Report) -> Self {
        Self {
            html: report.html,
            document: report.document,
            issues: report.issues,
        }
    }
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub rendered: Option<RenderResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_name: Option<String>,
}

impl AnalyzeResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            rendered: None,
            metadata: None,
            architecture: None,
            download_name: None,
        }
    }
}

// 格式化运行时长
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    let s = secs % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, mins, s)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, mins, s)
    } else if mins > 0 {
        format!("{}m {}s", mins, s)
    } else {
        format!("{}s", s)
    }
}

/// Dashboard 页面
async fn dashboard(Extension(state): Extension<Arc<WebState>>) -> Html<String> {
    let uptime = format_uptime(state.start_time.elapsed().as_secs());

    let domains_html: String = DOMAINS
        .iter()
        .map(|d| {
            format!(
                "    {} {} ({}) - {}\n",
                d.icon,
                escape_html(d.name),
                d.id,
                escape_html(d.description)
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Ziwei View</title></head>
<body>
<pre>
Ziwei View v{version}

  Listening: http://{host}:{port}
  Started:   {started}
  Uptime:    {uptime}
  Backend:   {backend}

Domains:
{domains}
Endpoints:
    GET  /api/domains
    GET  /api/birth-hours
    POST /api/render
    POST /api/analyze
</pre>
</body>
</html>"#,
        version = env!("CARGO_PKG_VERSION"),
        host = escape_html(&state.host),
        port = state.port,
        started = state.start_datetime.to_rfc3339(),
        uptime = uptime,
        backend = escape_html(state.client.base_url()),
        domains = domains_html,
    ))
}

async fn list_domains() -> Json<Value> {
    Json(json!({ "domains": DOMAINS }))
}

async fn list_birth_hours() -> Json<Value> {
    Json(json!({ "hours": birth_hour_options() }))
}

async fn handle_render(
    Extension(state): Extension<Arc<WebState>>,
    Json(req): Json<RenderRequest>,
) -> Json<RenderResponse> {
    let report = Report::from_value(req.result.as_ref(), &state.placeholder);
    Json(report.into())
}

async fn handle_analyze(
    Extension(state): Extension<Arc<WebState>>,
    Json(req): Json<AnalysisRequest>,
) -> Json<AnalyzeResponse> {
    let domain = match req.validate() {
        Ok(d) => d,
        Err(e) => {
            warn!("Rejected analysis request: {}", e);
            return Json(AnalyzeResponse::failure(e.to_string()));
        }
    };

    let response = match state.client.analyze(&req).await {
        Ok(r) => r,
        Err(e) => {
            error!("❌ Analysis request failed: {:#}", e);
            return Json(AnalyzeResponse::failure(format!("{:#}", e)));
        }
    };

    if !response.success {
        let message = response.error.unwrap_or_else(|| "分析失敗".to_string());
        warn!("Backend reported failure: {}", message);
        return Json(AnalyzeResponse::failure(message));
    }

    let report = Report::from_value(response.result.as_ref(), &state.placeholder);
    info!(
        "✅ Rendered {} analysis: {} block(s), {} issue(s)",
        domain.id,
        report.document.blocks.len(),
        report.issues.len()
    );

    Json(AnalyzeResponse {
        success: true,
        error: None,
        rendered: Some(report.into()),
        metadata: response.metadata,
        architecture: response.architecture,
        download_name: Some(download_filename(domain, Local::now().date_naive())),
    })
}

fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/domains", get(list_domains))
        .route("/api/birth-hours", get(list_birth_hours))
        .route("/api/render", post(handle_render))
        .route("/api/analyze", post(handle_analyze))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(host: String, port: u16, config: &ZiweiConfig) -> anyhow::Result<()> {
    let client = AnalysisClient::new(&config.backend)?;
    let state = Arc::new(WebState {
        client,
        placeholder: config.render.placeholder.clone(),
        start_time: Instant::now(),
        start_datetime: Utc::now(),
        host: host.clone(),
        port,
    });

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("🌐 Ziwei view server listening on http://{}", addr);
    info!("   Analysis backend: {}", config.backend.base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3_725), "1h 2m 5s");
        assert_eq!(format_uptime(90_061), "1d 1h 1m 1s");
    }

    #[tokio::test]
    async fn test_render_handler() {
        let state = Arc::new(WebState {
            client: AnalysisClient::new(&Default::default()).unwrap(),
            placeholder: "暫無分析結果".to_string(),
            start_time: Instant::now(),
            start_datetime: Utc::now(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        });

        let Json(resp) = handle_render(
            Extension(state.clone()),
            Json(RenderRequest { result: Some(json!("## 標題\n<b>x</b>")) }),
        )
        .await;
        assert_eq!(resp.document.blocks.len(), 2);
        assert!(resp.html.contains("&lt;b&gt;"));

        let Json(resp) = handle_render(Extension(state), Json(RenderRequest { result: None })).await;
        assert_eq!(resp.html, "<p class=\"md-p\">暫無分析結果</p>");
        assert_eq!(resp.issues, vec![RenderIssue::EmptyInput]);
    }

    #[test]
    fn test_failure_serialization_omits_render_fields() {
        let value = serde_json::to_value(AnalyzeResponse::failure("boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}
