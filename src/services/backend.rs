// src/services/backend.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::form::{AnalysisRequest, AnalysisResponse};
use crate::services::config::BackendConfig;

/// 分析后端客户端：单次请求/响应，不做重试
#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for the analysis backend")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url)
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let request_id = Uuid::new_v4();
        let url = self.analyze_url();
        info!(
            "🔮 [{}] Requesting {} analysis for {}",
            request_id,
            request.domain_type,
            request.birth_data.describe()
        );

        let res = self
            .http
            .post(&url)
            .header("X-Request-ID", request_id.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("Connection to analysis backend failed: {}", e))?;
        let status = res.status();

        if !status.is_success() {
            let err_body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Analysis backend returned {}: {}", status, err_body));
        }

        let body: AnalysisResponse = res
            .json()
            .await
            .map_err(|_| anyhow!("Analysis backend returned non-JSON response (Status {})", status))?;

        debug!(
            "[{}] Backend replied success={} in {:?}s",
            request_id,
            body.success,
            body.processing_time()
        );
        Ok(body)
    }
}
