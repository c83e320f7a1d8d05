// src/services/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::form::DEFAULT_OUTPUT_FORMAT;
use crate::core::report_input::DEFAULT_PLACEHOLDER;

pub const CONFIG_FILE: &str = "ziwei.toml";
pub const BACKEND_URL_ENV: &str = "ZIWEI_BACKEND_URL";

/// 分析后端配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub show_agent_process: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderConfig {
    /// 无结果时显示的占位文字
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    3000
}
fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            output_format: default_output_format(),
            show_agent_process: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { placeholder: default_placeholder() }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ZiweiConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl ZiweiConfig {
    /// Load `ziwei.toml` from the working directory, falling back to defaults.
    /// `ZIWEI_BACKEND_URL` overrides the backend URL either way.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Backend URL overridden by {}", BACKEND_URL_ENV);
                config.backend.base_url = url;
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!("✓ Config loaded, backend: {}", config.backend.base_url);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
