// src/main.rs
#![cfg(not(target_arch = "wasm32"))]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;

use ziwei_view::core::form::{AnalysisRequest, BirthData, BirthHour, Domain, Gender};
use ziwei_view::core::report_input::Report;
use ziwei_view::core::view_state::{ViewFlow, ViewState};
use ziwei_view::services::backend::AnalysisClient;
use ziwei_view::services::config::ZiweiConfig;
use ziwei_view::services::mcp::McpServer;
use ziwei_view::services::web_server;
use ziwei_view::ui::render::{render_document, show_disclaimer, show_issues, show_result_header};

#[derive(Parser)]
#[command(name = "ziwei", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Styled markup with stable class names
    Html,
    /// Parsed document tree as JSON
    Tree,
    /// Coloured terminal output
    Terminal,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report from a file (or stdin)
    Render {
        /// Report file; reads stdin when omitted
        file: Option<PathBuf>,
        /// Input is a backend response; render its `result` field
        #[arg(long)]
        json: bool,
        #[arg(long, value_enum, default_value = "html")]
        format: OutputFormat,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Request an analysis from the backend and render it
    Analyze {
        /// 男 / 女
        #[arg(long)]
        gender: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        day: u32,
        /// Earthly branch, e.g. 子 or 子時
        #[arg(long)]
        hour: String,
        /// love, wealth or future
        #[arg(long, default_value = "love")]
        domain: String,
        /// Override the backend base URL
        #[arg(long)]
        backend: Option<String>,
        #[arg(long, value_enum, default_value = "terminal")]
        format: OutputFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the local web server
    Web {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
    },
    /// Run the ziwei_chart tool stub on stdio
    Mcp,
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read report file: {:?}", path)),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn emit(report: &Report, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let text = match format {
        OutputFormat::Html => report.html.clone(),
        OutputFormat::Tree => serde_json::to_string_pretty(&report.document)?,
        OutputFormat::Terminal => {
            if output.is_some() {
                return Err(anyhow!("Terminal format cannot be written to a file"));
            }
            render_document(&report.document);
            show_issues(&report.issues);
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn handle_render(file: Option<&Path>, json: bool, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let config = ZiweiConfig::load()?;
    let input = read_input(file)?;

    let report = if json {
        let value: Value = serde_json::from_str(&input).context("Input is not valid JSON")?;
        Report::from_value(value.get("result"), &config.render.placeholder)
    } else {
        Report::from_text(&input, &config.render.placeholder)
    };

    emit(&report, format, output)
}

async fn handle_analyze(
    birth_data: BirthData,
    domain: &str,
    backend: Option<String>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = ZiweiConfig::load()?;
    if let Some(url) = backend {
        config.backend.base_url = url;
    }

    let mut request = AnalysisRequest::new(birth_data, Domain::find(domain)?);
    request.output_format = config.backend.output_format.clone();
    request.show_agent_process = config.backend.show_agent_process;

    let client = AnalysisClient::new(&config.backend)?;
    let mut flow = ViewFlow::new(config.render.placeholder.clone());
    flow.submit(request.clone())?;

    match client.analyze(&request).await {
        Ok(response) => {
            flow.complete(response)?;
        }
        Err(e) => {
            flow.fail(format!("{:#}", e))?;
        }
    }

    match flow.state() {
        ViewState::Result { domain, report, processing_time, architecture } => {
            if matches!(format, OutputFormat::Terminal) {
                show_result_header(domain, *processing_time, architecture.as_deref());
                emit(report, format, output)?;
                show_disclaimer();
                Ok(())
            } else {
                emit(report, format, output)
            }
        }
        ViewState::Form { last_error } => Err(anyhow!(
            "分析失敗: {}",
            last_error.as_deref().unwrap_or("unknown error")
        )),
        ViewState::Loading { .. } => Err(anyhow!("Analysis did not complete")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ziwei_view=info,ziwei=info,tower_http=info"));

    // stdout 留给渲染结果和 MCP 协议帧
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { file, json, format, output } => {
            handle_render(file.as_deref(), json, format, output.as_deref())?;
        }
        Commands::Analyze { gender, year, month, day, hour, domain, backend, format, output } => {
            let birth_data = BirthData {
                gender: Gender::parse(&gender)?,
                birth_year: year,
                birth_month: month,
                birth_day: day,
                birth_hour: BirthHour::parse(&hour)?,
            };
            handle_analyze(birth_data, &domain, backend, format, output.as_deref()).await?;
        }
        Commands::Web { port, host } => {
            // CLI > Config > Default
            let config = ZiweiConfig::load()?;
            let final_host = host.unwrap_or_else(|| config.server.host.clone());
            let final_port = port.unwrap_or(config.server.port);
            web_server::start_web_server(final_host, final_port, &config).await?;
        }
        Commands::Mcp => {
            McpServer::new().run_stdio().await?;
        }
    }

    Ok(())
}
