// src/ui/render.rs
//! Terminal rendering of a report document and result summary

use ::crossterm::style::{StyledContent, Stylize};

use crate::core::form::Domain;
use crate::core::report_ast::{Block, Document, InlineRun, SpanStyle};
use crate::core::report_input::RenderIssue;

/// 将 InlineRun 转为带样式的终端文本
fn styled_inline(run: &InlineRun) -> String {
    run.spans()
        .iter()
        .map(|span| match span.style {
            SpanStyle::Plain => span.text.clone(),
            SpanStyle::Bold => span.text.as_str().bold().yellow().to_string(),
            SpanStyle::Italic => span.text.as_str().italic().cyan().to_string(),
            SpanStyle::BoldItalic => span.text.as_str().bold().italic().yellow().to_string(),
        })
        .collect()
}

fn heading(level: u8, text: String) -> StyledContent<String> {
    match level {
        2 => text.bold().magenta(),
        3 => text.bold().blue(),
        _ => text.bold(),
    }
}

/// Document as styled terminal lines
pub fn document_lines(document: &Document) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, block) in document.blocks.iter().enumerate() {
        if idx > 0 {
            lines.push(String::new());
        }
        match block {
            Block::Heading { level, text } => {
                lines.push(heading(*level, styled_inline(text)).to_string());
            }
            Block::Paragraph { lines: para } => {
                lines.extend(para.iter().map(styled_inline));
            }
            Block::List { ordered, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = if *ordered { format!("{}.", n + 1) } else { "•".to_string() };
                    lines.push(format!("  {} {}", marker.dark_grey(), styled_inline(item)));
                }
            }
        }
    }
    lines
}

/// 渲染报告文档（带颜色和格式）
pub fn render_document(document: &Document) {
    for line in document_lines(document) {
        println!("{}", line);
    }
}

/// 显示结果摘要
pub fn show_result_header(domain: &Domain, processing_time: Option<f64>, architecture: Option<&str>) {
    println!();
    println!("{} {}", domain.icon, format!("您的{}分析結果", domain.name).bold());
    if let Some(secs) = processing_time {
        println!("  {} {:.2}秒", "處理時間:".dark_grey(), secs);
    }
    if let Some(arch) = architecture {
        println!("  {} {}", "架構:".dark_grey(), arch);
    }
    println!();
}

/// Recovered renderer issues go to stderr
pub fn show_issues(issues: &[RenderIssue]) {
    for issue in issues {
        eprintln!("  {} {}", "⚠".yellow(), issue.to_string().dark_grey());
    }
}

pub fn show_disclaimer() {
    println!();
    println!(
        "{}",
        "⚠️ 本分析結果僅供參考，不應作為人生重大決策的唯一依據。".italic().dark_grey()
    );
}
