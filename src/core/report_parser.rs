// src/core/report_parser.rs
//! Line scanner for the report Markdown subset.
//!
//! Block rules work line by line: `##`/`###`/`####` headings, `1. ` and `- `
//! list items, blank-line paragraph breaks. Inline rules run per line, bold
//! first, then italics over the result, including the inside of bold spans.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::core::report_ast::{Block, Document, InlineRun, Span, SpanStyle};
use crate::core::report_input::RenderIssue;

lazy_static! {
    static ref HEADING_RE: Regex = Regex::new(r"^(#{2,4}) (.+)$").unwrap();
    static ref ORDERED_ITEM_RE: Regex = Regex::new(r"^([0-9]+)\. (.+)$").unwrap();
    static ref UNORDERED_ITEM_RE: Regex = Regex::new(r"^- (.+)$").unwrap();
}

/// Result of a parse: the tree plus every recovered problem
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub document: Document,
    pub issues: Vec<RenderIssue>,
}

enum LineKind<'a> {
    Blank,
    Heading { level: u8, text: &'a str },
    ListItem { ordered: bool, text: &'a str },
    Text(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(caps) = HEADING_RE.captures(line) {
        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !text.is_empty() {
            let level = caps.get(1).map_or(2, |m| m.as_str().len()) as u8;
            return LineKind::Heading { level, text };
        }
    }
    if let Some(caps) = ORDERED_ITEM_RE.captures(line) {
        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !text.is_empty() {
            return LineKind::ListItem { ordered: true, text };
        }
    }
    if let Some(caps) = UNORDERED_ITEM_RE.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str()).trim();
        if !text.is_empty() {
            return LineKind::ListItem { ordered: false, text };
        }
    }
    LineKind::Text(line.trim())
}

/// Open paragraph / list while scanning
#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    paragraph: Vec<InlineRun>,
    list_items: Vec<InlineRun>,
    list_ordered: bool,
}

impl BlockBuilder {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let lines = std::mem::take(&mut self.paragraph);
            self.blocks.push(Block::Paragraph { lines });
        }
    }

    fn flush_list(&mut self) {
        if !self.list_items.is_empty() {
            let items = std::mem::take(&mut self.list_items);
            self.blocks.push(Block::List { ordered: self.list_ordered, items });
        }
        self.list_ordered = false;
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn push_item(&mut self, ordered: bool, item: InlineRun) {
        self.flush_paragraph();
        // 每个连续列表块独立判断是否有序
        self.list_ordered |= ordered;
        self.list_items.push(item);
    }

    fn push_text_line(&mut self, line: InlineRun) {
        self.flush_list();
        self.paragraph.push(line);
    }

    fn push_heading(&mut self, level: u8, text: InlineRun) {
        self.flush();
        self.blocks.push(Block::Heading { level, text });
    }

    fn finish(mut self) -> Document {
        self.flush();
        Document::new(self.blocks)
    }
}

pub struct ReportParser;

impl ReportParser {
    /// Parse report text into a document. Never fails: malformed markup is
    /// kept as literal text and reported in `issues`.
    pub fn parse(text: &str) -> ParseOutput {
        let mut builder = BlockBuilder::default();
        let mut issues = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            match classify(line) {
                LineKind::Blank => builder.flush(),
                LineKind::Heading { level, text } => {
                    let run = parse_inline(text, line_no, &mut issues);
                    builder.push_heading(level, run);
                }
                LineKind::ListItem { ordered, text } => {
                    let run = parse_inline(text, line_no, &mut issues);
                    builder.push_item(ordered, run);
                }
                LineKind::Text(text) => {
                    let run = parse_inline(text, line_no, &mut issues);
                    builder.push_text_line(run);
                }
            }
        }

        let document = builder.finish();
        // 没有标题或列表时整篇按段落输出
        debug!(
            "Parsed report: {} block(s), {} issue(s), structured: {}",
            document.blocks.len(),
            issues.len(),
            document.has_structure()
        );
        ParseOutput { document, issues }
    }
}

/// Inline pass for a single line
pub fn parse_inline(text: &str, line: usize, issues: &mut Vec<RenderIssue>) -> InlineRun {
    let mut run = InlineRun::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let body = &rest[start + 2..];
        match find_bold_closer(body) {
            Some(end) => {
                push_italics(&mut run, &rest[..start], SpanStyle::Plain, line, issues);
                push_italics(&mut run, &body[..end], SpanStyle::Bold, line, issues);
                rest = &body[end + 2..];
            }
            None => {
                // 后面不会再有 `**`，剩余部分按字面处理
                issues.push(RenderIssue::UnbalancedMarkup { line, marker: "**" });
                break;
            }
        }
    }

    push_italics(&mut run, rest, SpanStyle::Plain, line, issues);
    run
}

/// Closing `**` with at least one character of content before it
fn find_bold_closer(body: &str) -> Option<usize> {
    let first = body.chars().next()?.len_utf8();
    body[first..].find("**").map(|i| i + first)
}

/// Italic pass over one stretch of `outer`-styled text. `**` pairs that reach
/// this point are unmatched bold markers and stay literal.
fn push_italics(run: &mut InlineRun, text: &str, outer: SpanStyle, line: usize, issues: &mut Vec<RenderIssue>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut plain_start = 0;

    while i < bytes.len() {
        if bytes[i] != b'*' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            continue;
        }
        match find_italic_closer(text, i + 1) {
            Some(end) => {
                run.push(Span::new(outer, &text[plain_start..i]));
                run.push(Span::new(outer.with_italic(), &text[i + 1..end]));
                i = end + 1;
                plain_start = i;
            }
            None => {
                issues.push(RenderIssue::UnbalancedMarkup { line, marker: "*" });
                break;
            }
        }
    }

    run.push(Span::new(outer, &text[plain_start..]));
}

fn find_italic_closer(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut j = from + text[from..].chars().next()?.len_utf8();
    while j < bytes.len() {
        if bytes[j] == b'*' {
            if bytes.get(j + 1) == Some(&b'*') {
                j += 2;
                continue;
            }
            return Some(j);
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Document {
        ReportParser::parse(text).document
    }

    fn items_text(block: &Block) -> Vec<String> {
        match block {
            Block::List { items, .. } => items.iter().map(InlineRun::text).collect(),
            other => panic!("expected list, got {:?}", other),
        }
    }

    /// Markdown tokens removed, whitespace collapsed
    fn strip_source(text: &str) -> String {
        let mut out = Vec::new();
        for line in text.lines() {
            let body = match classify(line) {
                LineKind::Blank => "",
                LineKind::Heading { text, .. } => text,
                LineKind::ListItem { text, .. } => text,
                LineKind::Text(text) => text,
            };
            out.push(body.replace('*', ""));
        }
        normalize(&out.join(" "))
    }

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_heading_levels() {
        let doc = parse("## Title\n### Sub\n#### Deep");
        assert_eq!(doc.blocks.len(), 3);
        for (block, (level, text)) in doc.blocks.iter().zip([(2, "Title"), (3, "Sub"), (4, "Deep")]) {
            match block {
                Block::Heading { level: l, text: t } => {
                    assert_eq!(*l, level);
                    assert_eq!(t.text(), text);
                }
                other => panic!("expected heading, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unsupported_heading_levels_stay_text() {
        let doc = parse("# One\n##### Five\n##NoSpace");
        assert_eq!(doc.blocks.len(), 1);
        assert!(!doc.has_structure());
        assert_eq!(doc.plain_text(), "# One\n##### Five\n##NoSpace");
    }

    #[test]
    fn test_bold_and_italic_spans() {
        let doc = parse("**bold** and *italic*");
        match &doc.blocks[0] {
            Block::Paragraph { lines } => {
                assert_eq!(lines.len(), 1);
                assert_eq!(
                    lines[0].spans(),
                    &[Span::bold("bold"), Span::plain(" and "), Span::italic("italic")]
                );
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_bold_runs_before_italic() {
        let mut issues = Vec::new();
        let run = parse_inline("*a **b**", 1, &mut issues);
        assert_eq!(run.spans(), &[Span::plain("*a "), Span::bold("b")]);
        assert_eq!(issues, vec![RenderIssue::UnbalancedMarkup { line: 1, marker: "*" }]);
    }

    #[test]
    fn test_bold_is_non_greedy() {
        let mut issues = Vec::new();
        let run = parse_inline("**a** x **b**", 1, &mut issues);
        assert_eq!(run.spans(), &[Span::bold("a"), Span::plain(" x "), Span::bold("b")]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unbalanced_bold_is_literal() {
        let mut issues = Vec::new();
        let run = parse_inline("lonely ** marker", 4, &mut issues);
        assert_eq!(run.spans(), &[Span::plain("lonely ** marker")]);
        assert_eq!(issues, vec![RenderIssue::UnbalancedMarkup { line: 4, marker: "**" }]);
    }

    #[test]
    fn test_unmatched_bold_not_consumed_by_italic() {
        let mut issues = Vec::new();
        let run = parse_inline("** a *b*", 1, &mut issues);
        assert_eq!(run.spans(), &[Span::plain("** a "), Span::italic("b")]);
    }

    #[test]
    fn test_empty_markers_stay_literal() {
        let mut issues = Vec::new();
        let run = parse_inline("****", 1, &mut issues);
        assert_eq!(run.spans(), &[Span::plain("****")]);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_multibyte_text_inside_markers() {
        let mut issues = Vec::new();
        let run = parse_inline("您擁有**良好的情感表達能力**，*浪漫*。", 1, &mut issues);
        let styles: Vec<SpanStyle> = run.spans().iter().map(|s| s.style).collect();
        assert_eq!(
            styles,
            vec![SpanStyle::Plain, SpanStyle::Bold, SpanStyle::Plain, SpanStyle::Italic, SpanStyle::Plain]
        );
        assert_eq!(run.spans()[1].text, "良好的情感表達能力");
        assert_eq!(run.spans()[3].text, "浪漫");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_italic_inside_bold() {
        let mut issues = Vec::new();
        let run = parse_inline("**bold *x* y** end", 1, &mut issues);
        assert_eq!(
            run.spans(),
            &[Span::bold("bold "), Span::bold_italic("x"), Span::bold(" y"), Span::plain(" end")]
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_lone_star_inside_bold_stays_literal() {
        let mut issues = Vec::new();
        let run = parse_inline("**5 * 3**", 2, &mut issues);
        assert_eq!(run.spans(), &[Span::bold("5 * 3")]);
        assert_eq!(issues, vec![RenderIssue::UnbalancedMarkup { line: 2, marker: "*" }]);
    }

    #[test]
    fn test_ordered_list() {
        let doc = parse("1. a\n2. b");
        assert_eq!(doc.blocks.len(), 1);
        assert!(matches!(doc.blocks[0], Block::List { ordered: true, .. }));
        assert_eq!(items_text(&doc.blocks[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_non_ascii_digits_are_not_list_markers() {
        let doc = parse("１. 全形數字\n٣. arabic-indic");
        assert_eq!(doc.blocks.len(), 1);
        assert!(!doc.has_structure());
        match &doc.blocks[0] {
            Block::Paragraph { lines } => {
                assert_eq!(lines[0].text(), "１. 全形數字");
                assert_eq!(lines[1].text(), "٣. arabic-indic");
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_unordered_list() {
        let doc = parse("- a\n- b");
        assert_eq!(doc.blocks.len(), 1);
        assert!(matches!(doc.blocks[0], Block::List { ordered: false, .. }));
        assert_eq!(items_text(&doc.blocks[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_list_kind_decided_per_block() {
        let doc = parse("1. first\n2. second\n\nbetween\n\n- x\n- y");
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(doc.blocks[0], Block::List { ordered: true, .. }));
        assert!(matches!(doc.blocks[1], Block::Paragraph { .. }));
        assert!(matches!(doc.blocks[2], Block::List { ordered: false, .. }));
    }

    #[test]
    fn test_mixed_adjacent_items_form_one_ordered_block() {
        let doc = parse("- x\n1. y");
        assert_eq!(doc.blocks.len(), 1);
        assert!(matches!(doc.blocks[0], Block::List { ordered: true, .. }));
        assert_eq!(items_text(&doc.blocks[0]), vec!["x", "y"]);
    }

    #[test]
    fn test_list_items_with_inline_markup() {
        let doc = parse("1. **積極參加社交活動**：擴展人際圈");
        match &doc.blocks[0] {
            Block::List { items, .. } => {
                assert_eq!(items[0].spans(), &[Span::bold("積極參加社交活動"), Span::plain("：擴展人際圈")]);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_paragraph_breaks() {
        let doc = parse("para1\n\npara2");
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].text(), "para1");
        assert_eq!(doc.blocks[1].text(), "para2");
    }

    #[test]
    fn test_single_newline_is_line_break() {
        let doc = parse("line one\nline two");
        match &doc.blocks[0] {
            Block::Paragraph { lines } => assert_eq!(lines.len(), 2),
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_heading_closes_paragraph_and_list() {
        let doc = parse("intro\n- a\n## Next\ntail");
        assert_eq!(doc.blocks.len(), 4);
        assert!(matches!(doc.blocks[0], Block::Paragraph { .. }));
        assert!(matches!(doc.blocks[1], Block::List { ordered: false, .. }));
        assert!(matches!(doc.blocks[2], Block::Heading { level: 2, .. }));
        assert!(matches!(doc.blocks[3], Block::Paragraph { .. }));
    }

    #[test]
    fn test_crlf_input() {
        let doc = parse("## 標題\r\n\r\n內容\r\n");
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].text(), "標題");
        assert_eq!(doc.blocks[1].text(), "內容");
    }

    #[test]
    fn test_token_free_text_is_single_paragraph() {
        let samples = ["hello world", "  padded  text ", "在這個充滿希望的時刻", "a - b 1.5 c"];
        for sample in samples {
            let doc = parse(sample);
            assert_eq!(doc.blocks.len(), 1, "sample: {:?}", sample);
            assert!(matches!(doc.blocks[0], Block::Paragraph { .. }));
            assert_eq!(normalize(&doc.plain_text()), normalize(sample));
        }
    }

    #[test]
    fn test_prose_is_preserved() {
        let samples = [
            "## 命盤整體印象\n\n在這個充滿希望的時刻，評分為7分。\n\n### 詳細分析\n\n您擁有**良好的情感表達能力**。",
            "1. **積極參加社交活動**：擴展人際圈\n2. *保持開放心態*\n- 提升自我修養",
            "**bold *x* y** and *z*\n- **重點 *提示* 內容**",
            "x\n\n\n\ny",
        ];
        for sample in samples {
            let out = ReportParser::parse(sample);
            assert!(out.issues.is_empty(), "sample: {:?}", sample);
            assert!(!out.document.plain_text().contains('*'), "sample: {:?}", sample);
            assert_eq!(normalize(&out.document.plain_text()), strip_source(sample), "sample: {:?}", sample);
        }
    }

    #[test]
    fn test_unbalanced_markers_keep_prose() {
        let samples = ["broken **bold and *italic\nnext ** line *", "***triple*** and ****"];
        for sample in samples {
            let out = ReportParser::parse(sample);
            assert!(!out.issues.is_empty(), "sample: {:?}", sample);
            // unmatched markers stay in the output as literal text
            assert_eq!(
                normalize(&out.document.plain_text().replace('*', "")),
                strip_source(sample),
                "sample: {:?}",
                sample
            );
        }
    }

    #[test]
    fn test_empty_text_has_no_blocks() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }
}
