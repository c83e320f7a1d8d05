// src/services/mcp.rs
//! 紫微斗数工具桩 (stdio tool stub)
//!
//! Line-delimited JSON-RPC 2.0 on stdin/stdout. Exposes a single
//! `ziwei_chart` tool that answers with a canned chart; no real chart
//! computation happens here. stdout carries protocol frames only.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::core::form::{BirthData, BirthHour, Gender};

pub const SERVER_NAME: &str = "ziwei-mcp-server";
pub const SERVER_VERSION: &str = "1.0.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const CHART_TOOL: &str = "ziwei_chart";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Arguments of `ziwei_chart`; the hour accepts `午` or `午時`
#[derive(Debug, Deserialize)]
struct ChartArgs {
    gender: String,
    birth_year: i32,
    birth_month: u32,
    birth_day: u32,
    birth_hour: String,
}

impl ChartArgs {
    fn into_birth_data(self) -> Result<BirthData> {
        let data = BirthData {
            gender: Gender::parse(&self.gender)?,
            birth_year: self.birth_year,
            birth_month: self.birth_month,
            birth_day: self.birth_day,
            birth_hour: BirthHour::parse(&self.birth_hour)?,
        };
        data.validate()?;
        Ok(data)
    }
}

#[derive(Debug, Default, Clone)]
pub struct McpServer;

impl McpServer {
    pub fn new() -> Self {
        Self
    }

    pub fn tools(&self) -> Vec<McpTool> {
        vec![McpTool {
            name: CHART_TOOL.to_string(),
            description: "獲取紫微斗數命盤".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "gender": { "type": "string", "enum": ["男", "女"], "description": "性別" },
                    "birth_year": { "type": "integer", "description": "出生年份", "minimum": 1900, "maximum": 2100 },
                    "birth_month": { "type": "integer", "description": "出生月份", "minimum": 1, "maximum": 12 },
                    "birth_day": { "type": "integer", "description": "出生日期", "minimum": 1, "maximum": 31 },
                    "birth_hour": {
                        "type": "string",
                        "description": "出生時辰（子、丑、寅、卯、辰、巳、午、未、申、酉、戌、亥）"
                    }
                },
                "required": ["gender", "birth_year", "birth_month", "birth_day", "birth_hour"]
            }),
        }]
    }

    /// Handle one input line. Returns `None` for notifications.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("Unparsable JSON-RPC frame: {}", e);
                return Some(error_frame(Value::Null, RpcError::new(PARSE_ERROR, format!("Parse error: {}", e))));
            }
        };

        // 没有 `id` 字段才是通知；`"id": null` 仍需回复
        let is_notification = raw.get("id").is_none();

        let request: RpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                return Some(error_frame(
                    Value::Null,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ))
            }
        };

        if is_notification {
            debug!("JSON-RPC notification <- {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        debug!("JSON-RPC <- {} (id {})", request.method, id);

        Some(match self.dispatch(&request.method, &request.params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(err) => error_frame(id, err),
        })
    }

    fn dispatch(&self, method: &str, params: &Value) -> std::result::Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools() })),
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                self.call_tool(name, args)
                    .map_err(|e| RpcError::new(INTERNAL_ERROR, format!("Tool execution failed: {}", e)))
            }
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }

    pub fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        match name {
            CHART_TOOL => {
                let chart_args: ChartArgs = serde_json::from_value(args)
                    .map_err(|e| anyhow!("Invalid arguments: {}", e))?;
                let birth = chart_args.into_birth_data()?;
                let text = serde_json::to_string_pretty(&canned_chart(&birth))?;
                Ok(json!({ "content": [{ "type": "text", "text": text }] }))
            }
            other => Err(anyhow!("Unknown tool: {}", other)),
        }
    }

    /// Serve until stdin closes
    pub async fn run_stdio(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        info!("Ziwei MCP Server running on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(&line) {
                let mut frame = serde_json::to_string(&reply)?;
                frame.push('\n');
                stdout.write_all(frame.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, MCP server exiting");
        Ok(())
    }
}

fn error_frame(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code, "message": err.message }
    })
}

fn canned_chart(birth: &BirthData) -> Value {
    json!({
        "success": true,
        "message": "紫微斗數命盤生成成功",
        "data": {
            "gender": birth.gender.as_str(),
            "birth_date": birth.describe(),
            "main_star": "紫微星",
            "palace": {
                "命宮": ["紫微", "天機"],
                "財帛": ["武曲", "天同"],
                "兄弟": ["太陽", "巨門"],
                "夫妻": ["天王", "貪狼"]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(server: &McpServer, frame: Value) -> Value {
        server.handle_line(&frame.to_string()).expect("expected a reply")
    }

    #[test]
    fn test_initialize() {
        let server = McpServer::new();
        let reply = call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}));
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["serverInfo"]["name"], "ziwei-mcp-server");
        assert_eq!(reply["result"]["serverInfo"]["version"], "1.0.0");
        assert!(reply["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_tools_list() {
        let server = McpServer::new();
        let reply = call(&server, json!({"jsonrpc": "2.0", "id": "list_1", "method": "tools/list"}));
        let tools = reply["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "ziwei_chart");
        assert_eq!(tools[0]["inputSchema"]["required"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_tools_call_returns_text_content() {
        let server = McpServer::new();
        let reply = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {
                    "name": "ziwei_chart",
                    "arguments": {
                        "gender": "女",
                        "birth_year": 1990,
                        "birth_month": 5,
                        "birth_day": 15,
                        "birth_hour": "午"
                    }
                }
            }),
        );
        let content = &reply["result"]["content"][0];
        assert_eq!(content["type"], "text");

        let chart: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(chart["success"], true);
        assert_eq!(chart["data"]["birth_date"], "1990年5月15日午時");
        assert_eq!(chart["data"]["palace"]["命宮"][0], "紫微");
    }

    #[test]
    fn test_invalid_arguments_are_internal_errors() {
        let server = McpServer::new();
        let reply = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": {"name": "ziwei_chart", "arguments": {"gender": "女", "birth_year": 1800}}
            }),
        );
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR);
        assert!(reply["error"]["message"].as_str().unwrap().starts_with("Tool execution failed"));
    }

    #[test]
    fn test_unknown_tool() {
        let server = McpServer::new();
        let reply = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 9, "method": "tools/call", "params": {"name": "tarot"}}),
        );
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR);
        assert!(reply["error"]["message"].as_str().unwrap().contains("Unknown tool: tarot"));
    }

    #[test]
    fn test_unknown_method_and_bad_json() {
        let server = McpServer::new();
        let reply = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}));
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);

        let reply = server.handle_line("{not json").unwrap();
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
        assert!(reply["id"].is_null());
    }

    #[test]
    fn test_notifications_get_no_reply() {
        let server = McpServer::new();
        let frame = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_line(&frame.to_string()).is_none());
    }

    #[test]
    fn test_null_id_still_gets_reply() {
        let server = McpServer::new();
        let reply = call(&server, json!({"jsonrpc": "2.0", "id": null, "method": "ping"}));
        assert!(reply["id"].is_null());
        assert!(reply.as_object().unwrap().contains_key("id"));
        assert_eq!(reply["result"], json!({}));
    }
}
