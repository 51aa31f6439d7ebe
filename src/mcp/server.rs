//! MCP Server over stdio
//!
//! Reads one JSON-RPC message per line, dispatches it, and writes one
//! response per line. Messages are handled sequentially in arrival order.
//! Nothing but responses is ever written to the output stream.

use super::protocol::{
    InitializeParams, InitializeResult, McpError, McpMethod, McpRequest, McpResponse, ServerInfo,
    ToolCallParams, DEFAULT_PROTOCOL_VERSION,
};
use crate::tools::{ToolError, ToolRegistry};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// MCP server exposing a [`ToolRegistry`]
pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve until the input reaches EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "MCP server '{}' v{} ready with {} tools",
            self.info.name,
            self.info.version,
            self.registry.len()
        );

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .context("Failed to read from MCP client")?;
            if read == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_message(line).await,
                Err(e) => {
                    warn!("Message is not valid UTF-8: {}", e);
                    Some(McpResponse::err(
                        Value::Null,
                        McpError::parse_error(format!("Parse error: {}", e)),
                    ))
                }
            };
            let Some(response) = response else {
                continue;
            };

            let mut json =
                serde_json::to_string(&response).context("Failed to serialize response")?;
            json.push('\n');
            writer
                .write_all(json.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }

        info!("Input closed, shutting down MCP server");
        Ok(())
    }

    /// Handle one raw line; `None` when no response is due
    pub async fn handle_message(&self, line: &str) -> Option<McpResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                return Some(McpResponse::err(
                    Value::Null,
                    McpError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: McpRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request: {}", e);
                return Some(McpResponse::err(
                    id,
                    McpError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };

        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        debug!("Request {}: {}", id, request.method);
        let response = match self.dispatch(&request).await {
            Ok(result) => McpResponse::ok(id, result),
            Err(error) => McpResponse::err(id, error),
        };
        Some(response)
    }

    async fn dispatch(&self, request: &McpRequest) -> Result<Value, McpError> {
        let params = request.params.clone().unwrap_or(Value::Null);

        match McpMethod::from(request.method.as_str()) {
            McpMethod::Initialize => self.initialize(params),
            McpMethod::Ping => Ok(json!({})),
            McpMethod::ToolsList => Ok(json!({ "tools": self.registry.definitions() })),
            McpMethod::ToolsCall => self.call_tool(params).await,
            McpMethod::Initialized | McpMethod::Custom(_) => {
                Err(McpError::method_not_found(&request.method))
            }
        }
    }

    fn initialize(&self, params: Value) -> Result<Value, McpError> {
        let params: InitializeParams = serde_json::from_value(params).unwrap_or_default();
        let protocol_version = params
            .protocol_version
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());
        info!("Client initialized with protocol version {}", protocol_version);

        let result = InitializeResult {
            protocol_version,
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.info.clone(),
        };
        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string()))
    }

    async fn call_tool(&self, params: Value) -> Result<Value, McpError> {
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| McpError::invalid_params(format!("Invalid tool call params: {}", e)))?;

        info!("Calling tool: {}", params.name);
        match self.registry.call(&params.name, params.arguments).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .map_err(|e| McpError::internal_error(e.to_string()))?;
                Ok(json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": result,
                    "isError": false,
                }))
            }
            Err(error) => {
                match &error {
                    ToolError::UnknownTool(_) => warn!("{}", error),
                    _ => warn!("Tool '{}' rejected its arguments: {}", params.name, error),
                }
                Ok(json!({
                    "content": [{ "type": "text", "text": error.to_string() }],
                    "isError": true,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::ScriptedRunner;
    use crate::tools::{HelloWorldTool, ToolSettings};

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(HelloWorldTool);
        McpServer::new(registry, "Test Server")
    }

    async fn request(server: &McpServer, message: Value) -> McpResponse {
        server
            .handle_message(&message.to_string())
            .await
            .expect("response expected")
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let server = server();
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "capabilities": {}}}),
        )
        .await;

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["serverInfo"]["name"], "Test Server");
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_initialize_default_protocol_version() {
        let server = server();
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        assert_eq!(resp.result.unwrap()["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_message(&note.to_string()).await.is_none());

        let null_id = json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"});
        assert!(server.handle_message(&null_id.to_string()).await.is_none());

        assert!(server.handle_message("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_ping_and_string_id() {
        let server = server();
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": "req-7", "method": "ping"})).await;
        assert_eq!(resp.id, json!("req-7"));
        assert_eq!(resp.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server();
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;

        let tools = resp.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "hello_world");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_wraps_result() {
        let server = server();
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "hello_world", "arguments": {}}}),
        )
        .await;

        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["structuredContent"]["status"], "success");

        let text: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(text, result["structuredContent"]);
    }

    #[tokio::test]
    async fn test_tools_call_tool_errors() {
        let runner = ScriptedRunner::new();
        let server = McpServer::new(
            ToolRegistry::with_default_tools(runner.clone(), ToolSettings::default()),
            "Test Server",
        );

        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "block_attack", "arguments": {"attack_type": "Nope"}}}),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Must start with 'Block'"));

        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"name": "no_such_tool"}}),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Unknown tool: no_such_tool");

        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();

        let resp = server.handle_message("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, -32700);

        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
        assert_eq!(resp.id, json!(6));
        assert_eq!(resp.error.unwrap().code, -32601);

        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 8})).await;
        assert_eq!(resp.id, json!(8));
        assert_eq!(resp.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let server = server();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#);
        input.push(b'\n');
        let mut output = Vec::new();

        server.serve(&input[..], &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], Value::Null);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert_eq!(lines[1]["id"], 9);
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_last_line_without_newline() {
        let server = server();
        let input = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        let server = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"], json!({}));
    }
}
