//! MCP Protocol Types (JSON-RPC 2.0)
//!
//! This module defines the protocol types the server reads and writes.
//! MCP is built on top of JSON-RPC 2.0, a simple stateless RPC protocol.
//!
//! # Protocol Specification
//!
//! - JSON-RPC 2.0: <https://www.jsonrpc.org/specification>
//! - MCP Spec: <https://modelcontextprotocol.io/specification/2024-11-05>
//!
//! The protocol layer only covers serialization. Reading and writing lines
//! is handled by the server loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version reported when the client does not send one
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC 2.0 request or notification
///
/// Requests carry an `id` (number or string) that the response echoes.
/// Notifications have no `id` and are never answered.
///
/// # Example
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "id": 1,
///   "method": "tools/list",
///   "params": {}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier, absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Method name to invoke
    pub method: String,

    /// Method parameters (optional, depends on method)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpRequest {
    /// Create a new request
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no id, no response expected)
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Notifications must not be answered
    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }
}

/// A JSON-RPC 2.0 response message
///
/// A response either contains a `result` or an `error`, but never both.
///
/// # Example (Error)
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "id": 1,
///   "error": {"code": -32601, "message": "Method not found: foo"}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier; `null` when the request could not be parsed
    pub id: Value,

    /// Result payload (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    /// Create a successful response
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Check if the response is successful
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }
}

/// A JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpError {
    /// Error code
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error (-32700): Invalid JSON was received
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    /// Invalid request (-32600): The JSON sent is not a valid Request object
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid params (-32602)
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    /// Internal error (-32603)
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Error {}] {}", self.code, self.message)
    }
}

impl std::error::Error for McpError {}

/// MCP methods the server understands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    /// Initialize the connection (must be called first)
    Initialize,

    /// Client finished initialization (notification)
    Initialized,

    /// Liveness check
    Ping,

    /// List available tools
    ToolsList,

    /// Call a specific tool
    ToolsCall,

    /// Anything else
    Custom(String),
}

impl McpMethod {
    /// Convert to string for JSON-RPC method field
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::Ping => "ping",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            _ => Self::Custom(s.to_string()),
        }
    }
}

/// Parameters of `initialize`; only the protocol version is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
}

/// Result of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    pub capabilities: Value,

    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server identification information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Tool name (unique identifier)
    pub name: String,

    /// Tool description
    pub description: String,

    /// Tool input schema (JSON Schema)
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool call parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallParams {
    /// Name of the tool to call
    pub name: String,

    /// Tool arguments (must match input schema)
    #[serde(default)]
    pub arguments: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_request() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let req: McpRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.jsonrpc, "2.0");
        assert_eq!(req.id, Some(json!(1)));
        assert_eq!(req.method, "tools/list");
        assert!(req.params.is_none());
        assert!(!req.is_notification());
    }

    #[test]
    fn test_string_ids_and_notifications() {
        let req: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#).unwrap();
        assert_eq!(req.id, Some(json!("abc")));

        let note: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(note.is_notification());
        assert!(McpRequest::notification("notifications/initialized", None).is_notification());
    }

    #[test]
    fn test_serialize_response_success() {
        let resp = McpResponse::ok(json!(1), json!({"tools": []}));
        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
        assert!(resp.is_success());
    }

    #[test]
    fn test_serialize_response_error_with_null_id() {
        let resp = McpResponse::err(Value::Null, McpError::parse_error("Parse error"));
        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.contains("\"id\":null"));
        assert!(json.contains("\"code\":-32700"));
        assert!(!json.contains("\"result\""));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(McpError::parse_error("x").code, -32700);
        assert_eq!(McpError::invalid_request("x").code, -32600);
        assert_eq!(McpError::method_not_found("x").code, -32601);
        assert_eq!(McpError::invalid_params("x").code, -32602);
        assert_eq!(McpError::internal_error("x").code, -32603);

        let err = McpError::method_not_found("resources/list");
        assert_eq!(err.message, "Method not found: resources/list");
        assert_eq!(err.to_string(), "[Error -32601] Method not found: resources/list");
    }

    #[test]
    fn test_mcp_method_conversion() {
        assert_eq!(McpMethod::from("initialize"), McpMethod::Initialize);
        assert_eq!(
            McpMethod::from("notifications/initialized"),
            McpMethod::Initialized
        );
        assert_eq!(McpMethod::from("ping"), McpMethod::Ping);
        assert_eq!(McpMethod::from("tools/list"), McpMethod::ToolsList);
        assert_eq!(McpMethod::from("tools/call"), McpMethod::ToolsCall);

        let custom = McpMethod::from("resources/list");
        assert_eq!(custom, McpMethod::Custom("resources/list".to_string()));
        assert_eq!(custom.as_str(), "resources/list");
        assert_eq!(McpMethod::Initialized.as_str(), "notifications/initialized");
    }

    #[test]
    fn test_tool_serialization() {
        let tool = Tool {
            name: "hello_world".to_string(),
            description: "Say hello".to_string(),
            input_schema: json!({"type": "object"}),
        };

        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["name"], "hello_world");
        assert_eq!(value["inputSchema"]["type"], "object");
    }

    #[test]
    fn test_tool_call_params_default_arguments() {
        let params: ToolCallParams = serde_json::from_value(json!({"name": "hello_world"})).unwrap();
        assert_eq!(params.arguments, Value::Null);
    }

    #[test]
    fn test_initialize_params_optional_version() {
        let params: InitializeParams = serde_json::from_value(json!({})).unwrap();
        assert!(params.protocol_version.is_none());

        let params: InitializeParams =
            serde_json::from_value(json!({"protocolVersion": "2025-03-26", "capabilities": {}}))
                .unwrap();
        assert_eq!(params.protocol_version.as_deref(), Some("2025-03-26"));
    }
}
