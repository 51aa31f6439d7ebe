use super::{empty_object_schema, ToolError, ToolHandler};
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Connectivity check that runs nothing
#[derive(Debug, Default)]
pub struct HelloWorldTool;

#[async_trait]
impl ToolHandler for HelloWorldTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "hello_world".to_string(),
            description: "Simple hello world tool for testing.".to_string(),
            input_schema: empty_object_schema(),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "success": true,
            "message": "Hello World from Hypernode MCP Server!",
            "status": "success",
        }))
    }
}
