//! Arbitrary command execution, still subject to the executor's denylist.

use super::{parse_args, SharedRunner, ToolError, ToolHandler};
use crate::exec::ExecutionTimeout;
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct ShellParams {
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    working_directory: Option<PathBuf>,
}

/// Runs a caller-supplied command line
pub struct ExecuteShellCommandTool {
    runner: SharedRunner,
}

impl ExecuteShellCommandTool {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for ExecuteShellCommandTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "execute_shell_command".to_string(),
            description: "Execute a shell command on the Hypernode. Destructive programs \
                (rm, dd, shutdown, ...) are refused."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The command to run"},
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds",
                        "default": crate::exec::DEFAULT_TIMEOUT_SECS
                    },
                    "working_directory": {
                        "type": "string",
                        "description": "Directory to run the command in"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: ShellParams = parse_args(arguments)?;
        if params.command.trim().is_empty() {
            return Err(ToolError::InvalidParameter(
                "command parameter is required".to_string(),
            ));
        }

        let timeout = match params.timeout {
            Some(0) => {
                return Err(ToolError::InvalidParameter(
                    "timeout must be at least one second".to_string(),
                ))
            }
            Some(secs) => ExecutionTimeout::from_secs(secs),
            None => self.runner.default_timeout(),
        };

        let result = self
            .runner
            .run(&params.command, timeout, params.working_directory.as_deref())
            .await;

        Ok(json!({
            "success": result.success,
            "result": result.output(),
            "command": params.command,
            "return_code": result.return_code,
        }))
    }
}
