//! Vhost listing and modification through `hypernode-manage-vhosts`.

use super::{
    empty_object_schema, ensure_plain_token, parse_args, validate_vhost_name, SharedRunner,
    ToolError, ToolHandler,
};
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const MANAGE_VHOSTS_COMMAND: &str = "hypernode-manage-vhosts";

/// Lists every vhost with its settings
pub struct ListVhostsTool {
    runner: SharedRunner,
}

impl ListVhostsTool {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for ListVhostsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_vhosts".to_string(),
            description: "List all vhosts configured on the Hypernode with their settings."
                .to_string(),
            input_schema: empty_object_schema(),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        let command = format!("{} --list --format json", MANAGE_VHOSTS_COMMAND);

        match self
            .runner
            .run_json(&command, self.runner.default_timeout())
            .await
        {
            Ok(vhosts) => {
                let count = vhosts.as_object().map_or(0, |map| map.len());
                Ok(json!({
                    "success": true,
                    "vhosts": vhosts,
                    "count": count,
                }))
            }
            Err(error) => Ok(json!({
                "success": false,
                "error": error,
                "vhosts": {},
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModifyVhostParams {
    vhost: String,
    action: String,
    value: String,
}

/// Changes a single vhost setting (https, varnish, type, ...)
pub struct ModifyVhostTool {
    runner: SharedRunner,
}

impl ModifyVhostTool {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

/// `true` enables the flag, `false` disables it, anything else is passed as
/// the flag's value
fn modify_command(vhost: &str, action: &str, value: &str) -> String {
    match value.to_lowercase().as_str() {
        "false" => format!("{} {} --disable-{}", MANAGE_VHOSTS_COMMAND, vhost, action),
        "true" => format!("{} {} --{}", MANAGE_VHOSTS_COMMAND, vhost, action),
        _ => format!("{} {} --{} {}", MANAGE_VHOSTS_COMMAND, vhost, action, value),
    }
}

#[async_trait]
impl ToolHandler for ModifyVhostTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "modify_vhost".to_string(),
            description: "Modify vhost settings (enable/disable https or varnish, change the \
                vhost type, ...)."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "vhost": {"type": "string", "description": "VHost name to modify"},
                    "action": {"type": "string", "description": "Setting to change (https/type/varnish)"},
                    "value": {"type": "string", "description": "true/false to enable/disable, or the new value"}
                },
                "required": ["vhost", "action", "value"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: ModifyVhostParams = parse_args(arguments)?;
        ensure_plain_token("vhost", &params.vhost)?;
        ensure_plain_token("action", &params.action)?;
        ensure_plain_token("value", &params.value)?;
        if !validate_vhost_name(&params.vhost) {
            return Err(ToolError::InvalidParameter(format!(
                "Invalid vhost name: {}. Must be a domain name",
                params.vhost
            )));
        }

        let command = modify_command(&params.vhost, &params.action, &params.value);
        let result = self.runner.run_default(&command).await;

        let output = if result.success && !result.stdout.is_empty() {
            &result.stdout
        } else {
            &result.stderr
        };

        Ok(json!({
            "success": result.success,
            "result": output,
            "vhost": params.vhost,
            "action": params.action,
            "value": params.value,
        }))
    }
}
