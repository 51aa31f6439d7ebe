//! Attack blocking through `hypernode-systemctl block_attack`.

use super::{
    empty_object_schema, ensure_plain_token, parse_args, validate_attack_name, SharedRunner,
    ToolError, ToolHandler,
};
use crate::exec::ExecutionTimeout;
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const BLOCK_ATTACK_COMMAND: &str = "hypernode-systemctl block_attack";

#[derive(Debug, Deserialize)]
struct BlockAttackParams {
    attack_type: String,
}

/// Deploys one of the predefined attack blocks
pub struct BlockAttackTool {
    runner: SharedRunner,
    timeout: ExecutionTimeout,
}

impl BlockAttackTool {
    pub fn new(runner: SharedRunner, timeout: ExecutionTimeout) -> Self {
        Self { runner, timeout }
    }
}

#[async_trait]
impl ToolHandler for BlockAttackTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "block_attack".to_string(),
            description: "Block a specific attack type using hypernode-systemctl block_attack. \
                WARNING: this can block legitimate traffic; only use it when the attack type \
                has been verified."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "attack_type": {
                        "type": "string",
                        "description": "The type of attack to block (e.g. BlockChinaBruteForce, BlockAhrefsBot)"
                    }
                },
                "required": ["attack_type"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: BlockAttackParams = parse_args(arguments)?;
        ensure_plain_token("attack_type", &params.attack_type)?;
        if !validate_attack_name(&params.attack_type) {
            return Err(ToolError::InvalidParameter(format!(
                "Invalid attack name format: {}. Must start with 'Block'",
                params.attack_type
            )));
        }

        let command = format!("{} {}", BLOCK_ATTACK_COMMAND, params.attack_type);
        let result = self.runner.run(&command, self.timeout, None).await;

        Ok(json!({
            "success": result.success,
            "result": result.output(),
            "attack_type": params.attack_type,
            "return_code": result.return_code,
        }))
    }
}

/// An attack block advertised by `block_attack --help`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackOption {
    pub name: String,
    pub description: String,
}

/// Lists the attack blocks that `block_attack` knows about
pub struct ListAttacksTool {
    runner: SharedRunner,
}

impl ListAttacksTool {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

/// Extract `name<TAB>description` rows from the `--help` output
fn parse_attack_options(help: &str) -> Vec<AttackOption> {
    help.trim()
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("usage:")
                && !line.starts_with("The possible values are:")
                && !line.starts_with("options:")
        })
        .filter(|line| line.contains("Block"))
        .filter_map(|line| {
            let (name, description) = line.split_once('\t')?;
            Some(AttackOption {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ToolHandler for ListAttacksTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_attacks".to_string(),
            description: "List all available, but not necessarily enabled, attack-blocking \
                options on the Hypernode."
                .to_string(),
            input_schema: empty_object_schema(),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        let command = format!("{} --help", BLOCK_ATTACK_COMMAND);
        let result = self.runner.run_default(&command).await;

        if !result.success {
            return Ok(json!({
                "success": false,
                "error": result.stderr,
                "attacks": [],
            }));
        }

        let attacks = parse_attack_options(&result.stdout);
        Ok(json!({
            "success": true,
            "count": attacks.len(),
            "attacks": attacks,
            "raw_output": result.stdout,
        }))
    }
}
