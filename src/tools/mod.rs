//! Tool Handlers
//!
//! Each tool turns typed parameters into a command string, runs it through a
//! [`CommandRunner`], and reshapes the result into a JSON response that always
//! carries a `success` field.
//!
//! Handlers are collected in a [`ToolRegistry`], built explicitly at startup.
//!
//! # Tools
//!
//! - `hello_world`: connectivity check, runs nothing
//! - `block_attack` / `list_attacks`: `hypernode-systemctl block_attack`
//! - `list_vhosts` / `modify_vhost`: `hypernode-manage-vhosts`
//! - `analyze_nginx_logs` / `analyze_nginx_logs_fields`: `hypernode-parse-nginx-log`
//! - `list_incidents` / `get_incident`: files under the incidents directory
//! - `execute_shell_command`: arbitrary commands, subject to the denylist

mod attacks;
mod hello;
mod incidents;
mod nginx;
mod registry;
mod shell;
#[cfg(test)]
pub(crate) mod testing;
mod vhosts;

pub use attacks::{BlockAttackTool, ListAttacksTool};
pub use hello::HelloWorldTool;
pub use incidents::{GetIncidentTool, ListIncidentsTool};
pub use nginx::{AnalyzeNginxLogsFieldsTool, AnalyzeNginxLogsTool};
pub use registry::ToolRegistry;
pub use shell::ExecuteShellCommandTool;
pub use vhosts::{ListVhostsTool, ModifyVhostTool};

use crate::exec::{policy, CommandRunner, ExecutionTimeout};
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Error types for tool invocation
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidParameter(String),
}

/// A named, schema-described operation exposed to agents
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and input schema
    fn definition(&self) -> Tool;

    /// Invoke the tool with JSON arguments
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Settings shared by the tool handlers
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Directory holding one subdirectory per incident
    pub incidents_dir: PathBuf,

    /// Timeout for `hypernode-systemctl block_attack`
    pub block_attack_timeout: ExecutionTimeout,

    /// Timeout for nginx log analysis
    pub nginx_timeout: ExecutionTimeout,

    /// Maximum number of characters of incident file content returned
    pub incident_content_limit: usize,

    /// Incident files at or above this size are listed without content
    pub incident_max_file_bytes: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            incidents_dir: default_incidents_dir(),
            block_attack_timeout: ExecutionTimeout::from_secs(60),
            nginx_timeout: ExecutionTimeout::from_secs(120),
            incident_content_limit: 10_000,
            incident_max_file_bytes: 1024 * 1024,
        }
    }
}

/// `~/incidents`, or `./incidents` when no home directory is known
pub fn default_incidents_dir() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join("incidents"),
        None => PathBuf::from("incidents"),
    }
}

/// Shared handle to the runner every handler executes through
pub type SharedRunner = Arc<dyn CommandRunner>;

/// Attack names accepted by `hypernode-systemctl block_attack` start with `Block`
pub fn validate_attack_name(attack_name: &str) -> bool {
    attack_name.starts_with("Block")
}

/// Vhost names must at least look like a domain
pub fn validate_vhost_name(vhost_name: &str) -> bool {
    vhost_name.contains('.')
}

/// Deserialize tool arguments into a params struct
///
/// A missing (`null`) argument object is treated as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    Ok(serde_json::from_value(arguments)?)
}

/// Require a value that stays a single argv entry on the direct-exec path
///
/// Rejects empty values, whitespace, quotes and shell metacharacters, so a
/// parameter can never change how its command is tokenized or invoked.
pub(crate) fn ensure_plain_token(field: &str, value: &str) -> Result<(), ToolError> {
    if value.is_empty() {
        return Err(ToolError::InvalidParameter(format!(
            "{} parameter is required",
            field
        )));
    }

    let invalid = value.chars().any(|c| {
        c.is_whitespace() || c == '\'' || c == '"' || policy::SHELL_METACHARACTERS.contains(&c)
    });
    if invalid {
        return Err(ToolError::InvalidParameter(format!(
            "Invalid {}: '{}' must not contain whitespace, quotes or shell metacharacters",
            field, value
        )));
    }

    Ok(())
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}
