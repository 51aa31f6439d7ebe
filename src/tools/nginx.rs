//! Nginx access log analysis through `hypernode-parse-nginx-log`.

use super::{empty_object_schema, ensure_plain_token, parse_args, SharedRunner, ToolError, ToolHandler};
use crate::exec::ExecutionTimeout;
use crate::mcp::protocol::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const PARSE_NGINX_LOG_COMMAND: &str = "hypernode-parse-nginx-log";

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    today: bool,
    #[serde(default)]
    unique_by_field: Option<String>,
    #[serde(default)]
    query_bots_only: bool,
}

impl AnalyzeParams {
    /// Build the (possibly piped) command line
    ///
    /// With a pipeline the command runs through the shell, so the filter is
    /// shell-quoted. Without one it is exec'd directly and the filter has to
    /// be a plain token.
    fn command(&self) -> Result<String, ToolError> {
        let piped = self.unique_by_field.is_some() || self.limit > 0;
        let mut command = PARSE_NGINX_LOG_COMMAND.to_string();

        if self.today {
            command.push_str(" --today");
        }
        if self.query_bots_only {
            command.push_str(" --bots");
        }
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty()) {
            if piped {
                let quoted = shlex::try_quote(filter).map_err(|e| {
                    ToolError::InvalidParameter(format!("Invalid filter: {}", e))
                })?;
                command.push_str(&format!(" --filter {}", quoted));
            } else {
                ensure_plain_token("filter", filter)?;
                command.push_str(&format!(" --filter {}", filter));
            }
        }
        if let Some(field) = &self.unique_by_field {
            ensure_plain_token("unique_by_field", field)?;
            command.push_str(&format!(" --fields {} | sort | uniq -c | sort -nr", field));
        }
        if self.limit > 0 {
            command.push_str(&format!(" | head -n {}", self.limit));
        }

        Ok(command)
    }
}

/// Runs a filtered, optionally grouped query over the nginx access logs
pub struct AnalyzeNginxLogsTool {
    runner: SharedRunner,
    timeout: ExecutionTimeout,
}

impl AnalyzeNginxLogsTool {
    pub fn new(runner: SharedRunner, timeout: ExecutionTimeout) -> Self {
        Self { runner, timeout }
    }
}

#[async_trait]
impl ToolHandler for AnalyzeNginxLogsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "analyze_nginx_logs".to_string(),
            description: "Analyze nginx logs with optional filters.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "description": "Filter to apply. Format: <field>=<str> or <field>~<regex> or <field>!~<regex>"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of lines to return (0 for no limit)",
                        "default": 100
                    },
                    "today": {
                        "type": "boolean",
                        "description": "Only analyze today's logs",
                        "default": false
                    },
                    "unique_by_field": {
                        "type": "string",
                        "description": "Field to count and group unique occurrences by (e.g. remote_addr, user_agent)"
                    },
                    "query_bots_only": {
                        "type": "boolean",
                        "description": "Only analyze bot traffic",
                        "default": false
                    }
                }
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: AnalyzeParams = parse_args(arguments)?;
        let command = params.command()?;
        let result = self.runner.run(&command, self.timeout, None).await;

        Ok(json!({
            "success": result.success,
            "result": result.output(),
            "filter": params.filter,
            "limit": params.limit,
            "today": params.today,
            "unique_by_field": params.unique_by_field,
            "query_bots_only": params.query_bots_only,
        }))
    }
}

/// Lists the field names that can be used in filters and groupings
pub struct AnalyzeNginxLogsFieldsTool {
    runner: SharedRunner,
}

impl AnalyzeNginxLogsFieldsTool {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

fn parse_fields(output: &str) -> Vec<String> {
    match output.split_once("Available fields:") {
        Some((_, fields)) => fields
            .trim()
            .split(", ")
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

#[async_trait]
impl ToolHandler for AnalyzeNginxLogsFieldsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "analyze_nginx_logs_fields".to_string(),
            description: "List available fields for nginx log analysis.".to_string(),
            input_schema: empty_object_schema(),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        let command = format!("{} --list-fields", PARSE_NGINX_LOG_COMMAND);
        let result = self.runner.run_default(&command).await;

        if !result.success {
            return Ok(json!({
                "success": false,
                "error": result.stderr,
                "fields": [],
            }));
        }

        let output = result.stdout.trim();
        let fields = parse_fields(output);
        Ok(json!({
            "success": true,
            "count": fields.len(),
            "fields": fields,
            "raw_output": output,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::ScriptedRunner;

    fn params(args: Value) -> AnalyzeParams {
        parse_args(args).unwrap()
    }

    #[test]
    fn test_default_command() {
        assert_eq!(
            params(json!({})).command().unwrap(),
            "hypernode-parse-nginx-log | head -n 100"
        );
    }

    #[test]
    fn test_command_flags() {
        let command = params(json!({"today": true, "query_bots_only": true, "limit": 5}))
            .command()
            .unwrap();
        assert_eq!(command, "hypernode-parse-nginx-log --today --bots | head -n 5");
    }

    #[test]
    fn test_command_quotes_filter() {
        let command = params(json!({"filter": "user_agent~Google Bot", "limit": 10}))
            .command()
            .unwrap();
        assert_eq!(
            command,
            "hypernode-parse-nginx-log --filter 'user_agent~Google Bot' | head -n 10"
        );
    }

    #[test]
    fn test_command_unique_by_field() {
        let command = params(json!({"unique_by_field": "remote_addr", "limit": 20}))
            .command()
            .unwrap();
        assert_eq!(
            command,
            "hypernode-parse-nginx-log --fields remote_addr | sort | uniq -c | sort -nr | head -n 20"
        );
    }

    #[test]
    fn test_command_unlimited_without_pipeline() {
        let command = params(json!({"limit": 0, "filter": "status=404"}))
            .command()
            .unwrap();
        assert_eq!(command, "hypernode-parse-nginx-log --filter status=404");

        let err = params(json!({"limit": 0, "filter": "user_agent~Google Bot"}))
            .command()
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter(_)));
    }

    #[test]
    fn test_command_rejects_unsafe_field() {
        let err = params(json!({"unique_by_field": "remote_addr; reboot"}))
            .command()
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let runner = ScriptedRunner::succeeding("  42 1.2.3.4\n  7 5.6.7.8\n");
        let tool = AnalyzeNginxLogsTool::new(runner.clone(), ExecutionTimeout::from_secs(120));

        let result = tool
            .call(json!({"unique_by_field": "remote_addr", "today": true}))
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["result"], "  42 1.2.3.4\n  7 5.6.7.8\n");
        assert_eq!(result["limit"], 100);
        assert_eq!(result["today"], true);
        assert_eq!(result["unique_by_field"], "remote_addr");
        assert_eq!(result["filter"], Value::Null);
        assert_eq!(result["query_bots_only"], false);

        let calls = runner.calls();
        assert_eq!(calls[0].timeout, ExecutionTimeout::from_secs(120));
        assert!(calls[0].command.contains("| sort | uniq -c | sort -nr"));
    }

    #[tokio::test]
    async fn test_analyze_failure() {
        let runner = ScriptedRunner::failing(1, "Error: Log file not found");
        let tool = AnalyzeNginxLogsTool::new(runner, ExecutionTimeout::from_secs(120));

        let result = tool.call(json!({})).await.unwrap();

        assert_eq!(result["success"], false);
        assert_eq!(result["result"], "Error: Log file not found");
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(
            parse_fields("Available fields: remote_addr, status, user_agent"),
            vec!["remote_addr", "status", "user_agent"]
        );
        assert_eq!(
            parse_fields("Header\nAvailable fields:   host ,  request , status  "),
            vec!["host", "request", "status"]
        );
        assert!(parse_fields("Some unexpected output").is_empty());
        assert!(parse_fields("Available fields:").is_empty());
    }

    #[tokio::test]
    async fn test_fields_success() {
        let runner = ScriptedRunner::succeeding("Available fields: remote_addr, status\n");
        let tool = AnalyzeNginxLogsFieldsTool::new(runner.clone());

        let result = tool.call(Value::Null).await.unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["count"], 2);
        assert_eq!(result["fields"], json!(["remote_addr", "status"]));
        assert_eq!(result["raw_output"], "Available fields: remote_addr, status");
        assert_eq!(
            runner.commands(),
            vec!["hypernode-parse-nginx-log --list-fields"]
        );
    }

    #[tokio::test]
    async fn test_fields_failure() {
        let runner = ScriptedRunner::failing(127, "command not found");
        let tool = AnalyzeNginxLogsFieldsTool::new(runner);

        let result = tool.call(Value::Null).await.unwrap();

        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "command not found");
        assert_eq!(result["fields"], json!([]));
    }
}
