use super::{
    AnalyzeNginxLogsFieldsTool, AnalyzeNginxLogsTool, BlockAttackTool, ExecuteShellCommandTool,
    GetIncidentTool, HelloWorldTool, ListAttacksTool, ListIncidentsTool, ListVhostsTool,
    ModifyVhostTool, SharedRunner, ToolError, ToolHandler, ToolSettings,
};
use crate::mcp::protocol::Tool;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Name-indexed set of tool handlers
///
/// Built explicitly at startup; nothing registers itself.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every Hypernode tool, all running through `runner`
    pub fn with_default_tools(runner: SharedRunner, settings: ToolSettings) -> Self {
        let mut registry = Self::new();
        registry.register(HelloWorldTool);
        registry.register(BlockAttackTool::new(
            runner.clone(),
            settings.block_attack_timeout,
        ));
        registry.register(ListAttacksTool::new(runner.clone()));
        registry.register(ListVhostsTool::new(runner.clone()));
        registry.register(ModifyVhostTool::new(runner.clone()));
        registry.register(AnalyzeNginxLogsTool::new(
            runner.clone(),
            settings.nginx_timeout,
        ));
        registry.register(AnalyzeNginxLogsFieldsTool::new(runner.clone()));
        registry.register(ListIncidentsTool::new(
            runner.clone(),
            settings.incidents_dir.clone(),
        ));
        registry.register(GetIncidentTool::new(runner.clone(), &settings));
        registry.register(ExecuteShellCommandTool::new(runner));
        registry
    }

    /// Add a handler, replacing any handler with the same name
    pub fn register<T: ToolHandler + 'static>(&mut self, tool: T) {
        let name = tool.definition().name;
        debug!("Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Definitions of every registered tool, sorted by name
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Invoke a tool by name
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.call(arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::ScriptedRunner;
    use serde_json::json;

    fn registry() -> (ToolRegistry, Arc<ScriptedRunner>) {
        let runner = ScriptedRunner::new();
        let registry = ToolRegistry::with_default_tools(runner.clone(), ToolSettings::default());
        (registry, runner)
    }

    #[test]
    fn test_default_tools() {
        let (registry, _) = registry();
        assert_eq!(
            registry.names(),
            vec![
                "analyze_nginx_logs",
                "analyze_nginx_logs_fields",
                "block_attack",
                "execute_shell_command",
                "get_incident",
                "hello_world",
                "list_attacks",
                "list_incidents",
                "list_vhosts",
                "modify_vhost",
            ]
        );
        assert_eq!(registry.len(), 10);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_definitions_are_object_schemas() {
        let (registry, _) = registry();
        for tool in registry.definitions() {
            assert!(!tool.description.is_empty(), "{}", tool.name);
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn test_call_dispatches_by_name() {
        let (registry, runner) = registry();
        runner.push(0, "Available fields: status\n", "");

        let result = registry
            .call("analyze_nginx_logs_fields", Value::Null)
            .await
            .unwrap();

        assert_eq!(result["fields"], json!(["status"]));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let (registry, runner) = registry();

        let err = registry.call("format_disk", json!({})).await.unwrap_err();

        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "format_disk"));
        assert_eq!(err.to_string(), "Unknown tool: format_disk");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(HelloWorldTool);
        registry.register(HelloWorldTool);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("hello_world").is_some());
        assert!(registry.get("missing").is_none());
    }
}
