//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are named, schema-described callables the model may ask for in
//! the middle of a conversation. They are registered once at startup in a
//! [`ToolRegistry`] and never change afterwards.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The core Tool trait.
///
/// A tool returns arbitrary JSON. Domain failures (bad input, upstream
/// outage) should come back as an [`error_payload`] value rather than an
/// `Err`, but the registry converts an `Err` into the same shape anyway.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "current_time").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The structured error object tools hand back to the model.
pub fn error_payload(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "message": message.into(),
    })
}

/// Whether a tool result is an [`error_payload`]-shaped value.
pub fn is_error_payload(value: &serde_json::Value) -> bool {
    value.get("error").and_then(|e| e.as_bool()).unwrap_or(false)
}

/// A registry of available tools.
///
/// The agent uses this to:
/// 1. Get tool definitions to advertise to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced previously registered tool");
        } else {
            debug!(tool = %name, "Registered tool");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Definitions for the given names, in the given order.
    ///
    /// Names that are not registered are skipped silently.
    pub fn definitions_for<S: AsRef<str>>(&self, names: &[S]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.get(name.as_ref()))
            .map(|tool| tool.to_definition())
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// Fails only with [`ToolError::NotFound`]. Whatever the tool returns is
    /// passed through verbatim; a tool `Err` or panic becomes an
    /// [`error_payload`] value.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        match AssertUnwindSafe(tool.execute(arguments)).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool returned an error");
                Ok(error_payload(e.to_string()))
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".to_string());
                warn!(tool = %name, reason = %reason, "Tool panicked");
                Ok(error_payload(format!("Tool {name} crashed: {reason}")))
            }
        }
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(serde_json::json!({ "echo": text }))
        }
    }

    struct ExplodingTool;

    #[async_trait]
    impl Tool for ExplodingTool {
        fn name(&self) -> &str { "explode" }
        fn description(&self) -> &str { "Always panics" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            panic!("backend on fire");
        }
    }

    /// Same name as EchoTool, different behaviour.
    struct ShoutTool;

    #[async_trait]
    impl Tool for ShoutTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input, loudly" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            let text = arguments["text"].as_str().unwrap_or_default().to_uppercase();
            Ok(serde_json::json!({ "echo": text }))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(ShoutTool));
        assert_eq!(registry.len(), 1);

        let out = registry.execute("echo", serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, serde_json::json!({"echo": "HI"}));
    }

    #[test]
    fn definitions_for_keeps_order_and_drops_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(ExplodingTool));

        let defs = registry.definitions_for(&["explode", "missing", "echo"]);
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["explode", "echo"]);

        assert!(registry.definitions_for(&["missing"]).is_empty());
    }

    #[test]
    fn definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ExplodingTool));
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "explode");
        assert_eq!(registry.names(), vec!["echo", "explode"]);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let result = registry
            .execute("echo", serde_json::json!({"text": "hello world"}))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"echo": "hello world"}));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nonexistent", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(err.to_string(), "Tool nonexistent not found");
    }

    #[tokio::test]
    async fn tool_error_becomes_payload() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let result = registry.execute("echo", serde_json::json!({})).await.unwrap();
        assert!(is_error_payload(&result));
        assert!(result["message"].as_str().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn tool_panic_becomes_payload() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ExplodingTool));

        let result = registry.execute("explode", serde_json::json!({})).await.unwrap();
        assert!(is_error_payload(&result));
        assert!(result["message"].as_str().unwrap().contains("backend on fire"));
    }
}
