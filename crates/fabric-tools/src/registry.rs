use std::collections::HashMap;
use std::sync::Arc;

use fabric_core::{ErrorCode, FabricError, FabricResult, Tool, ToolDescriptor, ToolProvider, TrustTier};
use serde_json::Value;
use tracing::{debug, warn};

/// Process-global `tool_id -> tool instance` mapping, populated at startup
/// by `register_builtin_tools` (see `crate::builtin::register_builtin_tools`).
///
/// Each tool is an eagerly-constructed singleton per id — construction
/// happens once, at registration, rather than on first call, since
/// built-in tools hold no expensive resources.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let id = tool.tool_id().to_string();
        if self.tools.contains_key(&id) {
            warn!("tool registry: overwriting duplicate tool '{}'", id);
        }
        debug!("tool registry: registered '{}'", id);
        self.tools.insert(id, tool);
    }

    /// Sorted list of all registered tool ids.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn instance(&self, tool_id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(tool_id).cloned()
    }

    pub fn info(&self, tool_id: &str) -> Option<ToolDescriptor> {
        let tool = self.tools.get(tool_id)?;
        Some(ToolDescriptor {
            tool_id: tool.tool_id().to_string(),
            display_name: tool.display_name().to_string(),
            provider: ToolProvider::Builtin,
            category: tool.category().to_string(),
            trust_tier: TrustTier::Local,
            enabled: true,
            capabilities: tool.capabilities(),
            config: Value::Null,
        })
    }

    /// Execute `tool_id.capability(args)`, isolating panics and mapping
    /// not-found cases to the framework's closed error codes.
    pub async fn execute(&self, tool_id: &str, capability: &str, args: Value) -> FabricResult<Value> {
        let tool = self
            .tools
            .get(tool_id)
            .cloned()
            .ok_or_else(|| FabricError::new(ErrorCode::ToolNotFound, format!("tool not found: {tool_id}")))?;

        if !tool.capabilities().iter().any(|c| c.name == capability) {
            return Err(FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{capability}' not found on tool '{tool_id}'"),
            ));
        }

        let capability_owned = capability.to_string();
        let tool_for_task = tool.clone();
        let handle = tokio::spawn(async move { tool_for_task.execute(&capability_owned, args).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => Err(FabricError::new(
                ErrorCode::ExecutionError,
                format!("tool '{tool_id}' panicked during execution"),
            )),
            Err(join_err) => Err(FabricError::new(
                ErrorCode::ExecutionError,
                format!("tool '{tool_id}' task failed: {join_err}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fabric_core::Capability;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn tool_id(&self) -> &str {
            "test.echo"
        }
        fn display_name(&self) -> &str {
            "Echo"
        }
        fn category(&self) -> &str {
            "test"
        }
        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::new("echo")]
        }
        async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
            assert_eq!(capability, "echo");
            Ok(args)
        }
    }

    #[tokio::test]
    async fn unknown_tool_id_maps_to_tool_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", "x", json!({})).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ToolNotFound);
    }

    #[tokio::test]
    async fn unknown_capability_maps_to_capability_not_found() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let err = registry
            .execute("test.echo", "dream", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CapabilityNotFound);
    }

    #[tokio::test]
    async fn known_tool_and_capability_executes() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry
            .execute("test.echo", "echo", json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(result, json!({"a": 1}));
    }
}
