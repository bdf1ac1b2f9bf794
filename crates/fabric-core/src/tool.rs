use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::Capability;
use crate::error::FabricResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolProvider {
    Builtin,
    Agent,
    External,
}

/// Static metadata about a registered tool, as surfaced by
/// `fabric.tool.list`/`fabric.tool.describe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub tool_id: String,
    pub display_name: String,
    pub provider: ToolProvider,
    pub category: String,
    pub trust_tier: crate::manifest::TrustTier,
    pub enabled: bool,
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub config: Value,
}

/// A pluggable built-in tool: a stable id, a set of named capabilities, and
/// a dispatcher from capability name to implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Dotted, globally unique id, e.g. `io.read_file`.
    fn tool_id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn category(&self) -> &str;

    /// The capabilities this tool exposes, used for `describe` and for
    /// validating `stream=true` requests against `streaming` flags.
    fn capabilities(&self) -> Vec<Capability>;

    /// Execute `capability` with `args`, returning an `EXECUTION_ERROR` for
    /// any unexpected internal failure and a `CAPABILITY_NOT_FOUND` for a
    /// name not present in `capabilities()`.
    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value>;
}
