use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthContext;
use crate::trace::TraceContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Agent,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub id: String,
    pub capability: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallInput {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub attachments: Vec<Value>,
    /// Raw arguments bag for tool calls (capabilities take named params
    /// rather than a single `task` string).
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseOptions {
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// The internal carrier of trace, auth, target, and payload across exactly
/// one adapter invocation. Constructed at dispatch, consumed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub trace: TraceContext,
    pub auth: AuthContext,
    pub target: Target,
    pub input: CallInput,
    pub response: ResponseOptions,
}
