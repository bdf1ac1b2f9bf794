use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::CallEnvelope;
use crate::error::FabricResult;
use crate::manifest::{AgentManifest, AgentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Status,
    Token,
    Progress,
    Error,
    Final,
    Completed,
}

/// One event in a `call_stream` sequence. Exactly one terminal event
/// (`Final`/`Completed` on success, `Error` or a `Final` carrying
/// `ok:false` on failure) is produced per stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event: StreamEventKind,
    pub data: Value,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.event,
            StreamEventKind::Final | StreamEventKind::Completed | StreamEventKind::Error
        )
    }
}

/// Abstracts the wire protocol of one agent kind. Selection is by
/// `runtime_kind` in the manifest at register-time; adding a new wire kind
/// means adding a new adapter implementation, nothing else.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Synchronous invocation; must complete within
    /// `envelope.target.timeout_ms` or return `Timeout`.
    async fn call(&self, envelope: CallEnvelope) -> FabricResult<Value>;

    /// A finite, non-restartable sequence of events terminating exactly
    /// once. Dropping the stream before a terminal event cancels the
    /// producer promptly.
    async fn call_stream(&self, envelope: CallEnvelope) -> FabricResult<BoxStream<'static, StreamEvent>>;

    async fn health(&self) -> AgentStatus;

    async fn describe(&self) -> Option<AgentManifest>;
}
