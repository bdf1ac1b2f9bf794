use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use fabric_core::{
    AgentManifest, AgentStatus, CallEnvelope, ErrorCode, FabricError, FabricResult, RuntimeAdapter,
    StreamEvent, StreamEventKind,
};
use futures_util::stream::{self, BoxStream};
use serde_json::Value;

type Handler = Arc<dyn Fn(CallEnvelope) -> Pin<Box<dyn Future<Output = FabricResult<Value>> + Send>> + Send + Sync>;

/// In-process capability handlers keyed by name, for agents that live in
/// the same runtime as the gateway (test doubles, tool-backed pseudo-agents).
/// Mirrors the one-trait-many-implementors shape used for pluggable
/// backends elsewhere in the stack, specialized to a closure registry
/// instead of a trait object per capability.
pub struct LocalAdapter {
    manifest: AgentManifest,
    handlers: HashMap<String, Handler>,
}

impl LocalAdapter {
    pub fn new(manifest: AgentManifest) -> Self {
        Self {
            manifest,
            handlers: HashMap::new(),
        }
    }

    pub fn with_handler<F, Fut>(mut self, capability: &str, handler: F) -> Self
    where
        F: Fn(CallEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FabricResult<Value>> + Send + 'static,
    {
        self.handlers.insert(capability.to_string(), Arc::new(move |env| Box::pin(handler(env))));
        self
    }
}

#[async_trait]
impl RuntimeAdapter for LocalAdapter {
    async fn call(&self, envelope: CallEnvelope) -> FabricResult<Value> {
        let capability = envelope.target.capability.clone();
        let handler = self.handlers.get(&capability).cloned().ok_or_else(|| {
            FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{capability}' not found on agent '{}'", self.manifest.agent_id),
            )
        })?;

        let timeout = std::time::Duration::from_millis(envelope.target.timeout_ms.max(1));
        match tokio::time::timeout(timeout, handler(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(FabricError::new(ErrorCode::Timeout, "local adapter call timed out")),
        }
    }

    async fn call_stream(&self, envelope: CallEnvelope) -> FabricResult<BoxStream<'static, StreamEvent>> {
        let result = self.call(envelope).await;
        let event = match result {
            Ok(value) => StreamEvent {
                event: StreamEventKind::Final,
                data: value,
            },
            Err(e) => StreamEvent {
                event: StreamEventKind::Error,
                data: serde_json::to_value(fabric_core::ErrorBody::from(&e)).unwrap_or(Value::Null),
            },
        };
        Ok(Box::pin(stream::iter(vec![event])))
    }

    async fn health(&self) -> AgentStatus {
        AgentStatus::Online
    }

    async fn describe(&self) -> Option<AgentManifest> {
        Some(self.manifest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::{AuthContext, CallInput, ResponseOptions, Target, TargetKind, TraceContext};
    use serde_json::json;

    fn envelope(capability: &str, timeout_ms: u64) -> CallEnvelope {
        CallEnvelope {
            trace: TraceContext::new_root(),
            auth: AuthContext::None,
            target: Target {
                kind: TargetKind::Agent,
                id: "echo".to_string(),
                capability: capability.to_string(),
                timeout_ms,
            },
            input: CallInput::default(),
            response: ResponseOptions::default(),
        }
    }

    fn manifest() -> AgentManifest {
        AgentManifest {
            agent_id: "echo".to_string(),
            display_name: "Echo".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            runtime_kind: "local".to_string(),
            endpoint: fabric_core::Endpoint {
                transport: "local".to_string(),
                uri: "local://echo".to_string(),
            },
            capabilities: vec![fabric_core::Capability::new("greet")],
            tags: vec![],
            trust_tier: fabric_core::TrustTier::Local,
            status: AgentStatus::Unknown,
            last_seen: None,
        }
    }

    #[tokio::test]
    async fn calls_registered_handler() {
        let adapter = LocalAdapter::new(manifest())
            .with_handler("greet", |_env| async { Ok(json!({"hello": "world"})) });
        let result = adapter.call(envelope("greet", 1000)).await.unwrap();
        assert_eq!(result, json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn unknown_capability_is_not_found() {
        let adapter = LocalAdapter::new(manifest());
        let err = adapter.call(envelope("missing", 1000)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CapabilityNotFound);
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let adapter = LocalAdapter::new(manifest()).with_handler("slow", |_env| async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(json!({}))
        });
        let err = adapter.call(envelope("slow", 1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
    }

    #[tokio::test]
    async fn call_stream_emits_single_terminal_event() {
        let adapter = LocalAdapter::new(manifest())
            .with_handler("greet", |_env| async { Ok(json!({"ok": true})) });
        let mut stream = adapter.call_stream(envelope("greet", 1000)).await.unwrap();
        use futures_util::StreamExt;
        let first = stream.next().await.unwrap();
        assert!(first.is_terminal());
        assert!(stream.next().await.is_none());
    }
}
