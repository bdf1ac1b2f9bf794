use std::time::Duration;

use async_trait::async_trait;
use fabric_core::{
    AgentManifest, AgentStatus, CallEnvelope, ErrorCode, FabricError, FabricResult, RuntimeAdapter,
    StreamEvent, StreamEventKind,
};
use futures_util::stream::{self, BoxStream};
use serde_json::Value;

/// Speaks the same JSON-over-HTTP envelope the gateway's own HTTP surface
/// accepts, to a remote agent endpoint. One adapter instance per registered
/// remote agent.
pub struct HttpAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RuntimeAdapter for HttpAdapter {
    async fn call(&self, envelope: CallEnvelope) -> FabricResult<Value> {
        let timeout = Duration::from_millis(envelope.target.timeout_ms.max(1));
        let url = format!("{}/v1/call", self.base_url);

        let send = self.client.post(&url).json(&envelope).send();
        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| FabricError::new(ErrorCode::Timeout, "remote call timed out"))?
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("remote call failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FabricError::new(
                ErrorCode::UpstreamError,
                format!("remote agent returned HTTP {}", response.status()),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("invalid response body: {e}")))
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
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) if resp.status().is_success() => AgentStatus::Online,
            Ok(_) => AgentStatus::Degraded,
            Err(_) => AgentStatus::Offline,
        }
    }

    async fn describe(&self) -> Option<AgentManifest> {
        let url = format!("{}/v1/describe", self.base_url);
        self.client.get(&url).send().await.ok()?.json::<AgentManifest>().await.ok()
    }
}
