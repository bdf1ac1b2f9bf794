//! Dispatch core: resolves an operation name against the agent registry,
//! tool registry, or messaging layer, and drives the matching adapter.

mod dispatch;
mod operation;

pub use dispatch::{DispatchCore, DispatchOutcome, DispatchResponse};
pub use operation::Operation;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fabric_agents::{AgentRegistry, LocalAdapter};
    use fabric_core::{AgentManifest, AgentStatus, AuthContext, Capability, Endpoint, ErrorCode, TrustTier};
    use fabric_messaging::MessageBus;
    use fabric_tools::register_builtin_tools;
    use serde_json::json;

    use super::*;

    fn manifest(id: &str, capability: Capability, tags: Vec<String>, trust_tier: TrustTier) -> AgentManifest {
        AgentManifest {
            agent_id: id.to_string(),
            display_name: id.to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            runtime_kind: "local".to_string(),
            endpoint: Endpoint { transport: "local".to_string(), uri: id.to_string() },
            capabilities: vec![capability],
            tags,
            trust_tier,
            status: AgentStatus::Unknown,
            last_seen: None,
        }
    }

    async fn fixture() -> DispatchCore {
        let agents = Arc::new(AgentRegistry::new());
        let adapter = Arc::new(LocalAdapter::new(manifest(
            "alpha",
            Capability::new("reason").with_timeout(30_000),
            vec!["chat".to_string()],
            TrustTier::Org,
        )).with_handler("reason", |envelope| async move {
            Ok(json!({"answer": format!("echo: {}", envelope.input.task.unwrap_or_default())}))
        }));
        agents.register(manifest("alpha", Capability::new("reason").with_timeout(30_000), vec!["chat".to_string()], TrustTier::Org), adapter).await;

        DispatchCore::new(
            agents,
            Arc::new(register_builtin_tools()),
            Arc::new(MessageBus::new()),
            Arc::new(fabric_core::ObservabilitySink::default()),
        )
    }

    fn value(outcome: DispatchOutcome) -> serde_json::Value {
        match outcome {
            DispatchOutcome::Value(v) => v,
            DispatchOutcome::Stream(_) => panic!("expected a value outcome"),
        }
    }

    #[tokio::test]
    async fn agent_describe_returns_registered_manifest() {
        let core = fixture().await;
        let response = core
            .handle("fabric.agent.describe", json!({"agent_id": "alpha"}), AuthContext::None, None)
            .await;
        let result = value(response.outcome.unwrap());
        assert_eq!(result["agent"]["capabilities"][0]["name"], "reason");
        assert_eq!(result["agent"]["trust_tier"], "org");
    }

    #[tokio::test]
    async fn sync_call_echoes_task_through_adapter() {
        let core = fixture().await;
        let response = core
            .handle(
                "fabric.call",
                json!({"agent_id": "alpha", "capability": "reason", "task": "hi"}),
                AuthContext::None,
                None,
            )
            .await;
        let result = value(response.outcome.unwrap());
        assert!(result["result"]["answer"].as_str().unwrap().contains("hi"));
    }

    #[tokio::test]
    async fn call_reports_trace_id_on_capability_not_found() {
        let core = fixture().await;
        let response = core
            .handle(
                "fabric.call",
                json!({"agent_id": "alpha", "capability": "dream", "task": "..."}),
                AuthContext::None,
                Some("trace-xyz".to_string()),
            )
            .await;
        assert_eq!(response.trace.trace_id, "trace-xyz");
        let err = response.outcome.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CapabilityNotFound);
    }

    #[tokio::test]
    async fn call_refuses_streaming_when_capability_disallows() {
        let core = fixture().await;
        let response = core
            .handle(
                "fabric.call",
                json!({"agent_id": "alpha", "capability": "reason", "task": "hi", "stream": true}),
                AuthContext::None,
                None,
            )
            .await;
        assert_eq!(response.outcome.unwrap_err().code(), ErrorCode::BadInput);
    }

    #[tokio::test]
    async fn route_preview_orders_fallbacks_by_tag_then_trust_tier() {
        let agents = Arc::new(AgentRegistry::new());
        let cap = Capability::new("reason");
        let stub = Arc::new(LocalAdapter::new(manifest("primary", cap.clone(), vec!["chat".to_string()], TrustTier::Org)));
        agents.register(manifest("primary", cap.clone(), vec!["chat".to_string()], TrustTier::Org), stub.clone()).await;
        agents
            .register(manifest("same-tag-public", cap.clone(), vec!["chat".to_string()], TrustTier::Public), stub.clone())
            .await;
        agents
            .register(manifest("other-tag-local", cap.clone(), vec!["ops".to_string()], TrustTier::Local), stub.clone())
            .await;

        let core = DispatchCore::new(
            agents,
            Arc::new(register_builtin_tools()),
            Arc::new(MessageBus::new()),
            Arc::new(fabric_core::ObservabilitySink::default()),
        );
        let response = core
            .handle("fabric.route.preview", json!({"agent_id": "primary", "capability": "reason"}), AuthContext::None, None)
            .await;
        let result = value(response.outcome.unwrap());
        let fallback_ids: Vec<&str> = result["fallbacks"].as_array().unwrap().iter().map(|a| a["agent_id"].as_str().unwrap()).collect();
        assert_eq!(fallback_ids, vec!["same-tag-public", "other-tag-local"]);
    }

    #[tokio::test]
    async fn tool_shortcut_executes_builtin_tool() {
        let core = fixture().await;
        let response = core
            .handle(
                "fabric.tool.data.json",
                json!({"capability": "parse", "arguments": {"text": "{\"a\":1}"}}),
                AuthContext::None,
                None,
            )
            .await;
        let result = value(response.outcome.unwrap());
        assert_eq!(result["result"]["value"]["a"], 1);
    }

    #[tokio::test]
    async fn message_send_then_receive_round_trips() {
        let core = fixture().await;
        let send = core
            .handle(
                "fabric.message.send",
                json!({"from": "a", "to": "b", "message_type": "task", "payload": {"k": "v"}}),
                AuthContext::None,
                None,
            )
            .await;
        assert!(value(send.outcome.unwrap())["message_id"].as_str().is_some());

        let status = core.handle("fabric.message.queue_status", json!({"agent_id": "b"}), AuthContext::None, None).await;
        assert_eq!(value(status.outcome.unwrap())["depth"], 1);

        let received = core.handle("fabric.message.receive", json!({"agent_id": "b", "count": 10}), AuthContext::None, None).await;
        let messages = value(received.outcome.unwrap());
        assert_eq!(messages["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_operation_is_bad_input() {
        let core = fixture().await;
        let response = core.handle("fabric.nonsense", json!({}), AuthContext::None, None).await;
        assert_eq!(response.outcome.unwrap_err().code(), ErrorCode::BadInput);
    }
}
