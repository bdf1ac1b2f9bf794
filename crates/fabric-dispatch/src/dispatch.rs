use std::sync::Arc;

use fabric_agents::{AgentRegistry, ListFilter};
use fabric_core::{
    AgentManifest, AgentStatus, AuthContext, CallEnvelope, CallInput, CallLogRecord, ErrorCode,
    FabricError, FabricResult, Message, ObservabilitySink, Priority, ResponseOptions, StreamEvent,
    Target, TargetKind, TraceContext,
};
use futures_util::stream::BoxStream;
use fabric_messaging::MessageBus;
use fabric_tools::ToolRegistry;
use serde_json::{Value, json};
use tracing::{info_span, Instrument};

use crate::operation::{self, Operation};

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// What a dispatched call produced: an immediate value, or a handoff to the
/// streaming channel for the caller to drive.
pub enum DispatchOutcome {
    Value(Value),
    Stream(BoxStream<'static, StreamEvent>),
}

/// Always carries the trace context, win or lose, so a client can correlate
/// a failure with the call-log entry that recorded it.
pub struct DispatchResponse {
    pub trace: TraceContext,
    pub outcome: FabricResult<DispatchOutcome>,
}

/// Routes an operation name plus a JSON argument bag to the agent registry,
/// tool registry, or messaging layer, building and invoking a `CallEnvelope`
/// where the operation targets an adapter.
pub struct DispatchCore {
    agents: Arc<AgentRegistry>,
    tools: Arc<ToolRegistry>,
    messages: Arc<MessageBus>,
    observability: Arc<ObservabilitySink>,
}

impl DispatchCore {
    pub fn new(
        agents: Arc<AgentRegistry>,
        tools: Arc<ToolRegistry>,
        messages: Arc<MessageBus>,
        observability: Arc<ObservabilitySink>,
    ) -> Self {
        Self { agents, tools, messages, observability }
    }

    /// Entry point. `inherited_trace_id` carries a caller-supplied trace id
    /// forward (e.g. from an HTTP header); absent, a fresh trace is rooted
    /// here. Auth is assumed already verified by the caller — this layer
    /// only consumes the resulting `AuthContext`, it does not parse
    /// credentials itself.
    pub async fn handle(
        &self,
        name: &str,
        arguments: Value,
        auth: AuthContext,
        inherited_trace_id: Option<String>,
    ) -> DispatchResponse {
        let trace = match inherited_trace_id {
            Some(id) => TraceContext::with_trace_id(id),
            None => TraceContext::new_root(),
        };

        let span = info_span!("dispatch", trace_id = %trace.trace_id, span_id = %trace.span_id, operation = %name);
        let outcome = self.route(name, arguments, auth, &trace).instrument(span).await;
        DispatchResponse { trace, outcome }
    }

    async fn route(
        &self,
        name: &str,
        arguments: Value,
        auth: AuthContext,
        trace: &TraceContext,
    ) -> FabricResult<DispatchOutcome> {
        self.observability.record_auth_attempt();

        let Some(operation) = operation::parse(name) else {
            return Err(FabricError::new(ErrorCode::BadInput, format!("unknown operation '{name}'")));
        };

        match operation {
            Operation::AgentList => self.agent_list(&arguments).await,
            Operation::AgentDescribe => self.agent_describe(&arguments).await,
            Operation::Call => self.call(&arguments, auth, trace).await,
            Operation::RoutePreview => self.route_preview(&arguments).await,
            Operation::Health => self.health().await,
            Operation::ToolList => self.tool_list().await,
            Operation::ToolDescribe => self.tool_describe(&arguments).await,
            Operation::ToolCall => {
                let tool_id = require_str(&arguments, "tool_id")?.to_string();
                self.tool_call(&tool_id, &arguments, trace).await
            }
            Operation::ToolShortcut { tool_id } => self.tool_call(&tool_id, &arguments, trace).await,
            Operation::MessageSend => self.message_send(&arguments).await,
            Operation::MessageReceive => self.message_receive(&arguments).await,
            Operation::MessageAcknowledge => self.message_acknowledge(&arguments).await,
            Operation::MessagePublish => self.message_publish(&arguments).await,
            Operation::MessageQueueStatus => self.message_queue_status(&arguments).await,
        }
    }

    async fn agent_list(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let filter = ListFilter {
            capability: opt_str(arguments, "capability").map(str::to_string),
            tag: opt_str(arguments, "tag").map(str::to_string),
            status: opt_str(arguments, "status").and_then(parse_status),
        };
        let agents = self.agents.list(&filter).await;
        Ok(DispatchOutcome::Value(json!({ "agents": agents })))
    }

    async fn agent_describe(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let agent_id = require_str(arguments, "agent_id")?;
        let manifest = self
            .agents
            .get(agent_id)
            .await
            .ok_or_else(|| FabricError::new(ErrorCode::AgentNotFound, format!("agent not found: {agent_id}")))?;
        Ok(DispatchOutcome::Value(json!({ "agent": manifest })))
    }

    async fn call(&self, arguments: &Value, auth: AuthContext, trace: &TraceContext) -> FabricResult<DispatchOutcome> {
        let agent_id = require_str(arguments, "agent_id")?;
        let capability_name = require_str(arguments, "capability")?;
        let stream = arguments.get("stream").and_then(Value::as_bool).unwrap_or(false);

        let manifest = self
            .agents
            .get(agent_id)
            .await
            .ok_or_else(|| FabricError::new(ErrorCode::AgentNotFound, format!("agent not found: {agent_id}")))?;

        if manifest.status == AgentStatus::Offline {
            return Err(FabricError::new(ErrorCode::AgentOffline, format!("agent '{agent_id}' is offline")));
        }

        let capability = manifest.capability(capability_name).ok_or_else(|| {
            FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{capability_name}' not found on agent '{agent_id}'"),
            )
        })?;

        if stream && !capability.streaming {
            return Err(FabricError::new(
                ErrorCode::BadInput,
                format!("capability '{capability_name}' does not support streaming"),
            ));
        }

        let adapter = self
            .agents
            .adapter(agent_id)
            .await
            .ok_or_else(|| FabricError::new(ErrorCode::AgentNotFound, format!("agent not found: {agent_id}")))?;

        let timeout_ms = arguments
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .min(capability.max_timeout_ms);

        let envelope = CallEnvelope {
            trace: trace.child(),
            auth,
            target: Target {
                kind: TargetKind::Agent,
                id: agent_id.to_string(),
                capability: capability_name.to_string(),
                timeout_ms,
            },
            input: CallInput {
                task: opt_str(arguments, "task").map(str::to_string),
                context: arguments.get("context").cloned().unwrap_or(Value::Null),
                attachments: arguments
                    .get("attachments")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                arguments: Value::Null,
            },
            response: ResponseOptions {
                stream,
                format: arguments.get("format").and_then(Value::as_str).unwrap_or("json").to_string(),
            },
        };

        let mut log = CallLogRecord::start(
            trace.trace_id.clone(),
            envelope.trace.span_id.clone(),
            Some(trace.span_id.clone()),
            auth_principal(&envelope.auth),
            "agent".to_string(),
            agent_id.to_string(),
            Some(capability_name.to_string()),
            arguments.clone(),
            stream,
        );

        if stream {
            self.observability.stream_started();
            match adapter.call_stream(envelope).await {
                Ok(events) => {
                    log.finish_ok(json!({"streaming": true}));
                    self.observability.record_call(log);
                    Ok(DispatchOutcome::Stream(events))
                }
                Err(err) => {
                    self.observability.stream_finished();
                    log.finish_err(err.code().as_str());
                    self.observability.record_call(log);
                    Err(err)
                }
            }
        } else {
            match adapter.call(envelope).await {
                Ok(result) => {
                    log.finish_ok(result.clone());
                    self.observability.record_call(log);
                    Ok(DispatchOutcome::Value(json!({ "result": result })))
                }
                Err(err) => {
                    log.finish_err(err.code().as_str());
                    self.observability.record_call(log);
                    Err(err)
                }
            }
        }
    }

    /// Resolves the adapter that `fabric.call` would pick, plus a ranked
    /// fallback list, without invoking anything.
    async fn route_preview(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let capability_name = require_str(arguments, "capability")?;
        let requested_agent_id = opt_str(arguments, "agent_id");

        let candidates = self.agents.find_by_capability(capability_name).await;
        let primary = match requested_agent_id {
            Some(id) => candidates.iter().find(|m| m.agent_id == id).cloned(),
            None => None,
        };

        let primary_tags: Vec<String> = primary.as_ref().map(|m| m.tags.clone()).unwrap_or_default();
        let mut fallbacks: Vec<AgentManifest> = candidates
            .into_iter()
            .filter(|m| primary.as_ref().map(|p| p.agent_id != m.agent_id).unwrap_or(true))
            .collect();
        fallbacks.sort_by(|a, b| {
            let a_tag_match = shares_tag(&primary_tags, &a.tags);
            let b_tag_match = shares_tag(&primary_tags, &b.tags);
            b_tag_match.cmp(&a_tag_match).then(a.trust_tier.rank().cmp(&b.trust_tier.rank())).then(a.agent_id.cmp(&b.agent_id))
        });

        Ok(DispatchOutcome::Value(json!({
            "selected": primary,
            "fallbacks": fallbacks,
        })))
    }

    async fn health(&self) -> FabricResult<DispatchOutcome> {
        let snapshot = self.observability.snapshot();
        let agents = self.agents.list(&ListFilter::default()).await;
        let online = agents.iter().filter(|a| a.status == AgentStatus::Online).count();
        Ok(DispatchOutcome::Value(json!({
            "status": "ok",
            "agents_online": online,
            "agents_total": agents.len(),
            "observability": snapshot,
        })))
    }

    async fn tool_list(&self) -> FabricResult<DispatchOutcome> {
        let ids = self.tools.list();
        let descriptors: Vec<_> = ids.iter().filter_map(|id| self.tools.info(id)).collect();
        Ok(DispatchOutcome::Value(json!({ "tools": descriptors })))
    }

    async fn tool_describe(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let tool_id = require_str(arguments, "tool_id")?;
        let descriptor = self
            .tools
            .info(tool_id)
            .ok_or_else(|| FabricError::new(ErrorCode::ToolNotFound, format!("tool not found: {tool_id}")))?;
        Ok(DispatchOutcome::Value(json!({ "tool": descriptor })))
    }

    async fn tool_call(&self, tool_id: &str, arguments: &Value, trace: &TraceContext) -> FabricResult<DispatchOutcome> {
        let capability = require_str(arguments, "capability")?;
        let call_args = arguments.get("arguments").cloned().unwrap_or_else(|| json!({}));

        self.observability.record_tool_call();
        let mut log = CallLogRecord::start(
            trace.trace_id.clone(),
            trace.span_id.clone(),
            None,
            None,
            "tool".to_string(),
            tool_id.to_string(),
            Some(capability.to_string()),
            call_args.clone(),
            false,
        );

        match self.tools.execute(tool_id, capability, call_args).await {
            Ok(result) => {
                log.finish_ok(result.clone());
                self.observability.record_call(log);
                Ok(DispatchOutcome::Value(json!({ "result": result })))
            }
            Err(err) => {
                log.finish_err(err.code().as_str());
                self.observability.record_call(log);
                Err(err)
            }
        }
    }

    async fn message_send(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let from = require_str(arguments, "from")?;
        let to = require_str(arguments, "to")?;
        let message_type = require_str(arguments, "message_type")?;
        let payload = arguments.get("payload").cloned().unwrap_or_else(|| json!({}));

        let mut message = Message::new(from, to, message_type, payload);
        if let Some(priority) = opt_str(arguments, "priority").and_then(parse_priority) {
            message.priority = priority;
        }
        if let Some(ttl) = arguments.get("ttl_seconds").and_then(Value::as_u64) {
            message.ttl_seconds = ttl;
        }

        let sent = self.messages.send(message).await?;
        Ok(DispatchOutcome::Value(json!({
            "message_id": sent.message_id,
            "entry_id": sent.entry_id,
        })))
    }

    async fn message_receive(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let agent_id = require_str(arguments, "agent_id")?;
        let count = arguments.get("count").and_then(Value::as_u64).unwrap_or(10) as usize;
        let group = opt_str(arguments, "group");
        let consumer = opt_str(arguments, "consumer");

        let entries = match (group, consumer) {
            (Some(group), Some(consumer)) => self.messages.receive_group(agent_id, group, consumer, count).await?,
            (Some(_), None) => {
                return Err(FabricError::new(ErrorCode::BadInput, "consumer-group read requires 'consumer'"));
            }
            (None, _) => self.messages.receive(agent_id, count).await?,
        };

        Ok(DispatchOutcome::Value(json!({
            "messages": entries.iter().map(|e| json!({"entry_id": e.entry_id, "message": e.message})).collect::<Vec<_>>(),
        })))
    }

    async fn message_acknowledge(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let agent_id = require_str(arguments, "agent_id")?;
        let group = opt_str(arguments, "group");
        let message_ids = arguments
            .get("message_ids")
            .and_then(Value::as_array)
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing required field 'message_ids'"))?;

        let mut acknowledged = 0usize;
        for id in message_ids {
            let Some(id) = id.as_str() else { continue };
            if self.messages.acknowledge(agent_id, id, group).await? {
                acknowledged += 1;
            }
        }
        Ok(DispatchOutcome::Value(json!({ "acknowledged": acknowledged })))
    }

    async fn message_publish(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let topic = require_str(arguments, "topic")?;
        let data = arguments.get("data").cloned().unwrap_or(Value::Null);
        let from = opt_str(arguments, "from").map(str::to_string);
        let count = self.messages.publish(topic, data, from).await?;
        Ok(DispatchOutcome::Value(json!({ "subscriber_count": count })))
    }

    async fn message_queue_status(&self, arguments: &Value) -> FabricResult<DispatchOutcome> {
        let agent_id = require_str(arguments, "agent_id")?;
        let status = self.messages.queue_status(agent_id).await?;
        Ok(DispatchOutcome::Value(json!({
            "depth": status.depth,
            "pending_by_group": status.pending_by_group,
        })))
    }
}

fn shares_tag(a: &[String], b: &[String]) -> bool {
    !a.is_empty() && a.iter().any(|tag| b.contains(tag))
}

fn auth_principal(auth: &AuthContext) -> Option<String> {
    auth.principal_id().map(str::to_string)
}

fn require_str<'a>(value: &'a Value, field: &str) -> FabricResult<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| FabricError::new(ErrorCode::BadInput, format!("missing required field '{field}'")))
}

fn opt_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn parse_status(raw: &str) -> Option<AgentStatus> {
    match raw {
        "online" => Some(AgentStatus::Online),
        "offline" => Some(AgentStatus::Offline),
        "degraded" => Some(AgentStatus::Degraded),
        "unknown" => Some(AgentStatus::Unknown),
        _ => None,
    }
}

fn parse_priority(raw: &str) -> Option<Priority> {
    match raw {
        "low" => Some(Priority::Low),
        "normal" => Some(Priority::Normal),
        "high" => Some(Priority::High),
        "urgent" => Some(Priority::Urgent),
        _ => None,
    }
}
