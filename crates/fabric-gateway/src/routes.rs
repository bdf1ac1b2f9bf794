use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fabric_core::{AuthContext, ErrorBody, FabricError, StreamEventKind, TraceContext};
use fabric_dispatch::{DispatchCore, DispatchOutcome};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::auth::{self, AuthMode};

#[derive(Clone)]
pub struct GatewayState {
    pub dispatch: Arc<DispatchCore>,
    pub auth_mode: AuthMode,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/call", post(call_handler))
        .route("/v1/health", get(health_handler))
        .route("/v1/metrics", get(metrics_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct EnvelopeRequest {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

fn authenticate(state: &GatewayState, headers: &HeaderMap) -> Result<AuthContext, FabricError> {
    let header = headers.get("authorization").and_then(|v| v.to_str().ok());
    auth::verify(&state.auth_mode, header)
}

fn trace_id_header(headers: &HeaderMap) -> Option<String> {
    headers.get("x-trace-id").and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// `POST /v1/call` — the single JSON-over-HTTP front door. Promotes to an
/// event stream when the dispatched call resolves to a streaming outcome.
async fn call_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<EnvelopeRequest>,
) -> axum::response::Response {
    let auth = match authenticate(&state, &headers) {
        Ok(auth) => auth,
        Err(err) => return error_response(None, &err),
    };

    let response = state.dispatch.handle(&body.name, body.arguments, auth, trace_id_header(&headers)).await;
    let trace = response.trace;

    match response.outcome {
        Ok(DispatchOutcome::Value(result)) => {
            Json(json!({ "ok": true, "result": result, "trace": trace })).into_response()
        }
        Ok(DispatchOutcome::Stream(events)) => {
            let sse_stream = events.map(|event| -> Result<Event, Infallible> {
                Ok(Event::default().event(event_name(&event.event)).json_data(event.data).unwrap_or_default())
            });
            Sse::new(sse_stream).keep_alive(KeepAlive::default()).into_response()
        }
        Err(err) => error_response(Some(trace), &err),
    }
}

fn event_name(kind: &StreamEventKind) -> &'static str {
    match kind {
        StreamEventKind::Status => "status",
        StreamEventKind::Token => "token",
        StreamEventKind::Progress => "progress",
        StreamEventKind::Error => "error",
        StreamEventKind::Final => "final",
        StreamEventKind::Completed => "completed",
    }
}

fn error_response(trace: Option<TraceContext>, err: &FabricError) -> axum::response::Response {
    let body = ErrorBody::from(err);
    warn!("gateway: call failed with {}", body.code);
    Json(json!({ "ok": false, "error": body, "trace": trace })).into_response()
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let response = state.dispatch.handle("fabric.health", serde_json::Value::Null, AuthContext::None, None).await;
    match response.outcome {
        Ok(DispatchOutcome::Value(result)) => (StatusCode::OK, Json(result)).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status": "error"}))).into_response(),
    }
}

/// Thin adapter over the observability sink, exposed as plain JSON rather
/// than a Prometheus exposition format — no scrape target is wired up by
/// this binary, so the richer format buys nothing yet.
async fn metrics_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let response = state.dispatch.handle("fabric.health", serde_json::Value::Null, AuthContext::None, None).await;
    match response.outcome {
        Ok(DispatchOutcome::Value(result)) => Json(result["observability"].clone()).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response(),
    }
}
