//! HTTP surface over the dispatch core: one envelope endpoint (promoted to
//! an SSE stream for streaming calls), health/metrics endpoints, and the
//! auth gate that verifies credentials before dispatch ever sees them.

mod auth;
mod routes;

pub use auth::AuthMode;
pub use routes::{router, GatewayState};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fabric_agents::AgentRegistry;
    use fabric_dispatch::DispatchCore;
    use fabric_messaging::MessageBus;
    use fabric_tools::register_builtin_tools;
    use tower::ServiceExt;

    use super::*;

    fn state(auth_mode: AuthMode) -> GatewayState {
        let dispatch = DispatchCore::new(
            Arc::new(AgentRegistry::new()),
            Arc::new(register_builtin_tools()),
            Arc::new(MessageBus::new()),
            Arc::new(fabric_core::ObservabilitySink::default()),
        );
        GatewayState { dispatch: Arc::new(dispatch), auth_mode }
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok_status() {
        let app = router(state(AuthMode::Disabled));
        let response = app
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn call_without_token_is_auth_denied_when_psk_required() {
        let app = router(state(AuthMode::PreSharedKey { token: "secret".to_string() }));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/call")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"fabric.health","arguments":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["error"]["code"], "AUTH_DENIED");
    }

    #[tokio::test]
    async fn call_with_valid_token_dispatches() {
        let app = router(state(AuthMode::PreSharedKey { token: "secret".to_string() }));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/call")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer secret")
                    .body(Body::from(r#"{"name":"fabric.health","arguments":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["ok"], true);
    }

    #[tokio::test]
    async fn unknown_operation_surfaces_as_structured_error() {
        let app = router(state(AuthMode::Disabled));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/call")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"fabric.nonsense","arguments":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"]["code"], "BAD_INPUT");
    }
}
