use serde::{Deserialize, Serialize};

/// Generates an opaque id that is globally unique with high probability.
///
/// Deliberately not a full UUID dependency at this call site — trace/span
/// ids are logged constantly and a shorter id keeps log lines readable.
/// Collision probability at this length is negligible for a single
/// process's lifetime.
fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Per-request trace/span context, propagated through every call.
///
/// Immutable after construction. A child span inherits `trace_id` and sets
/// `parent_span_id` to the parent's `span_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
}

impl TraceContext {
    /// Starts a fresh trace (no parent), used when a request arrives with no
    /// `trace_id` of its own.
    pub fn new_root() -> Self {
        Self {
            trace_id: new_id("trace"),
            span_id: new_id("span"),
            parent_span_id: None,
        }
    }

    /// Builds a trace context that inherits a caller-supplied `trace_id`,
    /// always minting a fresh `span_id`.
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: new_id("span"),
            parent_span_id: None,
        }
    }

    /// Derives a child span: same trace, new span id, parent pointing at us.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_id("span"),
            parent_span_id: Some(self.span_id.clone()),
        }
    }
}
