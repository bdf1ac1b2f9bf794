use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Started,
    Completed,
    Failed,
}

/// A structured record of one dispatch-core call, from submission through
/// completion or failure. `(trace_id, span_id)` is unique per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub principal_id: Option<String>,
    pub target_kind: String,
    pub target_id: String,
    pub capability: Option<String>,
    pub input: Value,
    pub output: Option<Value>,
    pub error_code: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub status: CallStatus,
    pub streaming: bool,
}

impl CallLogRecord {
    pub fn start(
        trace_id: String,
        span_id: String,
        parent_span_id: Option<String>,
        principal_id: Option<String>,
        target_kind: String,
        target_id: String,
        capability: Option<String>,
        input: Value,
        streaming: bool,
    ) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id,
            principal_id,
            target_kind,
            target_id,
            capability,
            input,
            output: None,
            error_code: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            status: CallStatus::Started,
            streaming,
        }
    }

    pub fn finish_ok(&mut self, output: Value) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.output = Some(output);
        self.status = CallStatus::Completed;
    }

    pub fn finish_err(&mut self, error_code: &str) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.error_code = Some(error_code.to_string());
        self.status = CallStatus::Failed;
    }
}
