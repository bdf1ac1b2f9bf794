use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;

use crate::calllog::CallLogRecord;

const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Label tuple identifying one latency/counter series:
/// `(target_kind, target_id, capability)`.
pub type MetricKey = (String, String, Option<String>);

#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    fn observe(&mut self, ms: f64) {
        self.count += 1;
        self.total_ms += ms;
        if ms > self.max_ms {
            self.max_ms = ms;
        }
    }

    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ObservabilitySnapshot {
    pub total_calls: u64,
    pub total_errors: u64,
    pub active_streams: u64,
    pub auth_attempts: u64,
    pub tool_calls: u64,
    pub recent_logs: Vec<CallLogRecord>,
}

/// Write-biased sink for call logs, counters/gauges, and latency
/// observations. Reads return aggregate snapshots for `fabric.health`
/// and for tests. All updates commute, so a single internal mutex is
/// sufficient.
pub struct ObservabilitySink {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    logs: VecDeque<CallLogRecord>,
    total_calls: u64,
    total_errors: u64,
    active_streams: i64,
    auth_attempts: u64,
    tool_calls: u64,
    latencies: HashMap<MetricKey, LatencyStats>,
}

impl Default for ObservabilitySink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ObservabilitySink {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                logs: VecDeque::with_capacity(log_capacity.min(1024)),
                ..Default::default()
            }),
        }
    }

    /// Records a call-log record (start or a start+finish pair collapsed
    /// into one record, per `CallLogRecord::finish_ok`/`finish_err`).
    pub fn record_call(&self, record: CallLogRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.total_calls += 1;
        if matches!(record.status, crate::calllog::CallStatus::Failed) {
            inner.total_errors += 1;
            metrics::counter!("fabric_errors_total").increment(1);
        }
        metrics::counter!(
            "fabric_calls_total",
            "target_kind" => record.target_kind.clone(),
            "target_id" => record.target_id.clone(),
        )
        .increment(1);
        if let Some(ms) = record.duration_ms {
            let key = (
                record.target_kind.clone(),
                record.target_id.clone(),
                record.capability.clone(),
            );
            inner.latencies.entry(key).or_default().observe(ms as f64);
            metrics::histogram!("fabric_call_duration_ms").record(ms as f64);
        }
        let cap = inner.logs.capacity().max(DEFAULT_LOG_CAPACITY);
        if inner.logs.len() >= cap {
            inner.logs.pop_front();
        }
        inner.logs.push_back(record);
    }

    pub fn record_auth_attempt(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.auth_attempts += 1;
        metrics::counter!("fabric_auth_attempts_total").increment(1);
    }

    pub fn record_tool_call(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.tool_calls += 1;
        metrics::counter!("fabric_tool_calls_total").increment(1);
    }

    pub fn stream_started(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.active_streams += 1;
        metrics::gauge!("fabric_active_streams").set(inner.active_streams as f64);
    }

    pub fn stream_finished(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.active_streams = (inner.active_streams - 1).max(0);
        metrics::gauge!("fabric_active_streams").set(inner.active_streams as f64);
    }

    pub fn snapshot(&self) -> ObservabilitySnapshot {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        ObservabilitySnapshot {
            total_calls: inner.total_calls,
            total_errors: inner.total_errors,
            active_streams: inner.active_streams.max(0) as u64,
            auth_attempts: inner.auth_attempts,
            tool_calls: inner.tool_calls,
            recent_logs: inner.logs.iter().rev().take(50).cloned().collect(),
        }
    }

    pub fn latency_for(&self, key: &MetricKey) -> Option<LatencyStats> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.latencies.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record(status: crate::calllog::CallStatus) -> CallLogRecord {
        let mut rec = CallLogRecord::start(
            "t1".into(),
            "s1".into(),
            None,
            None,
            "tool".into(),
            "io.read_file".into(),
            Some("read".into()),
            json!({}),
            false,
        );
        match status {
            crate::calllog::CallStatus::Completed => rec.finish_ok(json!({"ok": true})),
            crate::calllog::CallStatus::Failed => rec.finish_err("TOOL_NOT_FOUND"),
            crate::calllog::CallStatus::Started => {}
        }
        rec
    }

    #[test]
    fn snapshot_counts_calls_and_errors() {
        let sink = ObservabilitySink::default();
        sink.record_call(sample_record(crate::calllog::CallStatus::Completed));
        sink.record_call(sample_record(crate::calllog::CallStatus::Failed));
        let snap = sink.snapshot();
        assert_eq!(snap.total_calls, 2);
        assert_eq!(snap.total_errors, 1);
        assert_eq!(snap.recent_logs.len(), 2);
    }

    #[test]
    fn stream_gauge_never_goes_negative() {
        let sink = ObservabilitySink::default();
        sink.stream_finished();
        assert_eq!(sink.snapshot().active_streams, 0);
        sink.stream_started();
        assert_eq!(sink.snapshot().active_streams, 1);
        sink.stream_finished();
        assert_eq!(sink.snapshot().active_streams, 0);
    }

    #[test]
    fn latency_tracked_per_key() {
        let sink = ObservabilitySink::default();
        sink.record_call(sample_record(crate::calllog::CallStatus::Completed));
        let stats = sink
            .latency_for(&(
                "tool".to_string(),
                "io.read_file".to_string(),
                Some("read".to_string()),
            ))
            .expect("latency recorded");
        assert_eq!(stats.count, 1);
    }
}
