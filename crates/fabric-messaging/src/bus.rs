use std::collections::HashMap;
use std::sync::Arc;

use fabric_core::{ErrorCode, FabricError, FabricResult, Message};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::pubsub::{TopicEnvelope, TopicHub};
use crate::stream::{InMemoryStream, PendingEntry, StreamEntry};

fn inbox_key(agent_id: &str) -> String {
    format!("agent:{agent_id}:inbox")
}

fn new_message_topic(agent_id: &str) -> String {
    format!("agent.{agent_id}.new_message")
}

pub struct SendResult {
    pub message_id: String,
    pub entry_id: String,
}

#[derive(Default)]
pub struct QueueStatus {
    pub depth: usize,
    pub pending_by_group: HashMap<String, usize>,
}

/// Facade over per-agent inbox streams and broadcast topics. One instance
/// is shared across the gateway; all state lives behind async locks so it
/// can be held in an `Arc` and cloned freely.
pub struct MessageBus {
    inboxes: Mutex<HashMap<String, InMemoryStream>>,
    topics: Mutex<TopicHub>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            inboxes: Mutex::new(HashMap::new()),
            topics: Mutex::new(TopicHub::new()),
        }
    }

    /// Append `message` to its recipient's inbox and fan out a
    /// `new_message` notification. Never fails on queue overflow — the
    /// oldest entries are trimmed silently per the capped length.
    pub async fn send(&self, message: Message) -> FabricResult<SendResult> {
        let to = message.to_agent.clone();
        let message_id = message.id.clone();

        let entry_id = {
            let mut inboxes = self.inboxes.lock().await;
            let stream = inboxes.entry(inbox_key(&to)).or_default();
            stream.append(message)
        };

        let mut topics = self.topics.lock().await;
        topics.publish(
            &new_message_topic(&to),
            serde_json::json!({ "message_id": message_id, "to": to }),
            None,
        );

        debug!("messaging: sent '{}' to inbox of '{}'", message_id, to);
        Ok(SendResult { message_id, entry_id })
    }

    /// Plain read: oldest `count` records still present in the inbox.
    pub async fn receive(&self, agent_id: &str, count: usize) -> FabricResult<Vec<StreamEntry>> {
        let inboxes = self.inboxes.lock().await;
        Ok(inboxes.get(&inbox_key(agent_id)).map(|s| s.read_plain(count)).unwrap_or_default())
    }

    /// Consumer-group read: entries not yet delivered to anyone in `group`,
    /// recorded as pending for `consumer` until acknowledged.
    pub async fn receive_group(
        &self,
        agent_id: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> FabricResult<Vec<StreamEntry>> {
        let mut inboxes = self.inboxes.lock().await;
        let stream = inboxes.entry(inbox_key(agent_id)).or_default();
        Ok(stream.read_group(group, consumer, count))
    }

    /// Acknowledge one entry. Plain mode (`group = None`) deletes the
    /// entry outright; group mode retires it from that group's pending set.
    pub async fn acknowledge(&self, agent_id: &str, entry_id: &str, group: Option<&str>) -> FabricResult<bool> {
        let mut inboxes = self.inboxes.lock().await;
        let Some(stream) = inboxes.get_mut(&inbox_key(agent_id)) else {
            return Err(FabricError::new(ErrorCode::BadInput, format!("unknown inbox for agent '{agent_id}'")));
        };
        Ok(match group {
            Some(group) => stream.ack(group, entry_id),
            None => stream.delete(entry_id),
        })
    }

    pub async fn pending(&self, agent_id: &str, group: &str) -> FabricResult<Vec<PendingEntry>> {
        let inboxes = self.inboxes.lock().await;
        Ok(inboxes.get(&inbox_key(agent_id)).map(|s| s.pending(group)).unwrap_or_default())
    }

    pub async fn queue_status(&self, agent_id: &str) -> FabricResult<QueueStatus> {
        let inboxes = self.inboxes.lock().await;
        let Some(stream) = inboxes.get(&inbox_key(agent_id)) else {
            return Ok(QueueStatus::default());
        };
        Ok(QueueStatus {
            depth: stream.len(),
            pending_by_group: stream.pending_counts(),
        })
    }

    pub async fn publish(&self, topic: &str, data: Value, from: Option<String>) -> FabricResult<usize> {
        let mut topics = self.topics.lock().await;
        Ok(topics.publish(topic, data, from))
    }

    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<TopicEnvelope> {
        self.topics.lock().await.subscribe(topic)
    }

    pub async fn subscribe_pattern(&self, glob: &str) -> Vec<(String, broadcast::Receiver<TopicEnvelope>)> {
        self.topics.lock().await.subscribe_pattern(glob)
    }

    /// Build the `reply_to`/`correlation_id` pair for a streaming
    /// request-over-messaging call and subscribe to the response channel
    /// before returning, so no frame published immediately after is missed.
    pub async fn prepare_response_channel(
        &self,
        caller_agent_id: &str,
    ) -> (String, String, broadcast::Receiver<TopicEnvelope>) {
        let correlation_id = Uuid::new_v4().to_string();
        let reply_to = format!("agent.{caller_agent_id}.response.{correlation_id}");
        let rx = self.subscribe(&reply_to).await;
        (reply_to, correlation_id, rx)
    }
}

pub type SharedMessageBus = Arc<MessageBus>;
