//! Durable-in-process messaging: per-agent inbox streams with consumer
//! groups, and pub/sub broadcast topics.

mod bus;
mod pubsub;
mod stream;

pub use bus::{MessageBus, QueueStatus, SendResult, SharedMessageBus};
pub use pubsub::TopicEnvelope;
pub use stream::{PendingEntry, StreamEntry};

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::Message;
    use serde_json::json;

    #[tokio::test]
    async fn send_then_receive_plain_round_trips() {
        let bus = MessageBus::new();
        let message = Message::new("alice", "bob", "task", json!({"do": "it"}));
        let sent_id = message.id.clone();
        bus.send(message).await.unwrap();

        let received = bus.receive("bob", 10).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message.id, sent_id);
    }

    #[tokio::test]
    async fn consumer_group_delivers_each_message_once() {
        let bus = MessageBus::new();
        for _ in 0..10 {
            bus.send(Message::new("alice", "carol", "task", json!({}))).await.unwrap();
        }

        let a = bus.receive_group("carol", "workers", "c1", 10).await.unwrap();
        let b = bus.receive_group("carol", "workers", "c2", 10).await.unwrap();
        assert_eq!(a.len(), 10);
        assert!(b.is_empty());
    }

    #[tokio::test]
    async fn group_ack_retires_pending_entry() {
        let bus = MessageBus::new();
        bus.send(Message::new("alice", "dave", "task", json!({}))).await.unwrap();
        let delivered = bus.receive_group("dave", "g", "c1", 10).await.unwrap();
        assert_eq!(bus.pending("dave", "g").await.unwrap().len(), 1);

        bus.acknowledge("dave", &delivered[0].entry_id, Some("g")).await.unwrap();
        assert!(bus.pending("dave", "g").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_message_notification_is_published() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe("agent.erin.new_message").await;
        bus.send(Message::new("alice", "erin", "task", json!({}))).await.unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.topic, "agent.erin.new_message");
    }

    #[tokio::test]
    async fn response_channel_is_subscribed_before_send() {
        let bus = MessageBus::new();
        let (reply_to, correlation_id, mut rx) = bus.prepare_response_channel("alice").await;
        assert!(reply_to.contains(&correlation_id));

        bus.publish(&reply_to, json!({"final": true}), Some("callee".to_string())).await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.data, json!({"final": true}));
    }
}
