use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

const TOPIC_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TopicEnvelope {
    pub topic: String,
    pub data: Value,
    pub from: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// One `broadcast` channel per topic. Subscriptions are best-effort — a
/// subscriber that joins after a publish never sees it, matching the
/// no-replay contract.
#[derive(Default)]
pub struct TopicHub {
    topics: HashMap<String, broadcast::Sender<TopicEnvelope>>,
}

impl TopicHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&mut self, topic: &str) -> broadcast::Sender<TopicEnvelope> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publish to an exact topic, returning the number of current
    /// subscribers that received it.
    pub fn publish(&mut self, topic: &str, data: Value, from: Option<String>) -> usize {
        let sender = self.sender_for(topic);
        let envelope = TopicEnvelope {
            topic: topic.to_string(),
            data,
            from,
            timestamp: chrono::Utc::now(),
        };
        sender.send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&mut self, topic: &str) -> broadcast::Receiver<TopicEnvelope> {
        self.sender_for(topic).subscribe()
    }

    /// Pattern subscription: one receiver per currently-live topic whose
    /// name matches `glob` (`*` = any run of non-dot characters). New
    /// topics created after this call are not picked up — matching a glob
    /// against channels created later would require a wildcard fan-in
    /// channel this hub doesn't maintain.
    pub fn subscribe_pattern(&mut self, glob: &str) -> Vec<(String, broadcast::Receiver<TopicEnvelope>)> {
        let Some(regex) = glob_to_regex(glob) else {
            warn!("pubsub: invalid glob pattern '{}'", glob);
            return Vec::new();
        };
        let matching: Vec<String> = self.topics.keys().filter(|t| regex.is_match(t)).cloned().collect();
        matching.into_iter().map(|t| (t.clone(), self.sender_for(&t).subscribe())).collect()
    }
}

fn glob_to_regex(glob: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str("[^.]*"),
            '.' => pattern.push_str("\\."),
            other => pattern.push(other),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}
