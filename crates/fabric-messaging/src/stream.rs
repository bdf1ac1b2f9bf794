use std::collections::{HashMap, HashSet, VecDeque};

use fabric_core::Message;
use uuid::Uuid;

const DEFAULT_MAXLEN: usize = 10_000;

#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub entry_id: String,
    pub message: Message,
}

#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub entry_id: String,
    pub consumer: String,
    pub delivery_count: u32,
}

/// Per-group delivery bookkeeping: a cursor into the log for messages not
/// yet handed to any consumer in the group, plus a pending set for
/// delivered-but-unacked entries awaiting `ack`/redelivery.
#[derive(Default)]
struct GroupState {
    next_unread: usize,
    pending: HashMap<String, PendingEntry>,
}

/// An append-only, capped log of messages for one agent's inbox, with
/// Redis-Streams-like consumer-group delivery tracking. Plain reads pull
/// oldest-first and acknowledgement deletes the entry; consumer-group reads
/// track delivery per `(group, consumer)` and require an explicit `ack`
/// or the entry reappears in that group's pending list.
#[derive(Default)]
pub struct InMemoryStream {
    entries: VecDeque<StreamEntry>,
    groups: HashMap<String, GroupState>,
    maxlen: usize,
}

impl InMemoryStream {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            groups: HashMap::new(),
            maxlen: DEFAULT_MAXLEN,
        }
    }

    pub fn append(&mut self, message: Message) -> String {
        let entry_id = format!("{}-{}", chrono::Utc::now().timestamp_millis(), Uuid::new_v4());
        self.entries.push_back(StreamEntry {
            entry_id: entry_id.clone(),
            message,
        });
        while self.entries.len() > self.maxlen {
            self.entries.pop_front();
        }
        entry_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain read: oldest `count` entries still present in the log.
    pub fn read_plain(&self, count: usize) -> Vec<StreamEntry> {
        self.entries.iter().take(count).cloned().collect()
    }

    /// Delete an entry outright (plain-mode acknowledgement).
    pub fn delete(&mut self, entry_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.entry_id != entry_id);
        self.entries.len() != before
    }

    /// Consumer-group read: hands out entries this group hasn't yet
    /// delivered to anyone, advancing the group's cursor and recording
    /// each as pending for `consumer`. Group is created lazily.
    pub fn read_group(&mut self, group: &str, consumer: &str, count: usize) -> Vec<StreamEntry> {
        let state = self.groups.entry(group.to_string()).or_default();
        let start = state.next_unread.min(self.entries.len());
        let delivered: Vec<StreamEntry> = self.entries.iter().skip(start).take(count).cloned().collect();

        for entry in &delivered {
            state.pending.insert(
                entry.entry_id.clone(),
                PendingEntry {
                    entry_id: entry.entry_id.clone(),
                    consumer: consumer.to_string(),
                    delivery_count: 1,
                },
            );
        }
        state.next_unread = start + delivered.len();
        delivered
    }

    /// Acknowledge a delivered entry for `group`, retiring it from the
    /// pending list. Does not remove the entry from the shared log —
    /// other groups may not have read it yet.
    pub fn ack(&mut self, group: &str, entry_id: &str) -> bool {
        self.groups
            .get_mut(group)
            .map(|state| state.pending.remove(entry_id).is_some())
            .unwrap_or(false)
    }

    /// Entries delivered to `group` but not yet acknowledged.
    pub fn pending(&self, group: &str) -> Vec<PendingEntry> {
        self.groups
            .get(group)
            .map(|state| {
                let mut items: Vec<PendingEntry> = state.pending.values().cloned().collect();
                items.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
                items
            })
            .unwrap_or_default()
    }

    /// Pending-entry count per consumer group, for queue-status reporting.
    pub fn pending_counts(&self) -> HashMap<String, usize> {
        self.groups.iter().map(|(group, state)| (group.clone(), state.pending.len())).collect()
    }

    /// Redeliver pending entries older than the caller's liveness window to
    /// a new consumer (crash recovery for stuck consumers).
    pub fn claim_stale(&mut self, group: &str, new_consumer: &str, stale_consumer: &str) -> Vec<StreamEntry> {
        let Some(state) = self.groups.get_mut(group) else {
            return Vec::new();
        };
        let mut reclaimed_ids = HashSet::new();
        for entry in state.pending.values_mut() {
            if entry.consumer == stale_consumer {
                entry.consumer = new_consumer.to_string();
                entry.delivery_count += 1;
                reclaimed_ids.insert(entry.entry_id.clone());
            }
        }
        self.entries
            .iter()
            .filter(|e| reclaimed_ids.contains(&e.entry_id))
            .cloned()
            .collect()
    }
}
