use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fabric_core::{AgentManifest, AgentStatus, RuntimeAdapter};
use tokio::sync::RwLock;
use tracing::{info, warn};

const DEFAULT_STALENESS: Duration = Duration::from_secs(5 * 60);

struct Entry {
    manifest: AgentManifest,
    adapter: Arc<dyn RuntimeAdapter>,
}

/// `agent_id -> (manifest, adapter)` store. Reads (`get`/`list`/
/// `find_by_capability`) take the read lock; writes take the write lock —
/// reads dominate in steady state so an `RwLock` fits better here than a
/// plain mutex guarding the whole map.
#[derive(Default)]
pub struct AgentRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    staleness: Duration,
}

#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub capability: Option<String>,
    pub tag: Option<String>,
    pub status: Option<AgentStatus>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            staleness: DEFAULT_STALENESS,
        }
    }

    pub fn with_staleness(staleness: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            staleness,
        }
    }

    /// Atomic upsert. Re-registering an id replaces the capability set,
    /// endpoint, tags, and trust tier wholesale; `last_seen` is refreshed
    /// and `status` set to `online`.
    pub async fn register(&self, mut manifest: AgentManifest, adapter: Arc<dyn RuntimeAdapter>) {
        manifest.last_seen = Some(Utc::now());
        manifest.status = AgentStatus::Online;
        let id = manifest.agent_id.clone();
        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            info!("agent registry: re-registering '{}'", id);
        } else {
            info!("agent registry: registering '{}'", id);
        }
        entries.insert(id, Entry { manifest, adapter });
    }

    pub async fn unregister(&self, agent_id: &str) -> bool {
        self.entries.write().await.remove(agent_id).is_some()
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentManifest> {
        self.entries.read().await.get(agent_id).map(|e| e.manifest.clone())
    }

    pub async fn adapter(&self, agent_id: &str) -> Option<Arc<dyn RuntimeAdapter>> {
        self.entries.read().await.get(agent_id).map(|e| e.adapter.clone())
    }

    pub async fn list(&self, filter: &ListFilter) -> Vec<AgentManifest> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| &e.manifest)
            .filter(|m| filter.capability.as_deref().is_none_or(|c| m.has_capability(c)))
            .filter(|m| filter.tag.as_deref().is_none_or(|t| m.tags.iter().any(|tag| tag == t)))
            .filter(|m| filter.status.is_none_or(|s| m.status == s))
            .cloned()
            .collect()
    }

    pub async fn find_by_capability(&self, name: &str) -> Vec<AgentManifest> {
        self.list(&ListFilter {
            capability: Some(name.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn update_status(&self, agent_id: &str, status: AgentStatus) -> bool {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(agent_id) else {
            return false;
        };
        entry.manifest.status = status;
        if status != AgentStatus::Offline {
            entry.manifest.last_seen = Some(Utc::now());
        }
        true
    }

    /// One pass of the periodic health sweep. Agents whose last successful
    /// sighting is older than the staleness threshold are declared
    /// `offline` without invoking the adapter; everyone else gets a live
    /// `health()` call.
    pub async fn sweep_health(&self) {
        let now = Utc::now();
        let candidates: Vec<(String, Arc<dyn RuntimeAdapter>, bool)> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .map(|(id, entry)| {
                    let stale = entry
                        .manifest
                        .last_seen
                        .map(|seen| {
                            now.signed_duration_since(seen).to_std().unwrap_or(Duration::ZERO) > self.staleness
                        })
                        .unwrap_or(false);
                    (id.clone(), entry.adapter.clone(), stale)
                })
                .collect()
        };

        for (id, adapter, stale) in candidates {
            let status = if stale {
                warn!("agent registry: '{}' exceeded staleness threshold, marking offline", id);
                AgentStatus::Offline
            } else {
                adapter.health().await
            };
            self.update_status(&id, status).await;
        }
    }
}
