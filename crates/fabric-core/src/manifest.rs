use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Local,
    Org,
    Public,
}

impl TrustTier {
    /// Ranking used by route-preview fallback ordering: local < org < public.
    pub fn rank(self) -> u8 {
        match self {
            TrustTier::Local => 0,
            TrustTier::Org => 1,
            TrustTier::Public => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
    Degraded,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub transport: String,
    pub uri: String,
}

/// An agent's identifying record: capability surface, endpoint, trust tier.
///
/// `agent_id` is globally unique. `status`/`last_seen` are mutable in place;
/// everything else is replaced wholesale on re-registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub agent_id: String,
    pub display_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub runtime_kind: String,
    pub endpoint: Endpoint,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_trust_tier")]
    pub trust_tier: TrustTier,
    #[serde(default = "default_status")]
    pub status: AgentStatus,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_trust_tier() -> TrustTier {
    TrustTier::Org
}

fn default_status() -> AgentStatus {
    AgentStatus::Unknown
}

impl AgentManifest {
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }

    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }
}
