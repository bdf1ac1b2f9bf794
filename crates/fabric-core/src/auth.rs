use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated principal produced by the auth gate.
///
/// Immutable after verification. Carries the verification mode plus
/// whichever mode-specific fields applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AuthContext {
    PreSharedKey {
        principal_id: Option<String>,
        key_id: Option<String>,
    },
    Passport {
        principal_id: String,
        passport_id: String,
        key_id: String,
    },
    MutualTls {
        principal_id: Option<String>,
    },
    None,
}

impl AuthContext {
    pub fn principal_id(&self) -> Option<&str> {
        match self {
            AuthContext::PreSharedKey { principal_id, .. } => principal_id.as_deref(),
            AuthContext::Passport { principal_id, .. } => Some(principal_id.as_str()),
            AuthContext::MutualTls { principal_id } => principal_id.as_deref(),
            AuthContext::None => None,
        }
    }
}

/// Wire shape of a passport credential, verified by the auth gate against a
/// trusted key. Expiry is checked before signature validity is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passport {
    pub principal_id: String,
    pub passport_id: String,
    pub key_id: String,
    pub signature: String,
    pub expiry: DateTime<Utc>,
}
