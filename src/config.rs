use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_health_staleness_secs() -> u64 {
    300
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthModeKind {
    #[default]
    None,
    PreSharedKey,
    Passport,
}

/// Process configuration, loaded once at startup. `psk` may be overridden
/// by the `FABRIC_PSK` environment variable so a shared-secret deployment
/// never needs the token committed to a config file on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub auth_mode: AuthModeKind,
    #[serde(default)]
    pub psk: Option<String>,
    #[serde(default)]
    pub passport_keys: HashMap<String, String>,
    #[serde(default)]
    pub tool_config: serde_json::Map<String, Value>,
    #[serde(default = "default_health_staleness_secs")]
    pub health_staleness_secs: u64,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Loads from `path` if given, falling back to defaults when absent.
    /// Always applies the `FABRIC_PSK` environment override afterward.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config from {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse config JSON from {}", path.display()))?
            }
            Some(path) => {
                anyhow::bail!("config file not found: {}", path.display());
            }
            None => Config::default(),
        };

        if let Ok(psk) = std::env::var("FABRIC_PSK") {
            config.psk = Some(psk);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_auth_and_stated_port() {
        let config = Config::default();
        assert_eq!(config.auth_mode, AuthModeKind::None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.health_staleness_secs, 300);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/fabric-config.json"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
