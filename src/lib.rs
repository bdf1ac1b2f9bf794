//! Wiring that turns a loaded [`config::Config`] into a runnable gateway:
//! the process-wide registries, the messaging layer, the dispatch core,
//! and the HTTP-facing state built on top of it.

pub mod cli;
pub mod config;

use std::sync::Arc;
use std::time::Duration;

use fabric_agents::AgentRegistry;
use fabric_core::ObservabilitySink;
use fabric_dispatch::DispatchCore;
use fabric_gateway::{AuthMode, GatewayState};
use fabric_messaging::MessageBus;
use fabric_tools::register_builtin_tools;

/// Everything a transport (HTTP or stdio) needs to serve requests, plus the
/// agent registry handle the periodic health sweep runs against directly.
pub struct Gateway {
    pub agents: Arc<AgentRegistry>,
    pub state: GatewayState,
}

pub fn auth_mode(config: &config::Config) -> AuthMode {
    match config.auth_mode {
        config::AuthModeKind::None => AuthMode::Disabled,
        config::AuthModeKind::PreSharedKey => {
            AuthMode::PreSharedKey { token: config.psk.clone().unwrap_or_default() }
        }
        config::AuthModeKind::Passport => AuthMode::Passport { trusted_keys: config.passport_keys.clone() },
    }
}

pub fn build(config: &config::Config) -> Gateway {
    let agents = Arc::new(AgentRegistry::with_staleness(Duration::from_secs(config.health_staleness_secs)));
    let tools = Arc::new(register_builtin_tools());
    let messages = Arc::new(MessageBus::new());
    let observability = Arc::new(ObservabilitySink::default());
    let dispatch = Arc::new(DispatchCore::new(agents.clone(), tools, messages, observability));

    Gateway { agents, state: GatewayState { dispatch, auth_mode: auth_mode(config) } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_psk_mode_carries_token_through() {
        let mut config = config::Config::default();
        config.auth_mode = config::AuthModeKind::PreSharedKey;
        config.psk = Some("topsecret".to_string());
        let gateway = build(&config);
        assert!(matches!(gateway.state.auth_mode, AuthMode::PreSharedKey { .. }));
    }
}
