//! TOML file configuration structures.
//!
//! These structs directly map to the `tradeup-config.toml` file format.
//! Every section and field is optional.

use serde::Deserialize;
use std::net::SocketAddr;
use tradeup_sdk::objects::TradeupMode;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Pub/sub bus section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusConfig {
    /// Redis URL (e.g., "redis://127.0.0.1:6379"). Without it the server
    /// runs single-process on an in-memory bus.
    pub redis_url: Option<String>,
}

/// Pool lifecycle section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub capacity: u32,
    pub max_contribution_per_user: u32,
    pub timer_secs: u64,
    pub expiry_scan_secs: u64,
    pub maintenance_secs: u64,
    pub min_open_per_tier: u32,
    pub mode: TradeupMode,
    /// Fixed winner-draw seed, for reproducible test deployments.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_contribution_per_user: 5,
            timer_secs: 300,
            expiry_scan_secs: 60,
            maintenance_secs: 30,
            min_open_per_tier: 5,
            mode: TradeupMode::default(),
            rng_seed: None,
        }
    }
}

/// Broadcast scheduler section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub tick_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

/// Connection hub and WebSocket section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub outbound_queue: usize,
    pub ping_period_secs: u64,
    pub pong_wait_secs: u64,
    pub max_message_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue: 64,
            ping_period_secs: 54,
            pong_wait_secs: 60,
            max_message_size: 512,
        }
    }
}

/// Demo inventory granted at startup by the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub users: Vec<String>,
    /// Random skins granted per user for every tradeable tier.
    pub items_per_tier: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[bus]
redis_url = "redis://127.0.0.1:6379"

[engine]
capacity = 4
timer_secs = 10
mode = "Battle"

[broadcast]
tick_ms = 250

[hub]
outbound_queue = 16

[seed]
users = ["alice", "bob"]
items_per_tier = 3
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.bus.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.engine.capacity, 4);
        assert_eq!(config.engine.max_contribution_per_user, 5);
        assert_eq!(config.engine.mode, TradeupMode::Battle);
        assert_eq!(config.broadcast.tick_ms, 250);
        assert_eq!(config.hub.outbound_queue, 16);
        assert_eq!(config.hub.pong_wait_secs, 60);
        assert_eq!(config.seed.users.len(), 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert!(config.bus.redis_url.is_none());
        assert_eq!(config.engine.capacity, 10);
        assert_eq!(config.engine.mode, TradeupMode::Ffa);
        assert_eq!(config.hub.max_message_size, 512);
        assert!(config.seed.users.is_empty());
    }
}
