//! Configuration module for tradeup-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! turns it into the runtime types of `tradeup_core::config`.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tradeup_core::config::{BroadcastConfig, EngineConfig, HubConfig};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Validated configuration, ready to wire the server.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub redis_url: Option<String>,
    pub engine: EngineConfig,
    pub broadcast: BroadcastConfig,
    pub hub: HubConfig,
    pub seed: file::SeedConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    redis_override: Option<String>,
}

impl ConfigLoader {
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        redis_override: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            redis_override,
        }
    }

    /// Read the TOML file, apply CLI overrides and validate.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        self.build(file_config)
    }

    fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(url) = &self.redis_override {
            file_config.bus.redis_url = Some(url.clone());
        }

        validate(&file_config)?;

        let engine = &file_config.engine;
        let hub = &file_config.hub;
        Ok(LoadedConfig {
            listen: file_config.server.listen,
            redis_url: file_config.bus.redis_url.clone(),
            engine: EngineConfig {
                capacity: engine.capacity,
                max_contribution_per_user: engine.max_contribution_per_user,
                timer: Duration::from_secs(engine.timer_secs),
                expiry_scan_interval: Duration::from_secs(engine.expiry_scan_secs),
                maintenance_interval: Duration::from_secs(engine.maintenance_secs),
                min_open_per_tier: engine.min_open_per_tier,
                mode: engine.mode,
                rng_seed: engine.rng_seed,
            },
            broadcast: BroadcastConfig {
                tick: Duration::from_millis(file_config.broadcast.tick_ms),
            },
            hub: HubConfig {
                outbound_queue: hub.outbound_queue,
                ping_period: Duration::from_secs(hub.ping_period_secs),
                pong_wait: Duration::from_secs(hub.pong_wait_secs),
                max_message_size: hub.max_message_size,
            },
            seed: file_config.seed.clone(),
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.engine.capacity == 0 {
        return invalid("engine.capacity must be at least 1");
    }
    if config.engine.max_contribution_per_user == 0 {
        return invalid("engine.max_contribution_per_user must be at least 1");
    }
    if config.engine.expiry_scan_secs == 0 || config.engine.maintenance_secs == 0 {
        return invalid("engine scan and maintenance intervals must be non-zero");
    }
    if config.broadcast.tick_ms == 0 {
        return invalid("broadcast.tick_ms must be non-zero");
    }
    if config.hub.outbound_queue == 0 {
        return invalid("hub.outbound_queue must be at least 1");
    }
    if config.hub.ping_period_secs == 0 || config.hub.pong_wait_secs <= config.hub.ping_period_secs {
        return invalid("hub.pong_wait_secs must be longer than a non-zero hub.ping_period_secs");
    }
    if config.bus.redis_url.as_deref().is_some_and(str::is_empty) {
        return invalid("bus.redis_url must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> ConfigLoader {
        ConfigLoader::new("unused.toml", None, None)
    }

    #[test]
    fn test_overrides_and_conversion() {
        let loader = ConfigLoader::new(
            "unused.toml",
            Some("127.0.0.1:9000".parse().unwrap()),
            Some("redis://cache:6379".to_string()),
        );
        let config = loader.build(FileConfig::default()).unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.engine.timer, Duration::from_secs(300));
        assert_eq!(config.broadcast.tick, Duration::from_secs(1));
        assert_eq!(config.hub.ping_period, Duration::from_secs(54));
    }

    #[test]
    fn test_pong_wait_must_exceed_ping_period() {
        let mut file_config = FileConfig::default();
        file_config.hub.pong_wait_secs = 30;
        file_config.hub.ping_period_secs = 30;
        assert!(matches!(
            loader().build(file_config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut file_config = FileConfig::default();
        file_config.engine.capacity = 0;
        assert!(matches!(
            loader().build(file_config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let loader = ConfigLoader::new("/nonexistent/tradeup-config.toml", None, None);
        assert!(matches!(loader.load(), Err(ConfigError::IoError(_))));
    }
}
