//! Resolution engine configuration.

use std::time::Duration;

use tradeup_sdk::objects::TradeupMode;

/// Settings for pool capacity, contribution limits and the background
/// passes that resolve and replenish pools.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items a new pool accepts before it starts its timer.
    pub capacity: u32,
    /// Items a single user may hold in one pool.
    pub max_contribution_per_user: u32,
    /// Time between a pool filling up and its resolution.
    pub timer: Duration,
    /// Period of the expiry scan.
    pub expiry_scan_interval: Duration,
    /// Period of the maintenance pass.
    pub maintenance_interval: Duration,
    /// Open pools kept per tradeable rarity tier.
    pub min_open_per_tier: u32,
    /// Mode of pools created by the maintenance pass.
    pub mode: TradeupMode,
    /// Fixed seed for the winner draw. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_contribution_per_user: 5,
            timer: Duration::from_secs(300),
            expiry_scan_interval: Duration::from_secs(60),
            maintenance_interval: Duration::from_secs(30),
            min_open_per_tier: 5,
            mode: TradeupMode::default(),
            rng_seed: None,
        }
    }
}
