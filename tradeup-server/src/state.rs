//! State handed to every handler.

use std::sync::Arc;
use tradeup_core::config::HubConfig;
use tradeup_core::hub::HubHandle;
use tradeup_core::processors::ResolutionEngine;

#[derive(Clone)]
pub struct AppState {
    /// Pool lifecycle operations.
    pub engine: Arc<ResolutionEngine>,
    /// Handle to this process's connection hub.
    pub hub: HubHandle,
    /// WebSocket keepalive and frame limits.
    pub hub_config: Arc<HubConfig>,
}

impl AppState {
    pub fn new(engine: Arc<ResolutionEngine>, hub: HubHandle, hub_config: HubConfig) -> Self {
        Self {
            engine,
            hub,
            hub_config: Arc::new(hub_config),
        }
    }
}
