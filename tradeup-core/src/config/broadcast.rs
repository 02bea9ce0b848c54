//! Broadcast scheduler configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Period at which every subscribed target is re-fetched and diffed.
    pub tick: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}
