//! BroadcastScheduler processor.
//!
//! On every tick, asks the hub which targets have local subscribers,
//! forgets cached snapshots nobody watches any more, and publishes every
//! watched target whose state changed since its last broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::hub::HubHandle;

pub struct BroadcastScheduler {
    broadcaster: Arc<Broadcaster>,
    hub: HubHandle,
    tick: Duration,
}

impl BroadcastScheduler {
    pub fn new(broadcaster: Arc<Broadcaster>, hub: HubHandle, tick: Duration) -> Self {
        Self {
            broadcaster,
            hub,
            tick,
        }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(tick_ms = self.tick.as_millis() as u64, "BroadcastScheduler started");
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("BroadcastScheduler received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if !self.tick_once().await {
                        break;
                    }
                }
            }
        }

        info!("BroadcastScheduler shutdown complete");
    }

    /// Returns `false` once the hub has stopped.
    async fn tick_once(&self) -> bool {
        let targets = match self.hub.targets().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(error = %e, "Hub unavailable, stopping broadcasts");
                return false;
            }
        };
        self.broadcaster.snapshots().retain(&targets);

        for target in targets {
            if let Err(e) = self.broadcaster.refresh(target).await {
                warn!(target = %target, error = %e, "Failed to broadcast target");
            }
        }
        true
    }
}
