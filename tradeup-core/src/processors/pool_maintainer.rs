//! PoolMaintainer processor.
//!
//! Keeps a minimum number of open tradeups for every tradeable tier.

use std::sync::Arc;
use std::time::Duration;

use kanau::processor::Processor;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::resolution::{MaintainOpenTradeups, ResolutionEngine};

pub struct PoolMaintainer {
    engine: Arc<ResolutionEngine>,
    interval: Duration,
}

impl PoolMaintainer {
    pub fn new(engine: Arc<ResolutionEngine>) -> Self {
        let interval = engine.config().maintenance_interval;
        Self { engine, interval }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "PoolMaintainer started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("PoolMaintainer received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.engine.process(MaintainOpenTradeups).await {
                        Ok(0) => {}
                        Ok(created) => info!(created, "Opened new tradeups"),
                        Err(e) => error!(error = %e, "Maintenance pass failed"),
                    }
                }
            }
        }

        info!("PoolMaintainer shutdown complete");
    }
}
