//! ExpiryScanner processor.
//!
//! Periodically resolves every waiting tradeup whose deadline has passed.
//! A failed pass is logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use kanau::processor::Processor;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::resolution::{ResolutionEngine, ResolveExpired};

pub struct ExpiryScanner {
    engine: Arc<ResolutionEngine>,
    interval: Duration,
}

impl ExpiryScanner {
    pub fn new(engine: Arc<ResolutionEngine>) -> Self {
        let interval = engine.config().expiry_scan_interval;
        Self { engine, interval }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "ExpiryScanner started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("ExpiryScanner received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let now = OffsetDateTime::now_utc();
                    match self.engine.process(ResolveExpired { now }).await {
                        Ok(report) if !report.completed.is_empty() || report.failed > 0 => {
                            info!(
                                completed = report.completed.len(),
                                failed = report.failed,
                                "Expiry scan finished"
                            );
                        }
                        Ok(_) => debug!("Expiry scan found nothing to resolve"),
                        Err(e) => error!(error = %e, "Expiry scan failed"),
                    }
                }
            }
        }

        info!("ExpiryScanner shutdown complete");
    }
}
