//! WinnerRelay processor.
//!
//! Receives `WinningEvent` from the resolution engine and announces it on
//! the bus together with the resolved pool's new state, without waiting
//! for the next broadcast tick.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::broadcast::Broadcaster;
use crate::events::WinnerReceiver;

pub struct WinnerRelay {
    broadcaster: Arc<Broadcaster>,
    winner_rx: WinnerReceiver,
}

impl WinnerRelay {
    pub fn new(broadcaster: Arc<Broadcaster>, winner_rx: WinnerReceiver) -> Self {
        Self {
            broadcaster,
            winner_rx,
        }
    }

    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("WinnerRelay started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("WinnerRelay received shutdown signal");
                        break;
                    }
                }

                received = self.winner_rx.recv() => match received {
                    Ok(event) => {
                        if let Err(e) = self.broadcaster.announce_winner(&event).await {
                            error!(
                                tradeup_id = event.tradeup_id,
                                winner = %event.winner,
                                error = %e,
                                "Failed to announce winner"
                            );
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "WinnerRelay lagged, winner announcements dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("Winner channel closed");
                        break;
                    }
                },
            }
        }

        info!("WinnerRelay shutdown complete");
    }
}
