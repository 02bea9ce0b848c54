//! BusBridge processor.
//!
//! Consumes the bus subscription and hands each message to the hub for
//! delivery to local connections:
//!
//! - `tradeup_updates` -> `sync_state` to connections watching all pools
//! - `single_tradeup_updates` -> `sync_pool` to connections watching that pool
//! - `tradeup_winners` -> `pool_winner` to every connection of the winner

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tradeup_sdk::objects::ws::WsServerMessage;

use crate::bus::{BusEvent, BusMessage, BusStream};
use crate::hub::{HubError, HubHandle, Recipients};

pub struct BusBridge {
    stream: BusStream,
    hub: HubHandle,
}

impl BusBridge {
    /// `stream` must already be subscribed, so that a failing bus is
    /// caught at startup.
    pub fn new(stream: BusStream, hub: HubHandle) -> Self {
        Self { stream, hub }
    }

    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("BusBridge started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("BusBridge received shutdown signal");
                        break;
                    }
                }

                message = self.stream.next() => match message {
                    Some(message) => {
                        if let Err(e) = dispatch(&self.hub, &message).await {
                            warn!(error = %e, "Hub stopped, BusBridge exiting");
                            break;
                        }
                    }
                    None => {
                        warn!("Bus subscription ended");
                        break;
                    }
                },
            }
        }

        info!("BusBridge shutdown complete");
    }
}

/// Translate one bus message into a hub delivery. Malformed messages are
/// logged and skipped.
pub async fn dispatch(hub: &HubHandle, message: &BusMessage) -> Result<(), HubError> {
    let event = match BusEvent::decode(message) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(channel = %message.channel, "Ignoring message on unknown channel");
            return Ok(());
        }
        Err(e) => {
            warn!(channel = %message.channel, error = %e, "Dropping malformed bus message");
            return Ok(());
        }
    };

    let (recipients, outbound) = match event {
        BusEvent::TradeupsUpdate(update) => (
            Recipients::AllSubscribers,
            WsServerMessage::SyncState { pools: update.pools },
        ),
        BusEvent::SingleTradeupUpdate(update) => (
            Recipients::TradeupSubscribers(update.pool_id),
            WsServerMessage::SyncPool { pool: update.pool },
        ),
        BusEvent::Winner(notice) => (
            Recipients::User(notice.winner.clone()),
            WsServerMessage::PoolWinner {
                user_id: notice.winner,
                winning_item: notice.item,
            },
        ),
    };
    hub.deliver(recipients, outbound).await
}
