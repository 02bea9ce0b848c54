//! Publishing pool state and winners to the bus.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tradeup_sdk::objects::Tradeup;
use tradeup_sdk::objects::bus::{SingleTradeupUpdate, TradeupsUpdate, WinnerNotice};

use crate::bus::{Bus, BusError, BusEvent, publish_event};
use crate::events::WinningEvent;
use crate::snapshot::{Snapshot, SnapshotCache, SnapshotTarget};
use crate::store::{StoreError, TradeupStore};

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// Fetches the current state of a target and publishes it if it differs
/// from what was last published.
pub struct Broadcaster {
    store: Arc<dyn TradeupStore>,
    bus: Arc<dyn Bus>,
    snapshots: Arc<SnapshotCache>,
}

impl Broadcaster {
    pub fn new(store: Arc<dyn TradeupStore>, bus: Arc<dyn Bus>, snapshots: Arc<SnapshotCache>) -> Self {
        Self { store, bus, snapshots }
    }

    pub fn snapshots(&self) -> &Arc<SnapshotCache> {
        &self.snapshots
    }

    /// Publish `target` if its state changed. Returns whether a message was
    /// published.
    ///
    /// A failed publish drops the cache entry again, so the next call
    /// retries it.
    pub async fn refresh(&self, target: SnapshotTarget) -> Result<bool, BroadcastError> {
        let ticket = self.snapshots.ticket();
        let Some((snapshot, event)) = self.current(target).await? else {
            self.snapshots.forget(target);
            return Ok(false);
        };
        if !self.snapshots.replace_if_changed(target, snapshot, ticket) {
            return Ok(false);
        }
        if let Err(e) = publish_event(self.bus.as_ref(), &event).await {
            self.snapshots.discard(target, ticket);
            return Err(e.into());
        }
        debug!(target = %target, "Published state change");
        Ok(true)
    }

    /// Publish a winner, then the changed state of its pool and of the open
    /// list.
    pub async fn announce_winner(&self, event: &WinningEvent) -> Result<(), BroadcastError> {
        let notice = BusEvent::Winner(WinnerNotice {
            winner: event.winner.clone(),
            item: event.item.clone(),
            pool_id: event.tradeup_id,
        });
        publish_event(self.bus.as_ref(), &notice).await?;
        self.refresh(SnapshotTarget::Tradeup(event.tradeup_id)).await?;
        self.refresh(SnapshotTarget::AllOpen).await?;
        Ok(())
    }

    async fn current(&self, target: SnapshotTarget) -> Result<Option<(Snapshot, BusEvent)>, StoreError> {
        match target {
            SnapshotTarget::AllOpen => {
                let pools: Vec<Tradeup> = self
                    .store
                    .open_tradeups()
                    .await?
                    .into_iter()
                    .map(Into::into)
                    .collect();
                let event = BusEvent::TradeupsUpdate(TradeupsUpdate { pools: pools.clone() });
                Ok(Some((Snapshot::AllOpen(pools), event)))
            }
            SnapshotTarget::Tradeup(id) => {
                let Some(record) = self.store.tradeup(id).await? else {
                    return Ok(None);
                };
                let pool: Tradeup = record.into();
                let event = BusEvent::SingleTradeupUpdate(SingleTradeupUpdate {
                    pool_id: id,
                    pool: pool.clone(),
                });
                Ok(Some((Snapshot::Tradeup(pool), event)))
            }
        }
    }
}
