//! Event type definitions.

use tradeup_sdk::objects::{Item, TradeupId, UserId};

/// A pool was completed and its winner credited with `item`.
#[derive(Debug, Clone, PartialEq)]
pub struct WinningEvent {
    pub tradeup_id: TradeupId,
    pub winner: UserId,
    pub item: Item,
}
