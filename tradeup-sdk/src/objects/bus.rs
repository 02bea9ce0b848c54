//! Payloads published on the process-shared bus.
//!
//! Every server process publishes to and subscribes to the same three
//! channels. Payloads are JSON.

use serde::{Deserialize, Serialize};

use super::item::{Item, UserId};
use super::tradeup::{Tradeup, TradeupId};

/// Full list of open tradeups.
pub const TRADEUP_UPDATES_CHANNEL: &str = "tradeup_updates";
/// State of a single tradeup.
pub const SINGLE_TRADEUP_UPDATES_CHANNEL: &str = "single_tradeup_updates";
/// Resolved winners.
pub const TRADEUP_WINNERS_CHANNEL: &str = "tradeup_winners";

/// Every channel a process subscribes to.
pub const ALL_CHANNELS: [&str; 3] = [
    TRADEUP_UPDATES_CHANNEL,
    SINGLE_TRADEUP_UPDATES_CHANNEL,
    TRADEUP_WINNERS_CHANNEL,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeupsUpdate {
    pub pools: Vec<Tradeup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleTradeupUpdate {
    #[serde(rename = "poolID")]
    pub pool_id: TradeupId,
    pub pool: Tradeup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerNotice {
    #[serde(rename = "winnerUserID")]
    pub winner: UserId,
    #[serde(rename = "winningItem")]
    pub item: Item,
    #[serde(rename = "poolID")]
    pub pool_id: TradeupId,
}
