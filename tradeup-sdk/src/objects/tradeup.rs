//! Tradeup (pool) objects as served over REST, WebSocket and the bus.

use serde::{Deserialize, Serialize};

use super::item::{Item, UserId};
use super::rarity::Rarity;

/// Tradeup id.
pub type TradeupId = i64;

/// Tradeup status for API responses.
///
/// This is the API/DTO version. For the engine's state machine, see
/// `tradeup-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeupStatus {
    Active,
    Waiting,
    Completed,
}

impl std::fmt::Display for TradeupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeupStatus::Active => write!(f, "Active"),
            TradeupStatus::Waiting => write!(f, "Waiting"),
            TradeupStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradeupMode {
    Battle,
    Team,
    #[default]
    #[serde(rename = "FFA")]
    Ffa,
}

/// Full state of one tradeup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tradeup {
    pub id: TradeupId,
    pub rarity: Rarity,
    pub capacity: u32,
    pub status: TradeupStatus,
    /// Unix timestamp (seconds) at which a waiting tradeup resolves.
    pub stop_time: Option<i64>,
    pub mode: TradeupMode,
    pub items: Vec<Item>,
    pub winner: Option<UserId>,
}
