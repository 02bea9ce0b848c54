pub mod tradeup;

pub use tradeup::TradeupRecord;

use tradeup_sdk::objects::TradeupStatus as SdkTradeupStatus;

/// Tradeup lifecycle state as held by a store.
///
/// This is the engine's version. For API/DTO use, see
/// `tradeup_sdk::objects::TradeupStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeupStatus {
    /// Accepting and releasing items, no deadline.
    Active,
    /// Full with a persisted deadline. Withdrawals reopen it.
    Waiting,
    /// Resolved. Terminal.
    Completed,
}

impl TradeupStatus {
    /// Whether the pool is still listed as open.
    pub fn is_open(self) -> bool {
        !matches!(self, TradeupStatus::Completed)
    }
}

impl From<TradeupStatus> for SdkTradeupStatus {
    fn from(value: TradeupStatus) -> Self {
        match value {
            TradeupStatus::Active => SdkTradeupStatus::Active,
            TradeupStatus::Waiting => SdkTradeupStatus::Waiting,
            TradeupStatus::Completed => SdkTradeupStatus::Completed,
        }
    }
}

impl From<SdkTradeupStatus> for TradeupStatus {
    fn from(value: SdkTradeupStatus) -> Self {
        match value {
            SdkTradeupStatus::Active => TradeupStatus::Active,
            SdkTradeupStatus::Waiting => TradeupStatus::Waiting,
            SdkTradeupStatus::Completed => TradeupStatus::Completed,
        }
    }
}
