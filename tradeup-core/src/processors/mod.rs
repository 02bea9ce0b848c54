//! Long-running processors and the resolution engine.
//!
//! - `ResolutionEngine`: handles contribution requests, resolves expired
//!   pools and emits `WinningEvent`
//! - `ExpiryScanner`: drives `ResolveExpired` on a fixed period
//! - `PoolMaintainer`: drives `MaintainOpenTradeups` on a fixed period
//! - `BroadcastScheduler`: publishes changed pool state for watched targets
//! - `WinnerRelay`: receives `WinningEvent`, publishes winner and pool state
//! - `BusBridge`: receives bus messages, delivers them through the hub

pub mod broadcast_scheduler;
pub mod bus_bridge;
pub mod expiry_scanner;
pub mod pool_maintainer;
pub mod resolution;
pub mod winner_relay;

pub use broadcast_scheduler::BroadcastScheduler;
pub use bus_bridge::BusBridge;
pub use expiry_scanner::ExpiryScanner;
pub use pool_maintainer::PoolMaintainer;
pub use resolution::{
    AddContribution, ContributionError, MaintainOpenTradeups, RemoveContribution, ResolutionEngine,
    ResolutionReport, ResolveExpired,
};
pub use winner_relay::WinnerRelay;
