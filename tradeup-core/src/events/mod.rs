//! In-process events between the resolution engine and the broadcast side.
//!
//! # Event Flow
//!
//! 1. `ResolutionEngine` completes a pool and emits `WinningEvent`
//! 2. `WinnerRelay` publishes the winner and the pool's new state on the bus
//! 3. `BusBridge` hands every bus message to the `Hub` for local delivery

pub mod channels;
pub mod types;

pub use channels::{DEFAULT_CHANNEL_BUFFER, WinnerReceiver, WinnerSender, winner_channel};
pub use types::WinningEvent;
