//! Configuration types for the tradeup engine.
//!
//! These types represent the validated runtime configuration used by the
//! server and shared across crates. Loading and parsing is handled by the
//! server crate.

mod broadcast;
mod engine;
mod hub;

pub use broadcast::BroadcastConfig;
pub use engine::EngineConfig;
pub use hub::HubConfig;
