//! Connection hub and WebSocket transport configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full when a message is due is dropped.
    pub outbound_queue: usize,
    /// Interval between keepalive pings.
    pub ping_period: Duration,
    /// How long a connection may stay silent before it is closed.
    /// Must be longer than `ping_period`.
    pub pong_wait: Duration,
    /// Largest inbound frame accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue: 64,
            ping_period: Duration::from_secs(54),
            pong_wait: Duration::from_secs(60),
            max_message_size: 512,
        }
    }
}
