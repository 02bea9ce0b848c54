//! WebSocket message types for the live tradeup stream.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection. Clients
//! declare what they want to watch with [`WsClientMessage`] frames and the
//! server pushes [`WsServerMessage`] frames.
//!
//! # Protocol
//!
//! 1. `{"event":"subscribe_all"}` is answered with a `sync_state` frame
//!    holding every open tradeup; later changes arrive as further
//!    `sync_state` frames.
//! 2. `{"event":"subscribe_one","poolID":12}` is answered with a
//!    `sync_pool` frame for tradeup 12; later changes arrive as further
//!    `sync_pool` frames.
//! 3. `{"event":"unsubscribe"}` is answered with `unsync` and stops pushes.
//! 4. A `pool_winner` frame is sent to every connection of the winning
//!    user, whatever the subscription.
//!
//! Subscriptions are mutually exclusive: each subscribe replaces the last.

use serde::{Deserialize, Serialize};

use super::item::{Item, UserId};
use super::tradeup::{Tradeup, TradeupId};

/// Client-to-server WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WsClientMessage {
    SubscribeAll,
    SubscribeOne {
        #[serde(rename = "poolID")]
        pool_id: TradeupId,
    },
    Unsubscribe,
}

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"event"` field:
///
/// ```json
/// {"event":"sync_state","pools":[ ... ]}
/// {"event":"pool_winner","userID":"...","winningItem":{ ... }}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Every open tradeup.
    SyncState { pools: Vec<Tradeup> },

    /// One tradeup the connection subscribed to.
    SyncPool { pool: Tradeup },

    /// Acknowledges an unsubscribe.
    Unsync,

    /// The receiving user won a tradeup.
    PoolWinner {
        #[serde(rename = "userID")]
        user_id: UserId,
        #[serde(rename = "winningItem")]
        winning_item: Item,
    },

    /// A problem with the client's last frame or with serving it. The
    /// connection stays open.
    Error { code: u16, reason: String },
}

/// Application-defined codes carried by [`WsServerMessage::Error`] and
/// close frames.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;

    pub const INTERNAL_ERROR: u16 = 1011;

    /// The client frame was not a recognised [`WsClientMessage`].
    pub const INVALID_MESSAGE: u16 = 4000;

    /// The subscribed tradeup does not exist.
    pub const TRADEUP_NOT_FOUND: u16 = 4004;

    /// No frame arrived within the keepalive deadline.
    pub const KEEPALIVE_TIMEOUT: u16 = 4008;

    /// The server dropped the connection: it fell behind on its outbound
    /// queue, or the server is shutting down.
    pub const DROPPED: u16 = 4009;
}
