//! Pub/sub bus shared by every server process.
//!
//! Each process publishes pool updates and winners to the bus and delivers
//! whatever it receives back to its own connections, so a client sees the
//! same stream no matter which process it is attached to. Delivery is
//! at-most-once.

pub mod local;
pub mod redis;

pub use self::local::LocalBus;
pub use self::redis::RedisBus;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;
use tradeup_sdk::objects::bus::{
    SINGLE_TRADEUP_UPDATES_CHANNEL, SingleTradeupUpdate, TRADEUP_UPDATES_CHANNEL,
    TRADEUP_WINNERS_CHANNEL, TradeupsUpdate, WinnerNotice,
};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("payload encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A raw message as received from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

pub type BusStream = BoxStream<'static, BusMessage>;

#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError>;

    /// Open a subscription to `channels`. The stream ends when the
    /// subscription is lost.
    async fn subscribe(&self, channels: &[&str]) -> Result<BusStream, BusError>;
}

/// A decoded bus payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    TradeupsUpdate(TradeupsUpdate),
    SingleTradeupUpdate(SingleTradeupUpdate),
    Winner(WinnerNotice),
}

impl BusEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            BusEvent::TradeupsUpdate(_) => TRADEUP_UPDATES_CHANNEL,
            BusEvent::SingleTradeupUpdate(_) => SINGLE_TRADEUP_UPDATES_CHANNEL,
            BusEvent::Winner(_) => TRADEUP_WINNERS_CHANNEL,
        }
    }

    pub fn encode(&self) -> Result<String, BusError> {
        let payload = match self {
            BusEvent::TradeupsUpdate(update) => serde_json::to_string(update)?,
            BusEvent::SingleTradeupUpdate(update) => serde_json::to_string(update)?,
            BusEvent::Winner(notice) => serde_json::to_string(notice)?,
        };
        Ok(payload)
    }

    /// Decode a message. Messages on unknown channels yield `None`.
    pub fn decode(message: &BusMessage) -> Result<Option<Self>, BusError> {
        let event = match message.channel.as_str() {
            TRADEUP_UPDATES_CHANNEL => BusEvent::TradeupsUpdate(serde_json::from_str(&message.payload)?),
            SINGLE_TRADEUP_UPDATES_CHANNEL => {
                BusEvent::SingleTradeupUpdate(serde_json::from_str(&message.payload)?)
            }
            TRADEUP_WINNERS_CHANNEL => BusEvent::Winner(serde_json::from_str(&message.payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Encode `event` and publish it on its channel.
pub async fn publish_event(bus: &dyn Bus, event: &BusEvent) -> Result<(), BusError> {
    bus.publish(event.channel(), event.encode()?).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_routes_by_channel() {
        let message = BusMessage {
            channel: TRADEUP_UPDATES_CHANNEL.to_string(),
            payload: r#"{"pools":[]}"#.to_string(),
        };
        assert_eq!(
            BusEvent::decode(&message).unwrap(),
            Some(BusEvent::TradeupsUpdate(TradeupsUpdate { pools: vec![] }))
        );

        let unknown = BusMessage {
            channel: "chat".to_string(),
            payload: "{}".to_string(),
        };
        assert_eq!(BusEvent::decode(&unknown).unwrap(), None);

        let garbage = BusMessage {
            channel: TRADEUP_WINNERS_CHANNEL.to_string(),
            payload: "not json".to_string(),
        };
        assert!(matches!(BusEvent::decode(&garbage), Err(BusError::Json(_))));
    }
}
