//! Single-process bus over a tokio broadcast channel.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use super::{Bus, BusError, BusMessage, BusStream};
use crate::events::DEFAULT_CHANNEL_BUFFER;

#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<BusMessage>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_BUFFER)
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        // No subscribers is not an error: the message is simply lost.
        let _ = self.tx.send(BusMessage {
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<BusStream, BusError> {
        let channels: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |result| {
            let message = match result {
                Ok(message) if channels.contains(&message.channel) => Some(message),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "Local bus subscriber lagged, messages dropped");
                    None
                }
            };
            std::future::ready(message)
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_sees_only_its_channels() {
        let bus = LocalBus::default();
        let mut stream = bus.subscribe(&["a", "b"]).await.unwrap();

        bus.publish("c", "skip".to_string()).await.unwrap();
        bus.publish("b", "two".to_string()).await.unwrap();

        let message = stream.next().await.unwrap();
        assert_eq!(message.channel, "b");
        assert_eq!(message.payload, "two");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = LocalBus::default();
        assert!(bus.publish("a", "lost".to_string()).await.is_ok());
    }
}
