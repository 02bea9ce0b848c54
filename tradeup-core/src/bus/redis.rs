//! Bus backed by Redis pub/sub, for running several server processes.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{info, warn};

use super::{Bus, BusError, BusMessage, BusStream};

pub struct RedisBus {
    client: Client,
    publisher: ConnectionManager,
}

impl RedisBus {
    /// Connect the publishing side. Subscriptions open their own
    /// connections.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        info!("Connected to Redis bus");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        let mut conn = self.publisher.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<BusStream, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(*channel).await?;
        }
        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let channel = msg.get_channel_name().to_string();
            match msg.get_payload::<String>() {
                Ok(payload) => Some(BusMessage { channel, payload }),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Dropping undecodable bus payload");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
