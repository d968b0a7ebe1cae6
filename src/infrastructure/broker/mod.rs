//! Broker Module
//!
//! Publishes stored messages to Redis for downstream consumers (push
//! notifications, search indexing, other nodes). Only the publishing side
//! lives here.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{Message, MessagePublisher};
use crate::shared::error::AppError;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Payload published for every stored message.
#[derive(Debug, Serialize)]
struct PublishedMessage<'a> {
    event: &'static str,
    message: &'a Message,
}

/// `PUBLISH`es stored messages as JSON on a single channel.
#[derive(Clone)]
pub struct RedisPublisher {
    conn: ConnectionManager,
    channel: String,
}

impl RedisPublisher {
    pub fn new(conn: ConnectionManager, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl MessagePublisher for RedisPublisher {
    async fn publish(&self, message: &Message) -> Result<(), AppError> {
        let payload = serde_json::to_string(&PublishedMessage {
            event: "message.created",
            message,
        })?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(&self.channel, payload).await?;

        tracing::trace!(
            message_id = message.id,
            channel = %self.channel,
            receivers,
            "Message published"
        );
        Ok(())
    }
}
