//! Event-bus transport over Redis pub/sub
//!
//! Routing keys map onto channels named `moneybee.events.<key>`; the
//! reactor subscribes with a pattern over the customer lifecycle keys.
//! Delivery is at-least-once from the consumer's point of view, so
//! consumers de-duplicate.

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use async_trait::async_trait;
use moneybee_domain::{EventPublisher, PublishError};
use moneybee_types::{BusMessage, TransferEvent, EVENT_EXCHANGE};

use crate::{DbError, DbResult};

#[derive(Clone)]
pub struct RedisEventBus {
    pool: RedisPool,
    client: redis::Client,
}

impl RedisEventBus {
    pub fn new(pool: RedisPool, client: redis::Client) -> Self {
        Self { pool, client }
    }

    fn channel_for(routing_key: &str) -> String {
        format!("{}.{}", EVENT_EXCHANGE, routing_key)
    }

    /// Publish a raw payload under a routing key
    pub async fn publish_raw(&self, routing_key: &str, payload: &str) -> DbResult<()> {
        let mut conn = self.pool.get().await?;

        let _subscribers: i64 = conn
            .publish(Self::channel_for(routing_key), payload)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(())
    }

    /// Pump messages matching `pattern` (a routing-key pattern such as
    /// `customer.*`) into `tx` until the receiving side closes. Runs until
    /// the subscription or the channel drops; callers spawn it as a task.
    pub async fn subscribe(&self, pattern: &str, tx: mpsc::Sender<BusMessage>) -> DbResult<()> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| DbError::Connection(format!("Redis pub/sub: {}", e)))?;

        let channel_pattern = Self::channel_for(pattern);
        pubsub.psubscribe(&channel_pattern).await?;
        debug!(pattern = %channel_pattern, "Subscribed to event bus");

        let prefix = format!("{}.", EVENT_EXCHANGE);
        let mut stream = pubsub.on_message();

        while let Some(msg) = stream.next().await {
            let channel = msg.get_channel_name().to_string();
            let routing_key = match channel.strip_prefix(&prefix) {
                Some(key) => key.to_string(),
                None => {
                    warn!(channel = %channel, "Message outside the exchange namespace");
                    continue;
                }
            };

            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Undecodable bus payload");
                    continue;
                }
            };

            let payload = match serde_json::from_str(&payload) {
                Ok(value) => value,
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Non-JSON bus payload");
                    continue;
                }
            };

            if tx
                .send(BusMessage {
                    routing_key,
                    payload,
                })
                .await
                .is_err()
            {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError> {
        let payload =
            serde_json::to_string(event).map_err(|e| PublishError::Bus(e.to_string()))?;

        self.publish_raw(event.routing_key(), &payload)
            .await
            .map_err(|e| PublishError::Bus(e.to_string()))
    }
}
