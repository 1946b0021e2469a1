//! Redis Fan-out
//!
//! Cross-instance delivery for the relay. Every instance publishes
//! `RelayEnvelope`s on one channel and runs a subscriber that hands each
//! envelope to its local connection registry, so a user connected to any
//! instance receives the event.
//!
//! ```text
//!  instance A                    Redis                    instance B
//! +-----------+  PUBLISH   +--------------+  message  +-----------+
//! | Relay     | ---------> | wayzer:relay | --------> | registry  |
//! +-----------+            +--------------+  --+      +-----------+
//!                                              |
//!                          instance A registry <+
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::application::services::{EventBus, RelayError};
use crate::domain::{RelayEvent, UserId};

/// Pub/sub channel shared by all relay instances
pub const RELAY_CHANNEL: &str = "wayzer:relay";

/// Delay before re-subscribing after the subscription drops
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Event addressed to one user, as carried over Redis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub user_id: UserId,
    pub event: RelayEvent,
}

/// Opens a Redis client and a connection manager for publishing.
#[instrument(skip(url))]
pub async fn connect(url: &str) -> Result<(Client, ConnectionManager), redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client.clone()).await?;
    info!("Redis connection established");
    Ok((client, manager))
}

/// `EventBus` that publishes to every relay instance.
#[derive(Clone)]
pub struct RedisEventBus {
    conn: ConnectionManager,
}

impl RedisEventBus {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, user_id: UserId, event: &RelayEvent) -> Result<(), RelayError> {
        let payload = encode_envelope(user_id, event)?;
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(RELAY_CHANNEL)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        tracing::trace!(user_id = user_id, receivers = receivers, "Envelope published");
        Ok(())
    }
}

/// Serialize one event addressed to `user_id` for the relay channel.
pub fn encode_envelope(user_id: UserId, event: &RelayEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RelayEnvelope {
        user_id,
        event: event.clone(),
    })
}

/// Decode one pub/sub payload. Foreign or corrupt payloads yield `None`.
pub fn decode_envelope(payload: &str) -> Option<RelayEnvelope> {
    match serde_json::from_str(payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed relay envelope");
            None
        }
    }
}

/// Decode `payload` and hand it to `deliver`. Returns false for payloads
/// that are not relay envelopes.
pub fn handle_payload<F>(payload: &str, deliver: &F) -> bool
where
    F: Fn(RelayEnvelope) + ?Sized,
{
    match decode_envelope(payload) {
        Some(envelope) => {
            deliver(envelope);
            true
        }
        None => false,
    }
}

async fn subscribe_once<F>(client: &Client, deliver: &F) -> Result<(), redis::RedisError>
where
    F: Fn(RelayEnvelope) + Send + Sync,
{
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(RELAY_CHANNEL).await?;
    info!(channel = RELAY_CHANNEL, "Subscribed to relay channel");

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable relay payload");
                continue;
            }
        };
        handle_payload(&payload, deliver);
    }
    Ok(())
}

/// Spawn the subscriber loop. It re-subscribes whenever the subscription
/// ends or fails, until the task is aborted.
pub fn spawn_subscriber<F>(client: Client, deliver: Arc<F>) -> JoinHandle<()>
where
    F: Fn(RelayEnvelope) + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            match subscribe_once(&client, deliver.as_ref()).await {
                Ok(()) => tracing::warn!("Relay subscription ended, resubscribing"),
                Err(e) => tracing::error!(error = %e, "Relay subscription failed"),
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    })
}
