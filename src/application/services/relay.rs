//! Event Relay
//!
//! Turns "a chat message was persisted" into `new_message` pushes for every
//! recipient, and carries the administrative `forced_logout` override.
//!
//! Delivery is best effort: no queue, no retry, no ordering across
//! recipients. Offline recipients pick the message up on their next REST
//! fetch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChatMessage, MessageTarget, ParticipantRepository, RelayEvent, UserId};
use crate::shared::error::AppError;

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Message has no recipient or trip")]
    Unaddressed,

    #[error("Participant lookup failed: {0}")]
    Lookup(#[from] AppError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publish failed: {0}")]
    Publish(#[from] redis::RedisError),
}

/// Transport that gets an event to a user's live connections.
///
/// The in-process registry implements this directly; the Redis bus
/// publishes to every instance instead.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, user_id: UserId, event: &RelayEvent) -> Result<(), RelayError>;
}

/// Fans persisted messages out to their recipients.
pub struct Relay {
    bus: Arc<dyn EventBus>,
    participants: Arc<dyn ParticipantRepository>,
}

impl Relay {
    pub fn new(bus: Arc<dyn EventBus>, participants: Arc<dyn ParticipantRepository>) -> Self {
        Self { bus, participants }
    }

    /// Users that should be notified about `message`, sender excluded.
    pub async fn recipients_for(&self, message: &ChatMessage) -> Result<Vec<UserId>, RelayError> {
        let mut recipients = match message.target().ok_or(RelayError::Unaddressed)? {
            MessageTarget::Direct(user_id) => vec![user_id],
            MessageTarget::Trip(trip_id) => self.participants.accepted_participants(trip_id).await?,
        };
        recipients.retain(|user_id| *user_id != message.sender_id);
        recipients.sort_unstable();
        recipients.dedup();
        Ok(recipients)
    }

    /// Trigger point for the message write path. Returns the users a
    /// notification was published for. Never fails the caller: lookup and
    /// publish errors are logged and skipped.
    #[tracing::instrument(skip(self, message), fields(message_id = message.id))]
    pub async fn on_message_created(&self, message: &ChatMessage) -> Vec<UserId> {
        let recipients = match self.recipients_for(message).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve message recipients");
                return Vec::new();
            }
        };

        let event = RelayEvent::NewMessage {
            message: message.clone(),
        };

        let mut notified = Vec::with_capacity(recipients.len());
        for user_id in recipients {
            match self.bus.publish(user_id, &event).await {
                Ok(()) => notified.push(user_id),
                Err(e) => {
                    tracing::warn!(user_id = user_id, error = %e, "Failed to publish new_message");
                }
            }
        }

        tracing::debug!(recipients = notified.len(), "new_message relayed");
        notified
    }

    /// Tell every client of `user_id` to drop its credential.
    pub async fn force_logout(&self, user_id: UserId) -> Result<(), RelayError> {
        tracing::info!(user_id = user_id, "Forcing logout");
        self.bus.publish(user_id, &RelayEvent::ForcedLogout).await
    }
}
