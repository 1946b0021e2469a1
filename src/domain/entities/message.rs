//! Chat message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Numeric user identifier, as carried in the `sub` claim of access tokens.
pub type UserId = i64;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Where a message is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    /// Direct message to a single user
    Direct(UserId),
    /// Message posted in a trip's group conversation
    Trip(i64),
}

/// Represents a persisted chat message.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - sender_id: BIGINT NOT NULL
/// - recipient_id: BIGINT NULL (direct messages)
/// - trip_id: BIGINT NULL (trip conversations)
/// - text: TEXT NOT NULL
/// - is_read: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<i64>,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Addressing of this message. Rows carry exactly one of
    /// `recipient_id` / `trip_id`; a direct recipient wins if both are set.
    pub fn target(&self) -> Option<MessageTarget> {
        match (self.recipient_id, self.trip_id) {
            (Some(user_id), _) => Some(MessageTarget::Direct(user_id)),
            (None, Some(trip_id)) => Some(MessageTarget::Trip(trip_id)),
            (None, None) => None,
        }
    }
}

/// A message about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub sender_id: UserId,
    pub target: MessageTarget,
    pub text: String,
}

impl NewChatMessage {
    pub fn recipient_id(&self) -> Option<UserId> {
        match self.target {
            MessageTarget::Direct(user_id) => Some(user_id),
            MessageTarget::Trip(_) => None,
        }
    }

    pub fn trip_id(&self) -> Option<i64> {
        match self.target {
            MessageTarget::Trip(trip_id) => Some(trip_id),
            MessageTarget::Direct(_) => None,
        }
    }
}

/// Repository trait for message persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message and return the stored row.
    async fn create(&self, message: &NewChatMessage) -> Result<ChatMessage, AppError>;
}
