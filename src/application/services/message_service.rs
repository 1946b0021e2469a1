//! Message Service
//!
//! The message write path: validate, persist, then hand the stored row to
//! the relay.

use std::sync::Arc;

use crate::domain::{
    ChatMessage, MessageRepository, MessageTarget, NewChatMessage, ParticipantRepository, UserId,
    MAX_MESSAGE_LENGTH,
};
use crate::shared::error::AppError;

use super::relay::Relay;

/// Create message request
#[derive(Debug, Clone)]
pub struct CreateMessageDto {
    pub recipient_id: Option<UserId>,
    pub trip_id: Option<i64>,
    pub text: String,
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message text is empty")]
    EmptyText,

    #[error("Message too long")]
    ContentTooLong,

    #[error("Exactly one of recipient_id or trip_id is required")]
    InvalidTarget,

    #[error("Cannot send a direct message to yourself")]
    SelfMessage,

    #[error("Permission denied")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    participants: Arc<dyn ParticipantRepository>,
    relay: Arc<Relay>,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        participants: Arc<dyn ParticipantRepository>,
        relay: Arc<Relay>,
    ) -> Self {
        Self {
            messages,
            participants,
            relay,
        }
    }

    fn validate(sender_id: UserId, request: CreateMessageDto) -> Result<NewChatMessage, MessageError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(MessageError::EmptyText);
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(MessageError::ContentTooLong);
        }

        let target = match (request.recipient_id, request.trip_id) {
            (Some(recipient_id), None) if recipient_id == sender_id => {
                return Err(MessageError::SelfMessage)
            }
            (Some(recipient_id), None) => MessageTarget::Direct(recipient_id),
            (None, Some(trip_id)) => MessageTarget::Trip(trip_id),
            _ => return Err(MessageError::InvalidTarget),
        };

        Ok(NewChatMessage {
            sender_id,
            target,
            text: text.to_string(),
        })
    }

    /// Persist a message and notify its recipients.
    ///
    /// Notification happens strictly after a successful insert and its
    /// outcome does not affect the result.
    #[tracing::instrument(skip(self, request), fields(sender_id = sender_id))]
    pub async fn send_message(
        &self,
        sender_id: UserId,
        request: CreateMessageDto,
    ) -> Result<ChatMessage, MessageError> {
        let new_message = Self::validate(sender_id, request)?;

        if let MessageTarget::Trip(trip_id) = new_message.target {
            if !self
                .participants
                .is_accepted_participant(trip_id, sender_id)
                .await?
            {
                return Err(MessageError::Forbidden);
            }
        }

        let message = self.messages.create(&new_message).await?;
        tracing::debug!(message_id = message.id, "Message stored");

        self.relay.on_message_created(&message).await;

        Ok(message)
    }
}
