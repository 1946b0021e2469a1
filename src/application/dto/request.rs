//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::CreateMessageDto;

/// Send message request
///
/// Only id shapes are checked here. Text limits apply to the trimmed text in
/// `MessageService`.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(range(min = 1, message = "recipient_id must be positive"))]
    pub recipient_id: Option<i64>,

    #[validate(range(min = 1, message = "trip_id must be positive"))]
    pub trip_id: Option<i64>,

    pub text: String,
}

impl From<SendMessageRequest> for CreateMessageDto {
    fn from(request: SendMessageRequest) -> Self {
        Self {
            recipient_id: request.recipient_id,
            trip_id: request.trip_id,
            text: request.text,
        }
    }
}
