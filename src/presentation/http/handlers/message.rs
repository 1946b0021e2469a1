//! Message Handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use crate::application::dto::request::SendMessageRequest;
use crate::application::services::{AuthUser, MessageError};
use crate::domain::ChatMessage;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Persist a chat message and relay it to its recipients
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let message = state
        .messages
        .send_message(auth.user_id, body.into())
        .await
        .map_err(|e| match e {
            MessageError::EmptyText | MessageError::ContentTooLong => {
                AppError::Validation(e.to_string())
            }
            MessageError::InvalidTarget | MessageError::SelfMessage => {
                AppError::BadRequest(e.to_string())
            }
            MessageError::Forbidden => AppError::Forbidden("Not a participant of this trip".into()),
            MessageError::Internal(inner) => inner,
        })?;

    Ok((StatusCode::CREATED, Json(message)))
}
