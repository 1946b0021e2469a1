//! Admin Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::application::dto::response::ForceLogoutResponse;
use crate::application::services::{AuthUser, RelayError};
use crate::domain::UserId;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Push `forced_logout` to every client of a user
pub async fn force_logout(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<(StatusCode, Json<ForceLogoutResponse>), AppError> {
    let delivered = state.registry.connections_for(user_id);

    state.relay.force_logout(user_id).await.map_err(|e| match e {
        RelayError::Lookup(inner) => inner,
        RelayError::Publish(inner) => AppError::Redis(inner),
        e => AppError::Internal(e.to_string()),
    })?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id = user_id,
        delivered = delivered,
        "Forced logout issued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ForceLogoutResponse { user_id, delivered }),
    ))
}
