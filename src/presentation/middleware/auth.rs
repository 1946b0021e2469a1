//! Authentication Middleware
//!
//! Bearer token validation for protected routes. The token is checked by the
//! same `TokenVerifier` the WebSocket handshake uses.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::application::services::{AuthError, AuthUser};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized("Missing authorization header".into()))?;

    let user = state.verifier.verify(bearer.token()).map_err(|e| match e {
        AuthError::Expired => AppError::Unauthorized("Token expired".into()),
        AuthError::InvalidClaims => AppError::Unauthorized("Invalid token claims".into()),
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    // Insert authenticated user into request extensions
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects authenticated users without the admin role. Must run after
/// `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.is_admin)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    if !is_admin {
        return Err(AppError::Forbidden("Admin role required".into()));
    }

    Ok(next.run(request).await)
}
