//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::domain::UserId;

/// Acknowledgement returned by the force-logout endpoint
#[derive(Debug, Serialize)]
pub struct ForceLogoutResponse {
    pub user_id: UserId,
    /// Connections of the user on this instance when the logout was pushed
    pub delivered: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub connections: usize,
    pub online_users: usize,
}
