//! WebSocket Connection State

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::UserId;

/// Identifies one socket for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-connection state owned by the socket task
#[derive(Debug)]
pub struct ConnectionState {
    pub id: ConnectionId,
    user_id: Option<UserId>,
    last_activity: Instant,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            user_id: None,
            last_activity: Instant::now(),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Bind the connection to a user. A connection is bound at most once;
    /// later calls keep the first identity and return false.
    pub fn authenticate(&mut self, user_id: UserId) -> bool {
        if self.user_id.is_some() {
            return false;
        }
        self.user_id = Some(user_id);
        true
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() >= timeout
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
