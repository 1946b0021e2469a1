//! Relay Events
//!
//! Server-to-client notification frames. Each variant serializes to a JSON
//! object tagged by `type`.

use serde::{Deserialize, Serialize};

use super::entities::{ChatMessage, UserId};

/// Notification pushed to live connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Handshake accepted
    AuthOk { user_id: UserId },
    /// A chat message addressed to the receiving user was persisted
    NewMessage { message: ChatMessage },
    /// The client must drop its credential and return to the login screen
    ForcedLogout,
}

impl RelayEvent {
    /// Wire name of the event, used as a metrics label.
    pub fn event_name(&self) -> &'static str {
        match self {
            RelayEvent::AuthOk { .. } => "auth_ok",
            RelayEvent::NewMessage { .. } => "new_message",
            RelayEvent::ForcedLogout => "forced_logout",
        }
    }
}
