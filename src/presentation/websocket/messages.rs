//! WebSocket Message Types
//!
//! Client frames and close codes of the relay protocol. Server frames are
//! `RelayEvent`s.

use serde::Deserialize;

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First and only frame of the handshake
    Auth { token: String },
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Why the server closed a connection. Each reason has its own close code so
/// clients can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Token rejected or expired
    InvalidToken,
    /// No auth frame within the handshake window
    AuthTimeout,
    /// First frame was not a well-formed auth frame
    MalformedAuth,
    /// Administrative logout
    ForcedLogout,
    /// No inbound traffic within the idle window
    IdleTimeout,
}

impl CloseReason {
    /// WebSocket close code (4000-4999 is reserved for applications).
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidToken => 4001,
            Self::AuthTimeout => 4002,
            Self::MalformedAuth => 4003,
            Self::ForcedLogout => 4004,
            Self::IdleTimeout => 4005,
        }
    }

    /// Close reason text, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::AuthTimeout => "auth_timeout",
            Self::MalformedAuth => "malformed_auth",
            Self::ForcedLogout => "forced_logout",
            Self::IdleTimeout => "idle_timeout",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            4001 => Some(Self::InvalidToken),
            4002 => Some(Self::AuthTimeout),
            4003 => Some(Self::MalformedAuth),
            4004 => Some(Self::ForcedLogout),
            4005 => Some(Self::IdleTimeout),
            _ => None,
        }
    }

    /// Closes after which reconnecting with the same credential is pointless.
    pub fn is_terminal_for_credential(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::MalformedAuth | Self::ForcedLogout
        )
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
