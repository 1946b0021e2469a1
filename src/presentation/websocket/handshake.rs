//! Auth Handshake
//!
//! ```text
//! Connecting --open--> AwaitingAuth --valid auth frame--> Authenticated
//!                           |
//!                           +--bad token / bad frame / timeout--> Rejected
//! ```
//!
//! `Authenticated` and `Rejected` are terminal. The handshake only decides;
//! registering and closing the socket is left to the connection handler.

use crate::application::services::{AuthUser, TokenVerifier};

use super::messages::{ClientFrame, CloseReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    AwaitingAuth,
    Authenticated(AuthUser),
    Rejected(CloseReason),
}

/// Result of feeding one event to the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStep {
    Accepted(AuthUser),
    Rejected(CloseReason),
    /// The handshake is not awaiting auth; the input was dropped
    Ignored,
}

#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Connecting,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Socket opened; start waiting for the auth frame.
    pub fn open(&mut self) {
        if self.state == HandshakeState::Connecting {
            self.state = HandshakeState::AwaitingAuth;
        }
    }

    /// Feed the first text frame.
    pub fn on_text(&mut self, text: &str, verifier: &dyn TokenVerifier) -> HandshakeStep {
        if self.state != HandshakeState::AwaitingAuth {
            return HandshakeStep::Ignored;
        }

        let token = match ClientFrame::parse(text) {
            Ok(ClientFrame::Auth { token }) => token,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed auth frame");
                return self.reject(CloseReason::MalformedAuth);
            }
        };

        match verifier.verify(&token) {
            Ok(user) => {
                self.state = HandshakeState::Authenticated(user.clone());
                HandshakeStep::Accepted(user)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Auth token rejected");
                self.reject(CloseReason::InvalidToken)
            }
        }
    }

    /// A binary frame arrived where the auth frame was expected.
    pub fn on_binary(&mut self) -> HandshakeStep {
        if self.state != HandshakeState::AwaitingAuth {
            return HandshakeStep::Ignored;
        }
        self.reject(CloseReason::MalformedAuth)
    }

    /// The auth window elapsed.
    pub fn on_timeout(&mut self) -> HandshakeStep {
        if self.state != HandshakeState::AwaitingAuth {
            return HandshakeStep::Ignored;
        }
        self.reject(CloseReason::AuthTimeout)
    }

    fn reject(&mut self, reason: CloseReason) -> HandshakeStep {
        self.state = HandshakeState::Rejected(reason);
        HandshakeStep::Rejected(reason)
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}
