//! Client session loop
//!
//! One task owns the socket. It connects, authenticates, dispatches frames,
//! and decides after every disconnect whether to retry, wait for a new
//! credential, or stop.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::backoff::Backoff;
use super::credentials::{CredentialStore, Navigator};
use super::error::ClientError;
use super::{ClientEvent, FrameCallback, MessageCallback};
use crate::domain::RelayEvent;
use crate::presentation::websocket::CloseReason;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Shutdown,
    CredentialChanged,
    ForcedLogout,
    Closed {
        code: Option<u16>,
        authenticated: bool,
    },
}

/// What the loop does after a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextStep {
    Stop,
    ReconnectNow,
    /// The current credential is spent; wait for `set_token`
    AwaitCredential,
    Retry,
}

pub(crate) fn next_step(end: &SessionEnd) -> NextStep {
    match end {
        SessionEnd::Shutdown => NextStep::Stop,
        SessionEnd::CredentialChanged => NextStep::ReconnectNow,
        SessionEnd::ForcedLogout => NextStep::AwaitCredential,
        SessionEnd::Closed { code, .. } => match code.and_then(CloseReason::from_code) {
            Some(reason) if reason.is_terminal_for_credential() => NextStep::AwaitCredential,
            _ => NextStep::Retry,
        },
    }
}

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the socket and send the auth frame.
async fn open_socket(url: &str, token: &str) -> Result<RelaySocket, ClientError> {
    let (mut socket, _) = connect_async(url).await?;
    let auth = serde_json::json!({ "type": "auth", "token": token });
    socket
        .send(Message::text(serde_json::to_string(&auth)?))
        .await?;
    Ok(socket)
}

pub(crate) struct SessionRunner {
    pub url: String,
    pub connect_timeout: Duration,
    pub credentials: Arc<dyn CredentialStore>,
    pub navigator: Arc<dyn Navigator>,
    pub backoff: Backoff,
    pub on_frame: Option<FrameCallback>,
    pub on_new_message: Option<MessageCallback>,
    pub events: broadcast::Sender<ClientEvent>,
    pub credential_changes: watch::Receiver<u64>,
    pub shutdown: watch::Receiver<bool>,
}

impl SessionRunner {
    pub async fn run(mut self) {
        loop {
            if self.is_shutdown() {
                break;
            }

            let Some(token) = self.credentials.load() else {
                tracing::debug!("No credential, waiting for a token");
                if !self.wait_for_credential().await {
                    break;
                }
                continue;
            };

            let end = match self.run_session(&token).await {
                Ok(end) => end,
                Err(e) => {
                    tracing::warn!(error = %e, "Relay connection failed");
                    SessionEnd::Closed {
                        code: None,
                        authenticated: false,
                    }
                }
            };

            if let SessionEnd::Closed {
                code,
                authenticated,
            } = &end
            {
                if *authenticated {
                    self.backoff.reset();
                }
                self.emit(ClientEvent::Disconnected { code: *code });
            }

            match next_step(&end) {
                NextStep::Stop => break,
                NextStep::ReconnectNow => {
                    self.backoff.reset();
                }
                NextStep::AwaitCredential => {
                    tracing::info!(end = ?end, "Credential rejected, not reconnecting");
                    if !self.wait_for_credential().await {
                        break;
                    }
                    self.backoff.reset();
                }
                NextStep::Retry => {
                    let delay = self.backoff.next_delay();
                    tracing::debug!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = self.backoff.attempt(),
                        "Reconnecting"
                    );
                    self.emit(ClientEvent::Reconnecting { delay });
                    if !self.sleep(delay).await {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Relay client stopped");
    }

    async fn run_session(&mut self, token: &str) -> Result<SessionEnd, ClientError> {
        let mut socket = tokio::select! {
            _ = self.shutdown.changed() => return Ok(SessionEnd::Shutdown),
            _ = self.credential_changes.changed() => return Ok(SessionEnd::CredentialChanged),
            opened = timeout(self.connect_timeout, open_socket(&self.url, token)) => match opened {
                Ok(socket) => socket?,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.connect_timeout.as_millis() as u64,
                        "Relay connect timed out"
                    );
                    return Ok(SessionEnd::Closed {
                        code: None,
                        authenticated: false,
                    });
                }
            },
        };

        let mut authenticated = false;
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    let _ = socket.close(None).await;
                    return Ok(SessionEnd::Shutdown);
                }
                _ = self.credential_changes.changed() => {
                    let _ = socket.close(None).await;
                    return Ok(SessionEnd::CredentialChanged);
                }
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match self.dispatch(text.as_str()) {
                            Some(RelayEvent::AuthOk { .. }) => authenticated = true,
                            Some(RelayEvent::ForcedLogout) => {
                                self.force_logout();
                                return Ok(SessionEnd::ForcedLogout);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(SessionEnd::Closed {
                            code: frame.map(|f| u16::from(f.code)),
                            authenticated,
                        });
                    }
                    // Pings are answered by tungstenite itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Relay socket error");
                        return Ok(SessionEnd::Closed { code: None, authenticated });
                    }
                    None => return Ok(SessionEnd::Closed { code: None, authenticated }),
                },
            }
        }
    }

    /// Hand one text frame to callbacks and subscribers.
    fn dispatch(&self, text: &str) -> Option<RelayEvent> {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring non-JSON frame");
                return None;
            }
        };

        if let Some(on_frame) = &self.on_frame {
            on_frame(&value);
        }

        match serde_json::from_value::<RelayEvent>(value.clone()) {
            Ok(RelayEvent::AuthOk { user_id }) => {
                tracing::info!(user_id = user_id, "Relay session authenticated");
                self.emit(ClientEvent::Connected { user_id });
                Some(RelayEvent::AuthOk { user_id })
            }
            Ok(RelayEvent::NewMessage { message }) => {
                if let Some(on_new_message) = &self.on_new_message {
                    on_new_message(&message);
                }
                self.emit(ClientEvent::NewMessage(message.clone()));
                Some(RelayEvent::NewMessage { message })
            }
            Ok(RelayEvent::ForcedLogout) => Some(RelayEvent::ForcedLogout),
            Err(_) => {
                self.emit(ClientEvent::Frame(value));
                None
            }
        }
    }

    fn force_logout(&self) {
        tracing::warn!("Forced logout received, clearing credential");
        self.credentials.clear();
        self.navigator.redirect_to_login();
        self.emit(ClientEvent::ForcedLogout);
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Returns false if the client was shut down while waiting.
    async fn wait_for_credential(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown.changed() => false,
            changed = self.credential_changes.changed() => changed.is_ok(),
        }
    }

    /// Returns false if the client was shut down while sleeping. A new
    /// credential cuts the sleep short.
    async fn sleep(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.changed() => false,
            changed = self.credential_changes.changed() => changed.is_ok(),
        }
    }
}
