//! Relay Client
//!
//! Keeps one live socket tied to the current credential. Every inbound frame
//! goes to the optional callbacks and to a broadcast channel any number of
//! components can subscribe to.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wayzer_relay::client::{MemoryCredentialStore, RelayClient};
//!
//! # async fn run() -> Result<(), wayzer_relay::client::ClientError> {
//! let store = Arc::new(MemoryCredentialStore::new(Some("token".into())));
//! let client = RelayClient::new("ws://localhost:3000/ws", store)
//!     .on_new_message(|message| println!("new message {}", message.id));
//! let mut events = client.subscribe();
//! let handle = client.spawn()?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod credentials;
mod error;
mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub use backoff::{Backoff, ReconnectPolicy};
pub use credentials::{CredentialStore, LogNavigator, MemoryCredentialStore, Navigator};
pub use error::ClientError;

use crate::domain::{ChatMessage, UserId};
use session::SessionRunner;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub type FrameCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;
pub type MessageCallback = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

/// Broadcast to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Handshake acknowledged
    Connected { user_id: UserId },
    NewMessage(ChatMessage),
    /// Frame of a type this client does not know
    Frame(serde_json::Value),
    /// Credential cleared, login required
    ForcedLogout,
    Disconnected { code: Option<u16> },
    Reconnecting { delay: Duration },
}

/// Builder for a relay client task
pub struct RelayClient {
    url: String,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    policy: ReconnectPolicy,
    on_frame: Option<FrameCallback>,
    on_new_message: Option<MessageCallback>,
    events: broadcast::Sender<ClientEvent>,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            credentials,
            navigator: Arc::new(LogNavigator),
            policy: ReconnectPolicy::default(),
            on_frame: None,
            on_new_message: None,
            events,
        }
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Called with every JSON frame, before it is interpreted.
    pub fn on_frame<F>(mut self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_frame = Some(Arc::new(callback));
        self
    }

    /// Called for every `new_message` frame.
    pub fn on_new_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.on_new_message = Some(Arc::new(callback));
        self
    }

    /// Subscribe before `spawn` to not miss the first events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Start the connection task.
    pub fn spawn(self) -> Result<ClientHandle, ClientError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ClientError::InvalidUrl(self.url));
        }

        let (credential_tx, credential_rx) = watch::channel(0u64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = SessionRunner {
            url: self.url,
            connect_timeout: self.policy.connect_timeout,
            credentials: self.credentials.clone(),
            navigator: self.navigator,
            backoff: Backoff::new(self.policy),
            on_frame: self.on_frame,
            on_new_message: self.on_new_message,
            events: self.events.clone(),
            credential_changes: credential_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(runner.run());

        Ok(ClientHandle {
            credentials: self.credentials,
            credential_tx,
            shutdown_tx,
            events: self.events,
            task,
        })
    }
}

/// Control handle for a running client. Dropping it stops the client.
pub struct ClientHandle {
    credentials: Arc<dyn CredentialStore>,
    credential_tx: watch::Sender<u64>,
    shutdown_tx: watch::Sender<bool>,
    events: broadcast::Sender<ClientEvent>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// Store a new credential and reconnect with it.
    pub fn set_token(&self, token: impl Into<String>) {
        self.credentials.store(token.into());
        self.credential_tx.send_modify(|generation| *generation += 1);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Close the socket and wait for the task to end. Frames in flight are
    /// discarded.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Relay client task ended abnormally");
        }
    }
}
