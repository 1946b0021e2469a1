//! Credential storage and navigation hooks for the client.

use parking_lot::RwLock;

/// Where the client keeps its bearer token.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: String);
    fn clear(&self);
}

/// Called when the server forces the user out.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// In-process credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn store(&self, token: String) {
        *self.token.write() = Some(token);
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

/// Navigator for headless clients; only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        tracing::info!("Session ended by server, login required");
    }
}
