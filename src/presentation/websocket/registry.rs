//! Connection Registry
//!
//! Tracks authenticated connections by user id. A user may hold several
//! connections at once (tabs, devices) and every `send_to_user` reaches all
//! of them.
//!
//! Delivery is at-most-once and best effort: a frame is queued on each live
//! connection's outbound channel and never retried. A connection whose
//! writer has gone away is unregistered on the spot.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::ws::Utf8Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::messages::CloseReason;
use super::session::ConnectionId;
use crate::application::services::{EventBus, RelayError};
use crate::domain::{RelayEvent, UserId};
use crate::infrastructure::metrics;

/// Instruction for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialized JSON frame
    Text(Utf8Bytes),
    /// Keepalive ping
    Ping,
    /// Send a close frame and stop writing
    Close(CloseReason),
}

/// Handle used to write to one connection
pub type ConnectionSender = mpsc::UnboundedSender<Outbound>;

/// Live connections keyed by user id
#[derive(Default)]
pub struct ConnectionRegistry {
    /// User ID to that user's connections
    users: DashMap<UserId, HashMap<ConnectionId, ConnectionSender>>,
    /// Connection ID to owning user, for unregistering by connection
    owners: DashMap<ConnectionId, UserId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection under `user_id`.
    ///
    /// Idempotent per connection: returns false if `id` is already
    /// registered, in which case nothing changes.
    pub fn register(&self, user_id: UserId, id: ConnectionId, sender: ConnectionSender) -> bool {
        match self.owners.entry(id) {
            Entry::Occupied(entry) => {
                if *entry.get() != user_id {
                    tracing::warn!(
                        connection_id = %id,
                        user_id = *entry.get(),
                        requested_user_id = user_id,
                        "Connection already bound to another user"
                    );
                }
                return false;
            }
            Entry::Vacant(entry) => {
                entry.insert(user_id);
            }
        }

        self.users.entry(user_id).or_default().insert(id, sender);

        tracing::info!(user_id = user_id, connection_id = %id, "Connection registered");
        true
    }

    /// Remove a connection from whichever user it belongs to. Safe to call
    /// repeatedly; returns the owner on the first call only.
    pub fn unregister(&self, id: ConnectionId) -> Option<UserId> {
        let (_, user_id) = self.owners.remove(&id)?;

        if let Some(mut connections) = self.users.get_mut(&user_id) {
            connections.remove(&id);
        }
        self.users
            .remove_if(&user_id, |_, connections| connections.is_empty());

        tracing::info!(user_id = user_id, connection_id = %id, "Connection unregistered");
        Some(user_id)
    }

    /// Serialize `event` once and queue it on every live connection of
    /// `user_id`. Returns how many connections it was queued on; zero when
    /// the user is offline.
    pub fn send_to_user(&self, user_id: UserId, event: &RelayEvent) -> usize {
        let text = match serde_json::to_string(event) {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize relay event");
                return 0;
            }
        };

        let delivered = self.send_outbound(user_id, Outbound::Text(text));
        if delivered > 0 {
            metrics::record_delivery(event.event_name(), delivered);
        }
        delivered
    }

    /// Ask every connection of `user_id` to close.
    pub fn close_user(&self, user_id: UserId, reason: CloseReason) -> usize {
        self.send_outbound(user_id, Outbound::Close(reason))
    }

    /// Local delivery of one event, including the close that follows a
    /// `forced_logout`.
    pub fn deliver(&self, user_id: UserId, event: &RelayEvent) -> usize {
        let delivered = self.send_to_user(user_id, event);
        if matches!(event, RelayEvent::ForcedLogout) {
            self.close_user(user_id, CloseReason::ForcedLogout);
        }
        delivered
    }

    fn send_outbound(&self, user_id: UserId, outbound: Outbound) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        if let Some(connections) = self.users.get(&user_id) {
            for (id, sender) in connections.iter() {
                if sender.send(outbound.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }

        // The bucket guard is released before touching the maps again
        for id in dead {
            if self.unregister(id).is_some() {
                metrics::record_eviction();
                tracing::debug!(user_id = user_id, connection_id = %id, "Evicted dead connection");
            }
        }

        delivered
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.owners.len()
    }

    /// Number of users with at least one connection
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn connections_for(&self, user_id: UserId) -> usize {
        self.users
            .get(&user_id)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections_for(user_id) > 0
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.owners.contains_key(&id)
    }
}

/// Process-local fan-out
#[async_trait]
impl EventBus for ConnectionRegistry {
    async fn publish(&self, user_id: UserId, event: &RelayEvent) -> Result<(), RelayError> {
        self.deliver(user_id, event);
        Ok(())
    }
}
