//! Outbound event delivery.
//!
//! The actors address participants only by [`ConnectionId`] through the
//! [`EventSink`] trait: "send event E to participant X", fire-and-forget.
//! Nothing in the core awaits delivery, and a send to a connection that is
//! gone is silently dropped — by the time an actor notices a peer vanished
//! through other means, the disconnect event is already in flight.
//!
//! [`ClientRegistry`] is the production implementation: one unbounded
//! sender per live connection, drained by that connection's writer task in
//! the transport layer. Tests substitute a recording sink.

use crate::events::{ConnectionId, ServerEvent};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Addressed, fire-and-forget event delivery to participants.
pub trait EventSink: Send + Sync + 'static {
    /// Send `event` to the participant behind `to`. Never blocks; delivery
    /// to an unknown or closed connection is dropped.
    fn send_to(&self, to: ConnectionId, event: ServerEvent);
}

/// Registry of live client connections and their outbound queues.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a connection, returning the receiver its writer task
    /// drains. A re-registration under the same ID replaces the old queue.
    pub fn register(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        receiver
    }

    /// Drop a connection's outbound queue.
    pub fn unregister(&self, id: ConnectionId) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for ClientRegistry {
    fn send_to(&self, to: ConnectionId, event: ServerEvent) {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        match clients.get(&to) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    debug!(
                        target: "mc.channel",
                        connection_id = %to,
                        "Dropping event for closed connection"
                    );
                }
            }
            None => {
                debug!(
                    target: "mc.channel",
                    connection_id = %to,
                    "Dropping event for unknown connection"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_send_receive() {
        let registry = ClientRegistry::new();
        let id = ConnectionId::new();
        let mut receiver = registry.register(id);

        registry.send_to(id, ServerEvent::EnterSuccess);
        assert_eq!(receiver.recv().await, Some(ServerEvent::EnterSuccess));
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_dropped() {
        let registry = ClientRegistry::new();
        // Must not panic or block.
        registry.send_to(ConnectionId::new(), ServerEvent::EnterSuccess);
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let registry = ClientRegistry::new();
        let id = ConnectionId::new();
        let mut receiver = registry.register(id);

        registry.unregister(id);
        assert_eq!(registry.len(), 0);
        assert_eq!(receiver.recv().await, None);

        // Sends after unregister are dropped.
        registry.send_to(id, ServerEvent::EnterSuccess);
    }

    #[tokio::test]
    async fn test_reregister_replaces_queue() {
        let registry = ClientRegistry::new();
        let id = ConnectionId::new();
        let mut old = registry.register(id);
        let mut new = registry.register(id);

        registry.send_to(id, ServerEvent::OpponentReady);
        assert_eq!(old.recv().await, None);
        assert_eq!(new.recv().await, Some(ServerEvent::OpponentReady));
        assert_eq!(registry.len(), 1);
    }
}
