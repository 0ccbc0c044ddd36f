//! Realtime relay for connected chat users.
//!
//! The relay maps each user id to that user's live connections and pushes
//! [`ServerEvent`]s to them. Delivery is best effort: an event for a user with
//! no live connection is dropped, and an event for a connection whose buffer
//! is full is dropped for that connection. Nothing is queued for later; a
//! client that missed events catches up by re-listing the conversation.
//!
//! Each connection owns one FIFO channel, so events to the same connection
//! arrive in the order they were emitted.
//!
//! # Example
//!
//! ```rust
//! use chat_types::ServerEvent;
//! use relay::{Delivery, Relay};
//!
//! let relay = Relay::new();
//! let mut conn = relay.connect("bob");
//!
//! let delivery = relay.notify("bob", ServerEvent::UserTyping("alice".to_string()));
//! assert_eq!(delivery, Delivery::Delivered(1));
//!
//! assert_eq!(relay.notify("carol", ServerEvent::UserTyping("alice".to_string())), Delivery::Offline);
//! # drop(conn);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chat_types::{ClientEvent, ServerEvent};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Default per-connection send buffer.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Outcome of a single notify call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Number of connections the event was queued on.
    Delivered(usize),
    /// No live connection accepted the event; it was dropped.
    Offline,
}

struct Slot {
    id: u64,
    tx: mpsc::Sender<ServerEvent>,
}

struct Inner {
    /// User ID -> live connections
    connections: DashMap<String, Vec<Slot>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// A registered connection: the receiving half of its event channel.
///
/// Pass the id back to [`Relay::disconnect`] when the socket closes.
pub struct Connection {
    pub user_id: String,
    pub id: u64,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Shared relay handle. Clones refer to the same connection table.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<Inner>,
}

impl Relay {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_CONNECTION_BUFFER)
    }

    /// Create a relay with a custom per-connection buffer size.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                connections: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a new connection for a user.
    ///
    /// If this is the user's first live connection, every connected session
    /// receives an updated `onlineUsers` list.
    pub fn connect(&self, user_id: &str) -> Connection {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let first = {
            let mut slots = self.inner.connections.entry(user_id.to_string()).or_default();
            slots.push(Slot { id, tx });
            slots.len() == 1
        };

        info!(user = %user_id, connection = id, "Relay connection registered");

        if first {
            self.broadcast_presence();
        }

        Connection {
            user_id: user_id.to_string(),
            id,
            events: rx,
        }
    }

    /// Unregister a connection.
    ///
    /// If it was the user's last live connection, every remaining session
    /// receives an updated `onlineUsers` list.
    pub fn disconnect(&self, user_id: &str, connection_id: u64) {
        let removed = match self.inner.connections.get_mut(user_id) {
            Some(mut slots) => {
                let before = slots.len();
                slots.retain(|slot| slot.id != connection_id);
                before != slots.len()
            }
            None => false,
        };

        if !removed {
            return;
        }

        info!(user = %user_id, connection = connection_id, "Relay connection unregistered");

        let went_offline = self
            .inner
            .connections
            .remove_if(user_id, |_, slots| slots.is_empty())
            .is_some();

        if went_offline {
            self.broadcast_presence();
        }
    }

    /// Push an event to every live connection of a user.
    ///
    /// Never blocks. Full or closed connections are skipped with a warning.
    pub fn notify(&self, user_id: &str, event: ServerEvent) -> Delivery {
        let Some(slots) = self.inner.connections.get(user_id) else {
            debug!(user = %user_id, event = event.name(), "User offline, dropping event");
            return Delivery::Offline;
        };

        let mut delivered = 0;
        for slot in slots.iter() {
            match slot.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        user = %user_id,
                        connection = slot.id,
                        event = event.name(),
                        "Connection buffer full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(user = %user_id, connection = slot.id, "Connection closed, dropping event");
                }
            }
        }

        if delivered == 0 {
            Delivery::Offline
        } else {
            Delivery::Delivered(delivered)
        }
    }

    /// Push the same event to several users, once per distinct user id.
    pub fn notify_all(&self, user_ids: &[&str], event: ServerEvent) {
        let mut done: Vec<&str> = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if done.contains(user_id) {
                continue;
            }
            done.push(user_id);
            self.notify(user_id, event.clone());
        }
    }

    /// Forward a client frame from `from_user` to its addressee.
    ///
    /// `typing(peer)` reaches the peer as `userTyping(from_user)`.
    pub fn forward(&self, from_user: &str, event: ClientEvent) -> Delivery {
        match event {
            ClientEvent::Typing(peer) => {
                self.notify(&peer, ServerEvent::UserTyping(from_user.to_string()))
            }
            ClientEvent::StopTyping(peer) => {
                self.notify(&peer, ServerEvent::UserStopTyping(from_user.to_string()))
            }
        }
    }

    /// Whether a user has at least one live connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.connections.contains_key(user_id)
    }

    /// Ids of all users with a live connection, sorted.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .inner
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        users.sort();
        users
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.iter().map(|entry| entry.value().len()).sum()
    }

    fn broadcast_presence(&self) {
        let users = self.online_users();
        for user_id in &users {
            self.notify(user_id, ServerEvent::OnlineUsers(users.clone()));
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::DeletedMessage;

    fn deleted(id: &str) -> ServerEvent {
        ServerEvent::DeleteMessage(DeletedMessage {
            message_id: id.to_string(),
        })
    }

    /// Drain presence frames so tests only see the events they emit.
    fn skip_presence(conn: &mut Connection) {
        while let Ok(event) = conn.events.try_recv() {
            assert!(matches!(event, ServerEvent::OnlineUsers(_)), "unexpected {:?}", event);
        }
    }

    #[tokio::test]
    async fn test_notify_reaches_all_sessions_of_user() {
        let relay = Relay::new();
        let mut phone = relay.connect("bob");
        let mut laptop = relay.connect("bob");
        skip_presence(&mut phone);
        skip_presence(&mut laptop);

        assert_eq!(relay.notify("bob", deleted("m-1")), Delivery::Delivered(2));
        assert_eq!(phone.events.recv().await, Some(deleted("m-1")));
        assert_eq!(laptop.events.recv().await, Some(deleted("m-1")));
    }

    #[tokio::test]
    async fn test_offline_user_drops_event() {
        let relay = Relay::new();
        assert_eq!(relay.notify("ghost", deleted("m-1")), Delivery::Offline);

        // Connecting later does not replay anything
        let mut conn = relay.connect("ghost");
        skip_presence(&mut conn);
        assert!(conn.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_order_preserved_per_connection() {
        let relay = Relay::new();
        let mut conn = relay.connect("bob");
        skip_presence(&mut conn);

        for i in 0..10 {
            relay.notify("bob", deleted(&format!("m-{}", i)));
        }
        for i in 0..10 {
            assert_eq!(conn.events.recv().await, Some(deleted(&format!("m-{}", i))));
        }
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let relay = Relay::with_buffer(2);
        let mut conn = relay.connect("bob");
        skip_presence(&mut conn);

        assert_eq!(relay.notify("bob", deleted("1")), Delivery::Delivered(1));
        assert_eq!(relay.notify("bob", deleted("2")), Delivery::Delivered(1));
        assert_eq!(relay.notify("bob", deleted("3")), Delivery::Offline);

        assert_eq!(conn.events.recv().await, Some(deleted("1")));
        assert_eq!(conn.events.recv().await, Some(deleted("2")));
        assert!(conn.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_removes_only_that_connection() {
        let relay = Relay::new();
        let first = relay.connect("bob");
        let mut second = relay.connect("bob");
        skip_presence(&mut second);

        relay.disconnect("bob", first.id);
        assert!(relay.is_online("bob"));
        assert_eq!(relay.connection_count(), 1);
        assert_eq!(relay.notify("bob", deleted("m")), Delivery::Delivered(1));

        relay.disconnect("bob", second.id);
        assert!(!relay.is_online("bob"));
        assert!(relay.online_users().is_empty());

        // Unknown ids are ignored
        relay.disconnect("bob", 999);
    }

    #[tokio::test]
    async fn test_presence_broadcast() {
        let relay = Relay::new();
        let mut alice = relay.connect("alice");
        assert_eq!(
            alice.events.recv().await,
            Some(ServerEvent::OnlineUsers(vec!["alice".to_string()]))
        );

        let bob = relay.connect("bob");
        assert_eq!(
            alice.events.recv().await,
            Some(ServerEvent::OnlineUsers(vec![
                "alice".to_string(),
                "bob".to_string()
            ]))
        );

        // A second session for bob does not change presence
        let bob_again = relay.connect("bob");
        assert!(alice.events.try_recv().is_err());

        relay.disconnect("bob", bob.id);
        assert!(alice.events.try_recv().is_err());

        relay.disconnect("bob", bob_again.id);
        assert_eq!(
            alice.events.recv().await,
            Some(ServerEvent::OnlineUsers(vec!["alice".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_forward_typing() {
        let relay = Relay::new();
        let mut bob = relay.connect("bob");
        skip_presence(&mut bob);

        relay.forward("alice", ClientEvent::Typing("bob".to_string()));
        relay.forward("alice", ClientEvent::StopTyping("bob".to_string()));

        assert_eq!(
            bob.events.recv().await,
            Some(ServerEvent::UserTyping("alice".to_string()))
        );
        assert_eq!(
            bob.events.recv().await,
            Some(ServerEvent::UserStopTyping("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_notify_all_deduplicates() {
        let relay = Relay::new();
        let mut bob = relay.connect("bob");
        skip_presence(&mut bob);

        relay.notify_all(&["bob", "bob", "carol"], deleted("m"));
        assert_eq!(bob.events.recv().await, Some(deleted("m")));
        assert!(bob.events.try_recv().is_err());
    }
}
