/// Subscription registry
///
/// Tracks live WebSocket connections and the channels each one has joined.
/// Every connection owns an unbounded outbound queue; sending never waits,
/// and frames for a connection whose writer is gone are dropped.
///
/// The lock is held only while the maps are read or mutated, never across
/// an `.await`.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Identifier of one socket connection
pub type ConnectionId = u64;

/// A named group of connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Private channel of one user (all their open tabs)
    User(Uuid),

    /// Viewers of one task
    Task(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::User(id) => write!(f, "user:{}", id),
            Channel::Task(id) => write!(f, "task:{}", id),
        }
    }
}

struct Connection {
    user_id: Uuid,
    sender: UnboundedSender<String>,
    channels: HashSet<Channel>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Connection>,
    channels: HashMap<Channel, HashSet<ConnectionId>>,
}

impl Inner {
    fn add_member(&mut self, id: ConnectionId, channel: Channel) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };
        connection.channels.insert(channel);
        self.channels.entry(channel).or_default().insert(id)
    }

    fn remove_member(&mut self, id: ConnectionId, channel: Channel) -> bool {
        let removed = match self.channels.get_mut(&channel) {
            Some(members) => {
                let removed = members.remove(&id);
                if members.is_empty() {
                    self.channels.remove(&channel);
                }
                removed
            }
            None => false,
        };

        if let Some(connection) = self.connections.get_mut(&id) {
            connection.channels.remove(&channel);
        }
        removed
    }
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and joins it to its user's private channel
    pub fn register(&self, user_id: Uuid, sender: UnboundedSender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let mut inner = self.inner.write();
        inner.connections.insert(
            id,
            Connection {
                user_id,
                sender,
                channels: HashSet::new(),
            },
        );
        inner.add_member(id, Channel::User(user_id));

        tracing::debug!(connection_id = id, user_id = %user_id, "Socket registered");
        id
    }

    /// Joins a channel; returns `false` if already a member or unknown
    pub fn join(&self, id: ConnectionId, channel: Channel) -> bool {
        self.inner.write().add_member(id, channel)
    }

    /// Leaves a channel; returns `false` if not a member
    pub fn leave(&self, id: ConnectionId, channel: Channel) -> bool {
        self.inner.write().remove_member(id, channel)
    }

    /// Drops a connection from every channel it joined
    pub fn unregister(&self, id: ConnectionId) {
        let mut inner = self.inner.write();
        let Some(connection) = inner.connections.remove(&id) else {
            return;
        };

        for channel in &connection.channels {
            if let Some(members) = inner.channels.get_mut(channel) {
                members.remove(&id);
                if members.is_empty() {
                    inner.channels.remove(channel);
                }
            }
        }

        tracing::debug!(
            connection_id = id,
            user_id = %connection.user_id,
            "Socket unregistered"
        );
    }

    /// Queues a frame on every connection; returns how many accepted it
    pub fn broadcast(&self, frame: &str) -> usize {
        let inner = self.inner.read();
        inner
            .connections
            .values()
            .filter(|c| c.sender.send(frame.to_string()).is_ok())
            .count()
    }

    /// Queues a frame on every member of a channel
    pub fn send_to(&self, channel: Channel, frame: &str) -> usize {
        let inner = self.inner.read();
        let Some(members) = inner.channels.get(&channel) else {
            return 0;
        };

        members
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter(|c| c.sender.send(frame.to_string()).is_ok())
            .count()
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.inner
            .read()
            .channels
            .get(&channel)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn connect(registry: &SubscriptionRegistry, user: Uuid) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (registry.register(user, tx), rx)
    }

    #[test]
    fn test_channel_keys() {
        let id = Uuid::nil();
        assert_eq!(Channel::User(id).to_string(), format!("user:{}", id));
        assert_eq!(Channel::Task(id).to_string(), format!("task:{}", id));
    }

    #[test]
    fn test_register_joins_private_channel() {
        let registry = SubscriptionRegistry::new();
        let user = Uuid::new_v4();

        let (first, _rx1) = connect(&registry, user);
        let (second, _rx2) = connect(&registry, user);

        assert_ne!(first, second);
        assert_eq!(registry.connection_count(), 2);
        assert_eq!(registry.subscriber_count(Channel::User(user)), 2);
    }

    #[test]
    fn test_send_to_reaches_only_members() {
        let registry = SubscriptionRegistry::new();
        let ada = Uuid::new_v4();
        let grace = Uuid::new_v4();

        let (_, mut ada_rx) = connect(&registry, ada);
        let (_, mut grace_rx) = connect(&registry, grace);

        assert_eq!(registry.send_to(Channel::User(ada), "hello"), 1);

        assert_eq!(ada_rx.try_recv().unwrap(), "hello");
        assert!(grace_rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let registry = SubscriptionRegistry::new();
        let (_, mut a) = connect(&registry, Uuid::new_v4());
        let (_, mut b) = connect(&registry, Uuid::new_v4());

        assert_eq!(registry.broadcast("frame"), 2);
        assert_eq!(a.try_recv().unwrap(), "frame");
        assert_eq!(b.try_recv().unwrap(), "frame");
    }

    #[test]
    fn test_join_leave_task_channel() {
        let registry = SubscriptionRegistry::new();
        let task = Uuid::new_v4();
        let (id, _rx) = connect(&registry, Uuid::new_v4());

        assert!(registry.join(id, Channel::Task(task)));
        assert!(!registry.join(id, Channel::Task(task)));
        assert_eq!(registry.subscriber_count(Channel::Task(task)), 1);

        assert!(registry.leave(id, Channel::Task(task)));
        assert!(!registry.leave(id, Channel::Task(task)));
        assert_eq!(registry.subscriber_count(Channel::Task(task)), 0);
    }

    #[test]
    fn test_join_unknown_connection_is_rejected() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.join(42, Channel::Task(Uuid::new_v4())));
    }

    #[test]
    fn test_unregister_clears_every_channel() {
        let registry = SubscriptionRegistry::new();
        let user = Uuid::new_v4();
        let task = Uuid::new_v4();
        let (id, _rx) = connect(&registry, user);
        registry.join(id, Channel::Task(task));

        registry.unregister(id);

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.subscriber_count(Channel::User(user)), 0);
        assert_eq!(registry.subscriber_count(Channel::Task(task)), 0);
        assert_eq!(registry.broadcast("late"), 0);
    }

    #[test]
    fn test_closed_receiver_is_skipped() {
        let registry = SubscriptionRegistry::new();
        let (_, rx) = connect(&registry, Uuid::new_v4());
        let (_, mut live) = connect(&registry, Uuid::new_v4());
        drop(rx);

        assert_eq!(registry.broadcast("frame"), 1);
        assert_eq!(live.try_recv().unwrap(), "frame");
    }
}
