//! Per-user pub/sub group registry.
//!
//! Fan-out of [`UserEvent`]s to the live connections of one user. Each user
//! maps to a named group (`notifications:{user_id}`); zero or more
//! connections subscribe to it, and publishing to a group with no
//! subscribers silently drops the event — durability is the store's job,
//! never this layer's.
//!
//! The registry is an explicitly constructed service: built once at process
//! start and passed by reference into the notification service and the
//! connection handlers. Cloning is cheap and shares the underlying channels.

use crate::booking::UserId;
use crate::events::UserEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

/// Default broadcast capacity per group. Slow consumers past this lag and
/// resynchronize through the snapshot on reconnect.
const DEFAULT_GROUP_CAPACITY: usize = 256;

type Groups = Arc<RwLock<HashMap<UserId, broadcast::Sender<UserEvent>>>>;

/// In-process fan-out of user events to subscribed connections.
///
/// Membership is connection-scoped: [`GroupRegistry::subscribe`] joins the
/// user's group, dropping the returned receiver leaves it. The registry
/// holds only transient, rebuildable state.
pub struct GroupRegistry {
    groups: Groups,
    capacity: usize,
}

impl GroupRegistry {
    /// Create a registry with the default per-group capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_GROUP_CAPACITY)
    }

    /// Create a registry with an explicit per-group capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish an event to every live connection of `user`.
    ///
    /// Best-effort: with no subscribers the event is dropped silently.
    pub async fn publish(&self, user: UserId, event: UserEvent) {
        let groups = self.groups.read().await;
        if let Some(sender) = groups.get(&user) {
            // Send only fails when every receiver is gone; that is the
            // no-subscriber case and intentionally not an error.
            let delivered = sender.send(event).unwrap_or(0);
            trace!(%user, delivered, "published group event");
        } else {
            trace!(%user, "no group for user, event dropped");
        }
    }

    /// Join `user`'s group. Drop the receiver to leave.
    pub async fn subscribe(&self, user: UserId) -> broadcast::Receiver<UserEvent> {
        let mut groups = self.groups.write().await;
        let sender = groups
            .entry(user)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        sender.subscribe()
    }

    /// Number of live connections currently in `user`'s group.
    pub async fn subscriber_count(&self, user: UserId) -> usize {
        self.groups
            .read()
            .await
            .get(&user)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of groups that have ever been joined in this process.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GroupRegistry {
    fn clone(&self) -> Self {
        Self {
            groups: Arc::clone(&self.groups),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    #[tokio::test]
    async fn starts_with_no_groups() {
        let registry = GroupRegistry::new();
        assert_eq!(registry.group_count().await, 0);
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let registry = GroupRegistry::new();
        let u = user();

        let mut rx = registry.subscribe(u).await;
        registry
            .publish(u, UserEvent::NotificationCount { unread_count: 2 })
            .await;

        let event = rx.recv().await.expect("should receive event");
        assert_eq!(event, UserEvent::NotificationCount { unread_count: 2 });
    }

    #[tokio::test]
    async fn publish_fans_out_to_every_connection_of_the_user() {
        let registry = GroupRegistry::new();
        let u = user();

        let mut rx1 = registry.subscribe(u).await;
        let mut rx2 = registry.subscribe(u).await;

        registry
            .publish(u, UserEvent::AllNotificationsRead)
            .await;

        assert_eq!(rx1.recv().await.unwrap(), UserEvent::AllNotificationsRead);
        assert_eq!(rx2.recv().await.unwrap(), UserEvent::AllNotificationsRead);
    }

    #[tokio::test]
    async fn groups_are_isolated_per_user() {
        let registry = GroupRegistry::new();
        let (a, b) = (user(), user());

        let mut rx_a = registry.subscribe(a).await;
        let mut rx_b = registry.subscribe(b).await;

        registry
            .publish(a, UserEvent::NotificationCount { unread_count: 1 })
            .await;

        assert!(rx_a.recv().await.is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_silent_drop() {
        let registry = GroupRegistry::new();
        // No subscription ever happened; nothing to assert beyond "no panic",
        // and no group is created as a side effect.
        registry
            .publish(user(), UserEvent::AllNotificationsRead)
            .await;
        assert_eq!(registry.group_count().await, 0);
    }

    #[tokio::test]
    async fn dropping_the_receiver_leaves_the_group() {
        let registry = GroupRegistry::new();
        let u = user();

        let rx = registry.subscribe(u).await;
        assert_eq!(registry.subscriber_count(u).await, 1);
        drop(rx);
        assert_eq!(registry.subscriber_count(u).await, 0);
    }

    #[tokio::test]
    async fn clone_shares_groups() {
        let registry = GroupRegistry::new();
        let u = user();

        let mut rx = registry.subscribe(u).await;
        let cloned = registry.clone();
        cloned
            .publish(u, UserEvent::NotificationCount { unread_count: 7 })
            .await;

        assert_eq!(
            rx.recv().await.unwrap(),
            UserEvent::NotificationCount { unread_count: 7 }
        );
    }
}
