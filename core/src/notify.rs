//! Notification service: persistence plus best-effort realtime delivery.
//!
//! Persistence happens-before publish. A client that reconnects between the
//! two steps still observes the notification through the recent-list
//! snapshot, which is the reconciliation path. Publish failures are logged
//! and never retried, and there is no deduplication of identical rows.

use crate::booking::UserId;
use crate::environment::PushGateway;
use crate::error::Result;
use crate::events::{NotificationPayload, UserEvent};
use crate::notification::{NewNotification, Notification, NotificationId};
use crate::registry::GroupRegistry;
use crate::store::NotificationStore;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// Size of the recent-list snapshot pushed on (re)connect.
pub const RECENT_LIMIT: usize = 10;

/// Creates notification rows and delivers them to live connections.
///
/// Invoked by the transition engine (for transactionally created rows) and
/// by other collaborators (payment, review, verification) through
/// [`NotificationService::create`].
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    registry: GroupRegistry,
    push: Arc<dyn PushGateway>,
}

impl NotificationService {
    /// Wire the service to its store, registry, and push gateway.
    #[must_use]
    pub fn new(
        store: Arc<dyn NotificationStore>,
        registry: GroupRegistry,
        push: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            store,
            registry,
            push,
        }
    }

    /// Persist a notification, then deliver it.
    ///
    /// The write is durable before any delivery is attempted; delivery
    /// failure does not roll it back.
    ///
    /// # Errors
    ///
    /// Only persistence failures propagate.
    pub async fn create(&self, notification: NewNotification) -> Result<Notification> {
        let persisted = self.store.insert(&notification).await?;
        counter!("notifications_created_total", "kind" => persisted.kind.as_str()).increment(1);
        self.publish_created(&persisted).await;
        Ok(persisted)
    }

    /// Post-commit fan-out for an already persisted notification.
    ///
    /// Used directly by the transition engine for rows created inside the
    /// transition transaction. Best-effort throughout: group publish,
    /// unread-count push, and the push gateway all run after the commit and
    /// swallow their own failures.
    pub async fn publish_created(&self, notification: &Notification) {
        self.registry
            .publish(
                notification.recipient,
                UserEvent::Notification(NotificationPayload::from(notification)),
            )
            .await;
        counter!("notifications_published_total").increment(1);

        self.push_unread_count(notification.recipient).await;

        if let Err(error) = self
            .push
            .send(notification.recipient, &notification.title, &notification.message)
            .await
        {
            // Fire-and-forget by contract; the gateway is not ours to retry.
            warn!(%error, recipient = %notification.recipient, "push gateway delivery failed");
        }
    }

    /// Newest non-archived notifications for `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn recent(&self, owner: UserId) -> Result<Vec<Notification>> {
        self.store.recent(owner, RECENT_LIMIT).await
    }

    /// Current unread count for `owner`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn unread_count(&self, owner: UserId) -> Result<u64> {
        self.store.unread_count(owner).await
    }

    /// Recompute the unread count and push it to `owner`'s group.
    ///
    /// Called synchronously after every mutation that could change the
    /// count. A failed recompute is logged and dropped — the next mutation
    /// or reconnect repairs the client's view.
    pub async fn push_unread_count(&self, owner: UserId) {
        match self.store.unread_count(owner).await {
            Ok(unread_count) => {
                self.registry
                    .publish(owner, UserEvent::NotificationCount { unread_count })
                    .await;
            }
            Err(error) => warn!(%error, %owner, "failed to recompute unread count"),
        }
    }

    /// Push the recent-list snapshot to `owner`'s group.
    pub async fn push_recent(&self, owner: UserId) {
        match self.recent(owner).await {
            Ok(notifications) => {
                let payloads = notifications.iter().map(NotificationPayload::from).collect();
                self.registry
                    .publish(
                        owner,
                        UserEvent::NotificationList {
                            notifications: payloads,
                        },
                    )
                    .await;
            }
            Err(error) => warn!(%error, %owner, "failed to load recent notifications"),
        }
    }

    /// Mark one owned notification as read and re-push the unread count.
    ///
    /// A non-owned id is a silent no-op, indistinguishable from marking an
    /// already-read row.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn mark_read(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let changed = self.store.mark_read(owner, id).await?;
        debug!(%owner, %id, changed, "mark_read");
        self.push_unread_count(owner).await;
        Ok(changed)
    }

    /// Mark everything unread as read and re-push the unread count.
    ///
    /// Idempotent: a second call changes zero rows and pushes a zero count
    /// again.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn mark_all_read(&self, owner: UserId) -> Result<u64> {
        let changed = self.store.mark_all_read(owner).await?;
        debug!(%owner, changed, "mark_all_read");
        self.push_unread_count(owner).await;
        Ok(changed)
    }

    /// Archive one owned notification; re-push both the snapshot and the
    /// unread count, which exclude archived rows.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn archive(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let changed = self.store.archive(owner, id).await?;
        debug!(%owner, %id, changed, "archive_notification");
        self.push_recent(owner).await;
        self.push_unread_count(owner).await;
        Ok(changed)
    }
}

impl Clone for NotificationService {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry.clone(),
            push: Arc::clone(&self.push),
        }
    }
}
