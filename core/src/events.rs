//! Realtime wire protocol.
//!
//! # Message Protocol
//!
//! **Client → Server:**
//! ```json
//! { "type": "mark_read", "notification_id": "…" }
//! { "type": "mark_all_read" }
//! { "type": "get_notifications" }
//! { "type": "archive_notification", "notification_id": "…" }
//! ```
//!
//! **Server → Client:**
//! ```json
//! { "type": "notification", "id": "…", "notification_type": "…", … }
//! { "type": "notification_count", "unread_count": 3 }
//! { "type": "notification_list", "notifications": [ … ] }
//! { "type": "notification_read", "notification_id": "…" }
//! { "type": "all_notifications_read" }
//! { "type": "notification_archived", "notification_id": "…" }
//! ```

use crate::notification::{Notification, NotificationId, NotificationKind, RelatedEntity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound control message from a connected client.
///
/// Processed strictly in receipt order per connection. Malformed payloads
/// are logged and ignored by the connection handler, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Mark one owned notification as read.
    MarkRead {
        /// Target notification.
        notification_id: NotificationId,
    },
    /// Mark every unread, non-archived notification as read.
    MarkAllRead,
    /// Re-push the recent-list snapshot.
    GetNotifications,
    /// Archive one owned notification.
    ArchiveNotification {
        /// Target notification.
        notification_id: NotificationId,
    },
}

/// Serialized view of one notification as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Identity.
    pub id: NotificationId,
    /// Kind, under the wire name the clients already speak.
    pub notification_type: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Longer body.
    pub message: String,
    /// Read flag at serialization time.
    pub is_read: bool,
    /// Typed reference to the related entity, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedEntity>,
    /// Where clicking the notification should take the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Optional logical grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            notification_type: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            is_read: n.is_read,
            related: n.related,
            action_url: n.action_url.clone(),
            group_id: n.group,
            timestamp: n.created_at,
        }
    }
}

/// Outbound event delivered to a user's group or directly on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    /// A newly created notification.
    Notification(NotificationPayload),
    /// Refreshed unread counter.
    NotificationCount {
        /// `count(!is_read ∧ !is_archived)` for the recipient.
        unread_count: u64,
    },
    /// Recent-list snapshot (≤ N non-archived, newest first).
    NotificationList {
        /// The snapshot items.
        notifications: Vec<NotificationPayload>,
    },
    /// Acknowledgement of a `mark_read` command.
    NotificationRead {
        /// The notification that was targeted.
        notification_id: NotificationId,
    },
    /// Acknowledgement of a `mark_all_read` command.
    AllNotificationsRead,
    /// Acknowledgement of an `archive_notification` command.
    NotificationArchived {
        /// The notification that was targeted.
        notification_id: NotificationId,
    },
}
