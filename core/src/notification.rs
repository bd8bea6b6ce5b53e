//! Notification domain model.
//!
//! A [`Notification`] is a persisted, per-recipient record of one event to
//! surface to that recipient. Rows are never deleted; `is_read` and
//! `is_archived` only ever flip from `false` to `true`.

use crate::booking::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed set of notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A provider bid on the recipient's request.
    BidReceived,
    /// The recipient's bid was accepted.
    BidAccepted,
    /// The recipient's bid was rejected.
    BidRejected,
    /// A booking was created against the recipient's service.
    BookingCreated,
    /// A booking the recipient participates in changed status.
    BookingStatusUpdated,
    /// A payment arrived.
    PaymentReceived,
    /// A payout left.
    PayoutProcessed,
    /// New direct message.
    MessageReceived,
    /// A review was left for the recipient.
    ReviewReceived,
    /// Identity-verification status changed.
    VerificationUpdated,
    /// Platform announcement.
    System,
}

impl NotificationKind {
    /// Stable snake_case name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BidReceived => "bid_received",
            Self::BidAccepted => "bid_accepted",
            Self::BidRejected => "bid_rejected",
            Self::BookingCreated => "booking_created",
            Self::BookingStatusUpdated => "booking_status_updated",
            Self::PaymentReceived => "payment_received",
            Self::PayoutProcessed => "payout_processed",
            Self::MessageReceived => "message_received",
            Self::ReviewReceived => "review_received",
            Self::VerificationUpdated => "verification_updated",
            Self::System => "system",
        }
    }

    /// Parse the stable name back into a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::BidReceived,
            Self::BidAccepted,
            Self::BidRejected,
            Self::BookingCreated,
            Self::BookingStatusUpdated,
            Self::PaymentReceived,
            Self::PayoutProcessed,
            Self::MessageReceived,
            Self::ReviewReceived,
            Self::VerificationUpdated,
            Self::System,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of entities a notification can point at.
///
/// A closed tagged union instead of an open-ended dynamic type lookup:
/// loaders for each kind are registered by the consuming surface, and the
/// reference itself stays a plain `{kind, id}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Points at a booking.
    Booking,
    /// Points at a bid.
    Bid,
    /// Points at a payment.
    Payment,
    /// Points at a review.
    Review,
    /// Points at a message thread.
    Message,
    /// Points at a service listing.
    Service,
}

impl EntityKind {
    /// Stable snake_case name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Bid => "bid",
            Self::Payment => "payment",
            Self::Review => "review",
            Self::Message => "message",
            Self::Service => "service",
        }
    }

    /// Parse the stable name back into a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Booking,
            Self::Bid,
            Self::Payment,
            Self::Review,
            Self::Message,
            Self::Service,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

/// Typed reference to the entity a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    /// What kind of entity `id` identifies.
    pub kind: EntityKind,
    /// The entity's id.
    pub id: Uuid,
}

impl RelatedEntity {
    /// Reference a booking.
    #[must_use]
    pub const fn booking(id: crate::booking::BookingId) -> Self {
        Self {
            kind: EntityKind::Booking,
            id: id.0,
        }
    }
}

/// Persisted notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Identity.
    pub id: NotificationId,
    /// Owning recipient; immutable, and the only user allowed to mutate
    /// the read/archive flags.
    pub recipient: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Longer body.
    pub message: String,
    /// One-directional read flag.
    pub is_read: bool,
    /// One-directional archive flag; archived rows leave the recent list
    /// and the unread count.
    pub is_archived: bool,
    /// Optional typed reference to the entity this is about.
    pub related: Option<RelatedEntity>,
    /// Where clicking the notification should take the client.
    pub action_url: Option<String>,
    /// Optional logical grouping.
    pub group: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been persisted yet.
///
/// The store assigns identity and the creation timestamp at insert time so
/// that rows created inside a transition transaction share its clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Owning recipient.
    pub recipient: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Longer body.
    pub message: String,
    /// Optional typed reference to the entity this is about.
    pub related: Option<RelatedEntity>,
    /// Where clicking the notification should take the client.
    pub action_url: Option<String>,
    /// Optional logical grouping.
    pub group: Option<Uuid>,
}

impl NewNotification {
    /// Convenience constructor for the common fields.
    #[must_use]
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            kind,
            title: title.into(),
            message: message.into(),
            related: None,
            action_url: None,
            group: None,
        }
    }

    /// Attach a related entity reference.
    #[must_use]
    pub fn with_related(mut self, related: RelatedEntity) -> Self {
        self.related = Some(related);
        self
    }

    /// Attach an action URL.
    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Materialize the persisted row. Used by store implementations.
    #[must_use]
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient: self.recipient,
            kind: self.kind,
            title: self.title,
            message: self.message,
            is_read: false,
            is_archived: false,
            related: self.related,
            action_url: self.action_url,
            group: self.group,
            created_at: now,
        }
    }
}
