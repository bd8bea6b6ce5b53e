//! Persistence seams.
//!
//! The store is the single shared mutable resource in the system. Concurrent
//! writers to the same booking row are serialized by the implementation's
//! transaction/row-lock guarantee — that guarantee is what makes the
//! engine's concurrent-transition property hold.

use crate::booking::{Booking, BookingId, BookingStatus, UserId};
use crate::environment::AuthUser;
use crate::error::{Error, Result};
use crate::notification::{NewNotification, Notification, NotificationId};
use async_trait::async_trait;
use thiserror::Error as ThisError;

/// Failure modes of [`BookingStore::commit_transition`].
#[derive(Debug, ThisError)]
pub enum CommitError {
    /// The row's status no longer matches what the caller read.
    ///
    /// Raised when a concurrent transition won the race; the caller maps
    /// this to an invalid-transition error against `actual`.
    #[error("booking status changed concurrently (now '{actual}')")]
    StatusChanged {
        /// Status found under the row lock at write time.
        actual: BookingStatus,
    },

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] Error),
}

/// Derived provider statistics.
///
/// Recomputed on demand by one aggregator query rather than mutated ad hoc
/// from booking, review, and rating call sites.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ProviderStats {
    /// Number of completed bookings for this provider.
    pub completed_bookings: u64,
    /// Mean rating over reviewed bookings, if any exist.
    pub average_rating: Option<f64>,
}

/// Durable storage for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Load a booking.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, [`Error::Infrastructure`] on
    /// store failure.
    async fn get(&self, id: BookingId) -> Result<Booking>;

    /// Persist a freshly created booking.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Atomically commit a transition.
    ///
    /// In one row-scoped transaction: re-read the booking's status under
    /// lock, fail with [`CommitError::StatusChanged`] unless it still equals
    /// `expected_status`, write `updated`, insert every notification in
    /// `batch`, commit. Nothing outside the booking row and the notification
    /// rows is touched.
    ///
    /// # Errors
    ///
    /// [`CommitError::StatusChanged`] when a concurrent transition won;
    /// [`CommitError::Store`] otherwise.
    async fn commit_transition(
        &self,
        updated: &Booking,
        expected_status: BookingStatus,
        batch: &[NewNotification],
    ) -> std::result::Result<Vec<Notification>, CommitError>;

    /// Derived read model: completed-booking count and average rating.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn provider_stats(&self, provider: UserId) -> Result<ProviderStats>;
}

/// Durable storage for notifications.
///
/// All mutating operations are owner-scoped: an id that does not belong to
/// `owner` is a silent no-op (`false`/`0` return), never an error, so other
/// users' notification ids cannot be probed for existence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a notification outside any transition transaction.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn insert(&self, notification: &NewNotification) -> Result<Notification>;

    /// Newest `limit` non-archived notifications for `owner`, newest first.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn recent(&self, owner: UserId, limit: usize) -> Result<Vec<Notification>>;

    /// `count(recipient = owner ∧ !is_read ∧ !is_archived)`.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn unread_count(&self, owner: UserId) -> Result<u64>;

    /// Set `is_read` on one owned notification. Returns whether a row changed.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn mark_read(&self, owner: UserId, id: NotificationId) -> Result<bool>;

    /// Set `is_read` on every unread, non-archived notification of `owner`.
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn mark_all_read(&self, owner: UserId) -> Result<u64>;

    /// Set `is_archived` on one owned notification. Returns whether a row
    /// changed.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn archive(&self, owner: UserId, id: NotificationId) -> Result<bool>;
}

/// Read access to the user directory (an external collaborator's data).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up one user.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn get(&self, id: UserId) -> Result<Option<AuthUser>>;

    /// Every active staff/admin user, for dispute fan-out.
    ///
    /// # Errors
    ///
    /// [`Error::Infrastructure`] on store failure.
    async fn staff(&self) -> Result<Vec<AuthUser>>;
}
