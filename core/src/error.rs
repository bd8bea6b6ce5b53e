//! Error taxonomy shared across the marketplace backend.
//!
//! The categories map 1:1 to the behaviour at the request boundary:
//! validation/permission/transition/not-found errors become structured 4xx
//! responses, infrastructure errors become 5xx. At the realtime boundary the
//! same categories are logged and dropped instead of closing the connection.

use crate::booking::{BookingStatus, Role};
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Convenience result alias for domain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the booking and notification subsystems.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed or semantically invalid input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The actor is not a participant/owner of the targeted resource.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The requested status change violates the transition table.
    ///
    /// Carries the currently valid targets so the request boundary can
    /// enumerate them for the caller.
    #[error("cannot change status from '{from}' to '{to}' as {role}")]
    InvalidTransition {
        /// Status the booking currently has.
        from: BookingStatus,
        /// Status the caller asked for.
        to: BookingStatus,
        /// Role the caller holds on this booking.
        role: Role,
        /// Transitions the table currently admits for this role.
        valid: Vec<BookingStatus>,
    },

    /// Completion requested while the booking date is still in the future.
    ///
    /// Same category as [`Error::InvalidTransition`] (business-rule
    /// violation); kept separate for a precise user-facing message.
    #[error("cannot mark as completed before the booking date ({booking_date})")]
    PrematureCompletion {
        /// Scheduled date of the booking.
        booking_date: NaiveDate,
    },

    /// Unknown booking or notification id.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Resource kind, e.g. `"booking"`.
        resource: &'static str,
        /// The id that failed to resolve.
        id: Uuid,
    },

    /// Store or transport failure. Writes are never auto-retried.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl Error {
    /// Shorthand for a not-found error.
    #[must_use]
    pub const fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource, id }
    }

    /// True for the transition-rule category (table or business rule).
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::PrematureCompletion { .. }
        )
    }
}
