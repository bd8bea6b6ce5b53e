//! Booking domain model.
//!
//! A [`Booking`] is the persisted record of a scheduled engagement between a
//! customer and a provider. Its `status` field only ever changes through the
//! [`crate::engine::TransitionEngine`]; everything else here is plain data.

use crate::environment::AuthUser;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

/// User identifier (customers, providers, and staff share one id space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Service listing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub Uuid);

/// Bid identifier (set when a booking originates from an accepted bid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub Uuid);

impl BookingId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a booking.
///
/// `Completed`, `Cancelled`, and `Disputed` are terminal for participants;
/// disputed bookings are resolved by an out-of-scope admin process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting customer confirmation.
    Pending,
    /// Confirmed by the customer.
    Confirmed,
    /// Service underway.
    InProgress,
    /// Service delivered; completion timestamp set.
    Completed,
    /// Cancelled; cancellation fields set.
    Cancelled,
    /// Escalated to staff.
    Disputed,
}

impl BookingStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Disputed,
    ];

    /// Stable snake_case name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    /// Parse the stable name back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// True once no participant-driven transition can leave this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Disputed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role an actor holds relative to one booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The booking's customer.
    Customer,
    /// The booking's provider.
    Provider,
    /// Staff/admin escape hatch: any transition, unconditioned.
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Customer => "customer",
            Self::Provider => "provider",
            Self::Staff => "staff",
        })
    }
}

/// Closed set of cancellation reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// Cancelled at the customer's request.
    CustomerRequest,
    /// Provider could not make the date.
    ProviderUnavailable,
    /// Superseded by a rescheduled booking.
    Rescheduled,
    /// Payment failed or was withdrawn.
    PaymentIssue,
    /// Problem with the service itself.
    ServiceIssue,
    /// Anything else.
    Other,
}

impl CancellationReason {
    /// Stable snake_case name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomerRequest => "customer_request",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::Rescheduled => "rescheduled",
            Self::PaymentIssue => "payment_issue",
            Self::ServiceIssue => "service_issue",
            Self::Other => "other",
        }
    }

    /// Parse the stable name back into a reason.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::CustomerRequest,
            Self::ProviderUnavailable,
            Self::Rescheduled,
            Self::PaymentIssue,
            Self::ServiceIssue,
            Self::Other,
        ]
        .into_iter()
        .find(|reason| reason.as_str() == s)
    }
}

/// Persisted booking record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Identity.
    pub id: BookingId,
    /// The booked service listing.
    pub service_id: ServiceId,
    /// Title of the booked service, denormalized for notification copy.
    pub service_title: String,
    /// The customer participant.
    pub customer: UserId,
    /// The provider participant.
    pub provider: UserId,
    /// Originating bid, if the booking came from an accepted bid.
    pub bid_id: Option<BidId>,
    /// Scheduled date.
    pub booking_date: NaiveDate,
    /// Scheduled start time.
    pub start_time: NaiveTime,
    /// Scheduled end time.
    pub end_time: NaiveTime,
    /// Agreed total, in cents.
    pub amount_cents: i64,
    /// Customer-supplied requirements.
    pub requirements: Option<String>,
    /// Free-text notes; cancellation notes are appended here.
    pub notes: Option<String>,
    /// Current lifecycle status. Mutated only by the transition engine.
    pub status: BookingStatus,
    /// Set iff `status` became [`BookingStatus::Completed`].
    pub completion_date: Option<DateTime<Utc>>,
    /// Rating 1–5, settable once, only when completed.
    pub rating: Option<u8>,
    /// Review text accompanying the rating.
    pub review: Option<String>,
    /// Whether the booking has ever been rescheduled.
    pub is_rescheduled: bool,
    /// Original date, preserved on the first reschedule.
    pub original_booking_date: Option<NaiveDate>,
    /// Number of reschedules; monotonic non-decreasing.
    pub rescheduled_count: u32,
    /// Reason supplied with the most recent reschedule.
    pub rescheduled_reason: Option<String>,
    /// Set iff `status` became [`BookingStatus::Cancelled`].
    pub cancellation_reason: Option<CancellationReason>,
    /// Who cancelled; set together with `cancellation_reason`.
    pub cancelled_by: Option<UserId>,
    /// When the cancellation happened.
    pub cancellation_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Role `actor` holds on this booking, if any.
    ///
    /// Participant roles win over the staff flag, matching the permission
    /// checks in the REST surface: a provider who happens to be staff still
    /// acts as the provider on their own bookings.
    #[must_use]
    pub fn role_of(&self, actor: &AuthUser) -> Option<Role> {
        if actor.id == self.customer {
            Some(Role::Customer)
        } else if actor.id == self.provider {
            Some(Role::Provider)
        } else if actor.is_staff {
            Some(Role::Staff)
        } else {
            None
        }
    }

    /// The participant on the other side of `actor`, for notifications.
    ///
    /// A staff actor is on nobody's side, so both participants count as the
    /// counterpart.
    #[must_use]
    pub fn counterparts_of(&self, actor: &AuthUser) -> Vec<UserId> {
        if actor.id == self.customer {
            vec![self.provider]
        } else if actor.id == self.provider {
            vec![self.customer]
        } else {
            vec![self.customer, self.provider]
        }
    }
}

/// Input for creating a booking directly (no bid involved).
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    /// The service being booked.
    pub service_id: ServiceId,
    /// Title of the service, denormalized onto the booking.
    pub service_title: String,
    /// The provider offering the service.
    pub provider: UserId,
    /// Originating bid, when created through bid acceptance.
    pub bid_id: Option<BidId>,
    /// Scheduled date.
    pub booking_date: NaiveDate,
    /// Scheduled start time.
    pub start_time: NaiveTime,
    /// Scheduled end time.
    pub end_time: NaiveTime,
    /// Agreed total, in cents.
    pub amount_cents: i64,
    /// Customer-supplied requirements.
    pub requirements: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

impl NewBooking {
    /// Materialize a `Pending` booking owned by `customer`.
    #[must_use]
    pub fn into_booking(self, customer: UserId, now: DateTime<Utc>) -> Booking {
        Booking {
            id: BookingId::new(),
            service_id: self.service_id,
            service_title: self.service_title,
            customer,
            provider: self.provider,
            bid_id: self.bid_id,
            booking_date: self.booking_date,
            start_time: self.start_time,
            end_time: self.end_time,
            amount_cents: self.amount_cents,
            requirements: self.requirements,
            notes: self.notes,
            status: BookingStatus::Pending,
            completion_date: None,
            rating: None,
            review: None,
            is_rescheduled: false,
            original_booking_date: None,
            rescheduled_count: 0,
            rescheduled_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancellation_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_stable_names() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);
    }

    #[test]
    fn terminal_states_are_exactly_three() {
        let terminal: Vec<_> = BookingStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::Disputed
            ]
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
    }

    #[test]
    fn cancellation_reason_round_trips() {
        assert_eq!(
            CancellationReason::parse("provider_unavailable"),
            Some(CancellationReason::ProviderUnavailable)
        );
        assert_eq!(CancellationReason::Other.as_str(), "other");
    }
}
