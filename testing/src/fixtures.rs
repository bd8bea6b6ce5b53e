//! Fixture builders.

use chrono::{NaiveDate, NaiveTime};
use marketplace_core::{AuthUser, NewBooking, ServiceId, UserId};
use uuid::Uuid;

/// A regular (non-staff) user with a fresh id.
#[must_use]
pub fn user(name: &str) -> AuthUser {
    AuthUser {
        id: UserId(Uuid::new_v4()),
        name: name.to_string(),
        is_staff: false,
    }
}

/// A staff user with a fresh id.
#[must_use]
pub fn staff_user(name: &str) -> AuthUser {
    AuthUser {
        id: UserId(Uuid::new_v4()),
        name: name.to_string(),
        is_staff: true,
    }
}

/// Input for a two-hour morning booking of a fixed-price cleaning service.
#[must_use]
pub fn new_booking(provider: UserId, booking_date: NaiveDate) -> NewBooking {
    NewBooking {
        service_id: ServiceId(Uuid::new_v4()),
        service_title: "Deep Cleaning".to_string(),
        provider,
        bid_id: None,
        booking_date,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
        amount_cents: 15_000,
        requirements: None,
        notes: None,
    }
}
