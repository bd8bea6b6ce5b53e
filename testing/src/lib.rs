//! Test doubles for the marketplace backend.
//!
//! [`InMemoryStore`] implements every store trait behind one mutex, which
//! gives it the same check-and-write atomicity the Postgres implementation
//! gets from its row lock. [`FixedClock`] and [`CapturingPushGateway`] make
//! time and outbound pushes observable.

mod fixtures;
mod memory;

pub use fixtures::{new_booking, staff_user, user};
pub use memory::{CapturingPushGateway, FixedClock, InMemoryStore, StaticTokenSessions};
