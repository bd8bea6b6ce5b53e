//! # Marketplace Core
//!
//! Domain model and services for the service-marketplace backend.
//!
//! This crate contains the two subsystems with real coordination requirements:
//!
//! - **Booking Transition Engine** ([`engine::TransitionEngine`]): validates
//!   role-gated status changes against an explicit transition table and
//!   commits them atomically together with the resulting notification rows.
//! - **Notification delivery** ([`notify::NotificationService`] +
//!   [`registry::GroupRegistry`]): persists notifications, fans them out to
//!   live connections through per-user groups, and maintains the derived
//!   unread count.
//!
//! ## Architecture Principles
//!
//! - The store is the system of record; the registry holds only transient,
//!   rebuildable group membership.
//! - Persistence happens-before publish. Publish failures are logged and
//!   never retried or rolled back; reconnecting clients reconcile through
//!   the recent-list snapshot.
//! - External collaborators (clock, identity, push gateway, persistence) are
//!   injected via traits — no ambient/global state.

pub mod booking;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod notification;
pub mod notify;
pub mod registry;
pub mod store;
pub mod transitions;

pub use booking::{
    BidId, Booking, BookingId, BookingStatus, CancellationReason, NewBooking, Role, ServiceId,
    UserId,
};
pub use engine::TransitionEngine;
pub use environment::{AuthUser, Clock, LoggingPushGateway, PushGateway, SessionProvider, SystemClock};
pub use error::{Error, Result};
pub use events::{ClientCommand, NotificationPayload, UserEvent};
pub use notification::{EntityKind, NewNotification, Notification, NotificationId, NotificationKind, RelatedEntity};
pub use notify::NotificationService;
pub use registry::GroupRegistry;
pub use store::{BookingStore, CommitError, NotificationStore, ProviderStats, UserDirectory};
