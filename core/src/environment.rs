//! Injected external collaborators.
//!
//! All dependencies on the outside world — time, identity, and the push
//! gateway — are abstracted behind traits and passed into constructors, so
//! services stay deterministic under test.

use crate::booking::UserId;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An authenticated user as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Identity.
    pub id: UserId,
    /// Display name used in notification copy.
    pub name: String,
    /// Staff/admin flag; grants the transition escape hatch.
    pub is_staff: bool,
}

/// Identity/session provider.
///
/// Resolves the ambient token carried by a REST request or realtime
/// connection into an [`AuthUser`]. Session issuance and expiry are the
/// provider's concern, not ours.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve a bearer token. `Ok(None)` means unknown/expired token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Infrastructure`] if the provider itself is
    /// unreachable.
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>>;
}

/// Push-notification gateway (FCM/APNs behind some HTTP API).
///
/// Strictly fire-and-forget: callers invoke it after commit and ignore
/// failures beyond logging them.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver a push message to whatever devices `recipient` has registered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Infrastructure`] on gateway failure; callers
    /// log and continue.
    async fn send(&self, recipient: UserId, title: &str, message: &str) -> Result<()>;
}

/// Stub gateway that only logs. Stands in until a real integration exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPushGateway;

#[async_trait]
impl PushGateway for LoggingPushGateway {
    async fn send(&self, recipient: UserId, title: &str, message: &str) -> Result<()> {
        tracing::debug!(%recipient, title, message, "push gateway stub invoked");
        Ok(())
    }
}
