//! In-memory store doubles.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketplace_core::store::{
    BookingStore, CommitError, NotificationStore, ProviderStats, UserDirectory,
};
use marketplace_core::{
    AuthUser, Booking, BookingId, BookingStatus, Clock, Error, NewNotification, Notification,
    NotificationId, PushGateway, Result, SessionProvider, UserId,
};
use std::collections::HashMap;
use std::sync::PoisonError;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    bookings: HashMap<BookingId, Booking>,
    notifications: Vec<Notification>,
    users: Vec<AuthUser>,
}

/// All three store traits over one mutex.
///
/// The single lock serializes `commit_transition` the way the database's
/// row lock does, so concurrency tests against this store exercise the same
/// one-winner guarantee as production.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user for directory lookups and staff fan-out.
    pub async fn add_user(&self, user: AuthUser) {
        self.state.lock().await.users.push(user);
    }

    /// Total notification rows ever inserted, archived ones included.
    pub async fn notification_rows(&self) -> usize {
        self.state.lock().await.notifications.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn get(&self, id: BookingId) -> Result<Booking> {
        self.state
            .lock()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or(Error::not_found("booking", id.0))
    }

    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.state
            .lock()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        updated: &Booking,
        expected_status: BookingStatus,
        batch: &[NewNotification],
    ) -> std::result::Result<Vec<Notification>, CommitError> {
        let mut state = self.state.lock().await;
        let actual = state
            .bookings
            .get(&updated.id)
            .map(|b| b.status)
            .ok_or_else(|| CommitError::Store(Error::not_found("booking", updated.id.0)))?;
        if actual != expected_status {
            return Err(CommitError::StatusChanged { actual });
        }

        state.bookings.insert(updated.id, updated.clone());
        let now = Utc::now();
        let persisted: Vec<Notification> = batch
            .iter()
            .map(|new| new.clone().into_notification(now))
            .collect();
        state.notifications.extend(persisted.iter().cloned());
        Ok(persisted)
    }

    #[allow(clippy::cast_precision_loss)]
    async fn provider_stats(&self, provider: UserId) -> Result<ProviderStats> {
        let state = self.state.lock().await;
        let completed: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| b.provider == provider && b.status == BookingStatus::Completed)
            .collect();
        let ratings: Vec<f64> = completed
            .iter()
            .filter_map(|b| b.rating.map(f64::from))
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };
        Ok(ProviderStats {
            completed_bookings: completed.len() as u64,
            average_rating,
        })
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
        let persisted = notification.clone().into_notification(Utc::now());
        self.state
            .lock()
            .await
            .notifications
            .push(persisted.clone());
        Ok(persisted)
    }

    async fn recent(&self, owner: UserId, limit: usize) -> Result<Vec<Notification>> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient == owner && !n.is_archived)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, owner: UserId) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient == owner && !n.is_read && !n.is_archived)
            .count() as u64)
    }

    async fn mark_read(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let changed = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient == owner && !n.is_read)
            .map(|n| n.is_read = true)
            .is_some();
        Ok(changed)
    }

    async fn mark_all_read(&self, owner: UserId) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient == owner && !n.is_read && !n.is_archived)
        {
            n.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn archive(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let changed = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient == owner && !n.is_archived)
            .map(|n| n.is_archived = true)
            .is_some();
        Ok(changed)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get(&self, id: UserId) -> Result<Option<AuthUser>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn staff(&self) -> Result<Vec<AuthUser>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .filter(|u| u.is_staff)
            .cloned()
            .collect())
    }
}

/// Deterministic, manually advanced clock.
pub struct FixedClock {
    now: std::sync::RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::RwLock::new(now),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self
            .now
            .write()
            .unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Push gateway that records every send.
#[derive(Default)]
pub struct CapturingPushGateway {
    sent: std::sync::Mutex<Vec<(UserId, String, String)>>,
}

impl CapturingPushGateway {
    /// Fresh gateway with nothing captured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(UserId, String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PushGateway for CapturingPushGateway {
    async fn send(&self, recipient: UserId, title: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient, title.to_string(), message.to_string()));
        Ok(())
    }
}

/// Session provider backed by a fixed token table.
#[derive(Default)]
pub struct StaticTokenSessions {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenSessions {
    /// Empty session table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as a session for `user`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user: AuthUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl SessionProvider for StaticTokenSessions {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>> {
        Ok(self.tokens.get(token).cloned())
    }
}
