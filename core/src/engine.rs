//! Booking transition engine.
//!
//! The only code path that mutates `Booking.status`. Every transition is
//! validated against the role-gated table, committed atomically together
//! with the notification rows it produces, and only then fanned out to live
//! connections. The status check-and-write happens inside the store's
//! row-scoped transaction, so two racing transitions deterministically admit
//! exactly one winner — the loser surfaces as an invalid transition against
//! the status the winner left behind.

use crate::booking::{
    Booking, BookingId, BookingStatus, CancellationReason, NewBooking, Role, UserId,
};
use crate::environment::{AuthUser, Clock};
use crate::error::{Error, Result};
use crate::notification::{NewNotification, NotificationKind, RelatedEntity};
use crate::notify::NotificationService;
use crate::store::{BookingStore, CommitError, ProviderStats, UserDirectory};
use crate::transitions;
use metrics::counter;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Per-transition notification batch. Two entries covers everything except
/// dispute fan-out to staff.
type Batch = SmallVec<[NewNotification; 2]>;

/// Validates and applies role-gated status changes on bookings.
pub struct TransitionEngine {
    store: Arc<dyn BookingStore>,
    notifications: NotificationService,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl TransitionEngine {
    /// Wire the engine to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifications: NotificationService,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifications,
            directory,
            clock,
        }
    }

    /// Create a direct booking owned by `actor`, in `Pending`.
    ///
    /// The provider is notified through the ordinary persist-then-publish
    /// path; creation itself is a plain insert, not a transition.
    ///
    /// # Errors
    ///
    /// Validation failures and store failures.
    #[instrument(skip_all, fields(customer = %actor.id))]
    pub async fn create_booking(&self, actor: &AuthUser, new: NewBooking) -> Result<Booking> {
        if new.booking_date < self.clock.now().date_naive() {
            return Err(Error::Validation(
                "booking date must not be in the past".into(),
            ));
        }
        if new.amount_cents < 0 {
            return Err(Error::Validation("amount must not be negative".into()));
        }

        let booking = new.into_booking(actor.id, self.clock.now());
        self.store.insert(&booking).await?;
        counter!("bookings_created_total").increment(1);
        info!(booking_id = %booking.id, "booking created");

        let notification = NewNotification::new(
            booking.provider,
            NotificationKind::BookingCreated,
            "New Booking",
            format!(
                "{} booked {} on {}.",
                actor.name, booking.service_title, booking.booking_date
            ),
        )
        .with_related(RelatedEntity::booking(booking.id))
        .with_action_url(format!("/bookings/{}/", booking.id));
        if let Err(error) = self.notifications.create(notification).await {
            // The booking row is already durable; delivery is best-effort.
            warn!(%error, booking_id = %booking.id, "failed to notify provider of new booking");
        }

        Ok(booking)
    }

    /// Load a booking, enforcing participant/staff visibility.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`], [`Error::Permission`], or store failures.
    pub async fn get_booking(&self, id: BookingId, actor: &AuthUser) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        booking
            .role_of(actor)
            .ok_or_else(|| Error::Permission("you are not a participant in this booking".into()))?;
        Ok(booking)
    }

    /// Apply a role-gated status change.
    ///
    /// Validation, then one atomic transaction for the status mutation and
    /// the notification rows, then post-commit best-effort publish.
    ///
    /// # Errors
    ///
    /// [`Error::Permission`] for non-participants,
    /// [`Error::InvalidTransition`] for table violations (including losing a
    /// concurrent race), [`Error::PrematureCompletion`] when completing
    /// before the booking date.
    #[instrument(skip_all, fields(booking = %id, actor = %actor.id, target = %target))]
    pub async fn change_status(
        &self,
        id: BookingId,
        actor: &AuthUser,
        target: BookingStatus,
        notes: Option<String>,
    ) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        let role = participant_role(&booking, actor)?;

        if !transitions::is_allowed(booking.status, role, target) {
            return Err(invalid_transition(booking.status, target, role));
        }
        // Business rule: a booking cannot complete before its scheduled date.
        if target == BookingStatus::Completed
            && booking.booking_date > self.clock.now().date_naive()
        {
            return Err(Error::PrematureCompletion {
                booking_date: booking.booking_date,
            });
        }

        let old_status = booking.status;
        let now = self.clock.now();
        let mut updated = booking.clone();
        updated.status = target;
        updated.updated_at = now;
        if let Some(extra) = notes {
            if !extra.is_empty() {
                updated.notes = Some(append_note(updated.notes.take(), &extra));
            }
        }
        match target {
            BookingStatus::Completed => updated.completion_date = Some(now),
            BookingStatus::Cancelled => {
                updated.cancellation_reason = Some(CancellationReason::Other);
                updated.cancelled_by = Some(actor.id);
                updated.cancellation_date = Some(now);
            }
            _ => {}
        }

        let batch = self.status_batch(&updated, actor, old_status).await?;
        let updated = self.commit(updated, old_status, &batch, target, role).await?;

        counter!("booking_transitions_total", "to" => target.as_str()).increment(1);
        info!(booking_id = %id, from = %old_status, to = %target, %role, "booking status changed");
        Ok(updated)
    }

    /// Cancel a booking from any non-terminal state.
    ///
    /// Unlike `change_status`, cancellation is open to both participants
    /// (and staff) regardless of the role table, guarded only by the state
    /// set.
    ///
    /// # Errors
    ///
    /// [`Error::Permission`] for non-participants,
    /// [`Error::InvalidTransition`] once the booking is terminal.
    #[instrument(skip_all, fields(booking = %id, actor = %actor.id))]
    pub async fn cancel(
        &self,
        id: BookingId,
        actor: &AuthUser,
        reason: CancellationReason,
        notes: Option<String>,
    ) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        let role = participant_role(&booking, actor)?;

        if booking.status.is_terminal() {
            return Err(invalid_transition(
                booking.status,
                BookingStatus::Cancelled,
                role,
            ));
        }

        let old_status = booking.status;
        let now = self.clock.now();
        let mut updated = booking.clone();
        updated.status = BookingStatus::Cancelled;
        updated.cancellation_reason = Some(reason);
        updated.cancelled_by = Some(actor.id);
        updated.cancellation_date = Some(now);
        updated.updated_at = now;
        if let Some(extra) = notes {
            if !extra.is_empty() {
                updated.notes = Some(append_note(
                    updated.notes.take(),
                    &format!("Cancellation reason: {extra}"),
                ));
            }
        }

        let mut batch = Batch::new();
        for counterpart in updated.counterparts_of(actor) {
            batch.push(
                NewNotification::new(
                    counterpart,
                    NotificationKind::BookingStatusUpdated,
                    "Booking Cancelled",
                    format!(
                        "Booking for {} has been cancelled by {}.",
                        updated.service_title, actor.name
                    ),
                )
                .with_related(RelatedEntity::booking(updated.id))
                .with_action_url(format!("/bookings/{}/", updated.id)),
            );
        }

        let updated = self
            .commit(updated, old_status, &batch, BookingStatus::Cancelled, role)
            .await?;
        counter!("booking_transitions_total", "to" => "cancelled").increment(1);
        info!(booking_id = %id, from = %old_status, "booking cancelled");
        Ok(updated)
    }

    /// Reschedule a booking to a new future date.
    ///
    /// The first reschedule preserves the original date; every reschedule
    /// increments the monotonic counter and requires a non-empty reason.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for terminal bookings, empty reasons, or
    /// non-future dates; [`Error::Permission`] for non-participants.
    #[instrument(skip_all, fields(booking = %id, actor = %actor.id, %new_date))]
    pub async fn reschedule(
        &self,
        id: BookingId,
        actor: &AuthUser,
        new_date: chrono::NaiveDate,
        reason: String,
    ) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        let role = participant_role(&booking, actor)?;

        if booking.status.is_terminal() {
            return Err(Error::Validation(format!(
                "cannot reschedule a booking with status '{}'",
                booking.status
            )));
        }
        if reason.trim().is_empty() {
            return Err(Error::Validation(
                "please provide a reason for rescheduling".into(),
            ));
        }
        if new_date <= self.clock.now().date_naive() {
            return Err(Error::Validation(
                "new booking date must be in the future".into(),
            ));
        }

        let old_status = booking.status;
        let old_date = booking.booking_date;
        let mut updated = booking.clone();
        if !updated.is_rescheduled {
            updated.original_booking_date = Some(old_date);
            updated.is_rescheduled = true;
        }
        updated.booking_date = new_date;
        updated.rescheduled_count += 1;
        updated.rescheduled_reason = Some(reason.clone());
        updated.updated_at = self.clock.now();

        let mut batch = Batch::new();
        for counterpart in updated.counterparts_of(actor) {
            batch.push(
                NewNotification::new(
                    counterpart,
                    NotificationKind::BookingStatusUpdated,
                    "Booking Rescheduled",
                    format!(
                        "Booking for {} has been rescheduled by {} from {} to {}. Reason: {}",
                        updated.service_title, actor.name, old_date, new_date, reason
                    ),
                )
                .with_related(RelatedEntity::booking(updated.id))
                .with_action_url(format!("/bookings/{}/", updated.id)),
            );
        }

        // Not a status change, but committed under the same row-scoped
        // status check so a racing cancel cannot interleave.
        let updated = self.commit(updated, old_status, &batch, old_status, role).await?;
        counter!("booking_reschedules_total").increment(1);
        info!(booking_id = %id, %old_date, %new_date, "booking rescheduled");
        Ok(updated)
    }

    /// Record the customer's rating and review on a completed booking.
    ///
    /// Settable exactly once; notifies the provider.
    ///
    /// # Errors
    ///
    /// [`Error::Permission`] unless the actor is the customer;
    /// [`Error::Validation`] off the completed state, for out-of-range
    /// ratings, or when a review already exists.
    #[instrument(skip_all, fields(booking = %id, actor = %actor.id, rating = rating))]
    pub async fn add_review(
        &self,
        id: BookingId,
        actor: &AuthUser,
        rating: u8,
        review: String,
    ) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        if booking.customer != actor.id {
            return Err(Error::Permission(
                "only the customer can review this booking".into(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(Error::Validation(
                "only completed bookings can be reviewed".into(),
            ));
        }
        if booking.rating.is_some() {
            return Err(Error::Validation(
                "this booking has already been reviewed".into(),
            ));
        }
        if !(1..=5).contains(&rating) {
            return Err(Error::Validation("rating must be between 1 and 5".into()));
        }

        let mut updated = booking;
        updated.rating = Some(rating);
        updated.review = Some(review);
        updated.updated_at = self.clock.now();

        let mut batch = Batch::new();
        batch.push(
            NewNotification::new(
                updated.provider,
                NotificationKind::ReviewReceived,
                "Review Received",
                format!(
                    "You received a {rating}-star review for {}.",
                    updated.service_title
                ),
            )
            .with_related(RelatedEntity::booking(updated.id))
            .with_action_url(format!("/bookings/{}/", updated.id)),
        );

        let updated = self
            .commit(
                updated,
                BookingStatus::Completed,
                &batch,
                BookingStatus::Completed,
                Role::Customer,
            )
            .await?;
        info!(booking_id = %id, rating, "review recorded");
        Ok(updated)
    }

    /// Derived provider statistics (completed bookings, average rating).
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn provider_stats(&self, provider: UserId) -> Result<ProviderStats> {
        self.store.provider_stats(provider).await
    }

    /// Commit atomically, then fan out post-commit.
    async fn commit(
        &self,
        updated: Booking,
        expected_status: BookingStatus,
        batch: &[NewNotification],
        target: BookingStatus,
        role: Role,
    ) -> Result<Booking> {
        let persisted = match self
            .store
            .commit_transition(&updated, expected_status, batch)
            .await
        {
            Ok(notifications) => notifications,
            Err(CommitError::StatusChanged { actual }) => {
                // Lost the race: report against the status the winner left.
                warn!(booking_id = %updated.id, %actual, "transition lost a concurrent race");
                return Err(invalid_transition(actual, target, role));
            }
            Err(CommitError::Store(error)) => return Err(error),
        };

        // Everything from here on is post-commit and best-effort.
        for notification in &persisted {
            self.notifications.publish_created(notification).await;
        }
        Ok(updated)
    }

    /// Build the notification batch for a plain status change.
    async fn status_batch(
        &self,
        updated: &Booking,
        actor: &AuthUser,
        old_status: BookingStatus,
    ) -> Result<Batch> {
        let mut batch = Batch::new();
        let related = RelatedEntity::booking(updated.id);
        let booking_url = format!("/bookings/{}/", updated.id);

        match updated.status {
            BookingStatus::InProgress => {
                batch.push(
                    NewNotification::new(
                        updated.customer,
                        NotificationKind::BookingStatusUpdated,
                        "Service In Progress",
                        format!(
                            "Your booking for {} is now in progress.",
                            updated.service_title
                        ),
                    )
                    .with_related(related)
                    .with_action_url(booking_url.clone()),
                );
            }
            BookingStatus::Completed => {
                batch.push(
                    NewNotification::new(
                        updated.customer,
                        NotificationKind::BookingStatusUpdated,
                        "Service Completed",
                        format!(
                            "Your booking for {} has been marked as completed. Please leave a review!",
                            updated.service_title
                        ),
                    )
                    .with_related(related)
                    .with_action_url(format!("/bookings/{}/review/", updated.id)),
                );
            }
            BookingStatus::Disputed => {
                // Every active staff user gets exactly one notification.
                for admin in self.directory.staff().await? {
                    batch.push(
                        NewNotification::new(
                            admin.id,
                            NotificationKind::BookingStatusUpdated,
                            "Booking Disputed",
                            format!(
                                "A booking ({}) has been marked as disputed by {}.",
                                updated.id, actor.name
                            ),
                        )
                        .with_related(related)
                        .with_action_url(format!("/admin/bookings/{}/", updated.id)),
                    );
                }
            }
            _ => {}
        }

        // The counterpart always learns about the change.
        for counterpart in updated.counterparts_of(actor) {
            batch.push(
                NewNotification::new(
                    counterpart,
                    NotificationKind::BookingStatusUpdated,
                    "Booking Status Updated",
                    format!(
                        "Booking for {} has been updated from {} to {}.",
                        updated.service_title, old_status, updated.status
                    ),
                )
                .with_related(related)
                .with_action_url(booking_url.clone()),
            );
        }

        Ok(batch)
    }
}

/// Resolve the actor's role or reject non-participants.
fn participant_role(booking: &Booking, actor: &AuthUser) -> Result<Role> {
    booking
        .role_of(actor)
        .ok_or_else(|| Error::Permission("you are not a participant in this booking".into()))
}

/// Build the invalid-transition error, enumerating the currently valid
/// targets for the actor's role.
fn invalid_transition(from: BookingStatus, to: BookingStatus, role: Role) -> Error {
    Error::InvalidTransition {
        from,
        to,
        role,
        valid: transitions::valid_targets(from, role),
    }
}

/// Append a note paragraph, preserving anything already recorded.
fn append_note(existing: Option<String>, extra: &str) -> String {
    match existing {
        Some(notes) if !notes.is_empty() => format!("{notes}\n\n{extra}"),
        _ => extra.to_string(),
    }
}
