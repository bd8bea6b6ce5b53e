//! `BookingStore` implementation.

use crate::{PostgresStore, infra};
use async_trait::async_trait;
use chrono::Utc;
use marketplace_core::store::{BookingStore, CommitError, ProviderStats};
use marketplace_core::{
    BidId, Booking, BookingId, BookingStatus, CancellationReason, Error, NewNotification,
    Notification, Result, ServiceId, UserId,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

const UPDATE_BOOKING: &str = r"
    UPDATE bookings SET
        status = $2,
        notes = $3,
        completion_date = $4,
        rating = $5,
        review = $6,
        booking_date = $7,
        is_rescheduled = $8,
        original_booking_date = $9,
        rescheduled_count = $10,
        rescheduled_reason = $11,
        cancellation_reason = $12,
        cancelled_by = $13,
        cancellation_date = $14,
        updated_at = $15
    WHERE id = $1
";

#[async_trait]
impl BookingStore for PostgresStore {
    async fn get(&self, id: BookingId) -> Result<Booking> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(infra)?
            .ok_or(Error::not_found("booking", id.0))?;
        booking_from_row(&row)
    }

    async fn insert(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO bookings (
                id, service_id, service_title, customer_id, provider_id, bid_id,
                booking_date, start_time, end_time, amount_cents, requirements,
                notes, status, is_rescheduled, rescheduled_count, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ",
        )
        .bind(booking.id.0)
        .bind(booking.service_id.0)
        .bind(&booking.service_title)
        .bind(booking.customer.0)
        .bind(booking.provider.0)
        .bind(booking.bid_id.map(|b| b.0))
        .bind(booking.booking_date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.amount_cents)
        .bind(&booking.requirements)
        .bind(&booking.notes)
        .bind(booking.status.as_str())
        .bind(booking.is_rescheduled)
        .bind(i64::from(booking.rescheduled_count))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(self.pool())
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn commit_transition(
        &self,
        updated: &Booking,
        expected_status: BookingStatus,
        batch: &[NewNotification],
    ) -> std::result::Result<Vec<Notification>, CommitError> {
        let mut tx = self.pool().begin().await.map_err(infra).map_err(CommitError::Store)?;

        // Re-read the status under the row lock; this is where a concurrent
        // transition loses.
        let row = sqlx::query("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(updated.id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(infra)
            .map_err(CommitError::Store)?
            .ok_or_else(|| CommitError::Store(Error::not_found("booking", updated.id.0)))?;
        let current: String = row.try_get("status").map_err(infra).map_err(CommitError::Store)?;
        let actual = BookingStatus::parse(&current)
            .ok_or_else(|| CommitError::Store(Error::Infrastructure(format!(
                "corrupt booking status '{current}'"
            ))))?;
        if actual != expected_status {
            return Err(CommitError::StatusChanged { actual });
        }

        sqlx::query(UPDATE_BOOKING)
            .bind(updated.id.0)
            .bind(updated.status.as_str())
            .bind(&updated.notes)
            .bind(updated.completion_date)
            .bind(updated.rating.map(i16::from))
            .bind(&updated.review)
            .bind(updated.booking_date)
            .bind(updated.is_rescheduled)
            .bind(updated.original_booking_date)
            .bind(i64::from(updated.rescheduled_count))
            .bind(&updated.rescheduled_reason)
            .bind(updated.cancellation_reason.map(CancellationReason::as_str))
            .bind(updated.cancelled_by.map(|u| u.0))
            .bind(updated.cancellation_date)
            .bind(updated.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(infra)
            .map_err(CommitError::Store)?;

        let now = Utc::now();
        let mut persisted = Vec::with_capacity(batch.len());
        for new in batch {
            let notification = new.clone().into_notification(now);
            sqlx::query(
                r"
                INSERT INTO notifications (
                    id, recipient_id, kind, title, message, is_read, is_archived,
                    related_kind, related_id, action_url, group_id, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(notification.id.0)
            .bind(notification.recipient.0)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.is_read)
            .bind(notification.is_archived)
            .bind(notification.related.map(|r| r.kind.as_str()))
            .bind(notification.related.map(|r| r.id))
            .bind(&notification.action_url)
            .bind(notification.group)
            .bind(notification.created_at)
            .execute(&mut *tx)
            .await
            .map_err(infra)
            .map_err(CommitError::Store)?;
            persisted.push(notification);
        }

        tx.commit().await.map_err(infra).map_err(CommitError::Store)?;
        Ok(persisted)
    }

    async fn provider_stats(&self, provider: UserId) -> Result<ProviderStats> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                AVG(CAST(rating AS double precision)) AS average_rating
            FROM bookings
            WHERE provider_id = $1
            ",
        )
        .bind(provider.0)
        .fetch_one(self.pool())
        .await
        .map_err(infra)?;

        let completed: i64 = row.try_get("completed").map_err(infra)?;
        let average_rating: Option<f64> = row.try_get("average_rating").map_err(infra)?;
        Ok(ProviderStats {
            completed_bookings: completed.unsigned_abs(),
            average_rating,
        })
    }
}

/// Decode one `bookings` row.
fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let status: String = row.try_get("status").map_err(infra)?;
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| Error::Infrastructure(format!("corrupt booking status '{status}'")))?;
    let cancellation_reason: Option<String> =
        row.try_get("cancellation_reason").map_err(infra)?;
    let cancellation_reason = cancellation_reason.as_deref().and_then(CancellationReason::parse);
    let rating: Option<i16> = row.try_get("rating").map_err(infra)?;
    let rescheduled_count: i32 = row.try_get("rescheduled_count").map_err(infra)?;

    Ok(Booking {
        id: BookingId(row.try_get("id").map_err(infra)?),
        service_id: ServiceId(row.try_get("service_id").map_err(infra)?),
        service_title: row.try_get("service_title").map_err(infra)?,
        customer: UserId(row.try_get("customer_id").map_err(infra)?),
        provider: UserId(row.try_get("provider_id").map_err(infra)?),
        bid_id: row
            .try_get::<Option<uuid::Uuid>, _>("bid_id")
            .map_err(infra)?
            .map(BidId),
        booking_date: row.try_get("booking_date").map_err(infra)?,
        start_time: row.try_get("start_time").map_err(infra)?,
        end_time: row.try_get("end_time").map_err(infra)?,
        amount_cents: row.try_get("amount_cents").map_err(infra)?,
        requirements: row.try_get("requirements").map_err(infra)?,
        notes: row.try_get("notes").map_err(infra)?,
        status,
        completion_date: row.try_get("completion_date").map_err(infra)?,
        rating: rating.and_then(|r| u8::try_from(r).ok()),
        review: row.try_get("review").map_err(infra)?,
        is_rescheduled: row.try_get("is_rescheduled").map_err(infra)?,
        original_booking_date: row.try_get("original_booking_date").map_err(infra)?,
        rescheduled_count: rescheduled_count.unsigned_abs(),
        rescheduled_reason: row.try_get("rescheduled_reason").map_err(infra)?,
        cancellation_reason,
        cancelled_by: row
            .try_get::<Option<uuid::Uuid>, _>("cancelled_by")
            .map_err(infra)?
            .map(UserId),
        cancellation_date: row.try_get("cancellation_date").map_err(infra)?,
        created_at: row.try_get("created_at").map_err(infra)?,
        updated_at: row.try_get("updated_at").map_err(infra)?,
    })
}
