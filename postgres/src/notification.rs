//! `NotificationStore` implementation.

use crate::{PostgresStore, infra};
use async_trait::async_trait;
use chrono::Utc;
use marketplace_core::store::NotificationStore;
use marketplace_core::{
    EntityKind, Error, NewNotification, Notification, NotificationId, NotificationKind,
    RelatedEntity, Result, UserId,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
        let notification = notification.clone().into_notification(Utc::now());
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
        .execute(self.pool())
        .await
        .map_err(infra)?;
        Ok(notification)
    }

    async fn recent(&self, owner: UserId, limit: usize) -> Result<Vec<Notification>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND NOT is_archived
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(owner.0)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(infra)?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, owner: UserId) -> Result<u64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS unread FROM notifications
            WHERE recipient_id = $1 AND NOT is_read AND NOT is_archived
            ",
        )
        .bind(owner.0)
        .fetch_one(self.pool())
        .await
        .map_err(infra)?;
        let unread: i64 = row.try_get("unread").map_err(infra)?;
        Ok(unread.unsigned_abs())
    }

    async fn mark_read(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND recipient_id = $2 AND NOT is_read
            ",
        )
        .bind(id.0)
        .bind(owner.0)
        .execute(self.pool())
        .await
        .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, owner: UserId) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET is_read = TRUE
            WHERE recipient_id = $1 AND NOT is_read AND NOT is_archived
            ",
        )
        .bind(owner.0)
        .execute(self.pool())
        .await
        .map_err(infra)?;
        Ok(result.rows_affected())
    }

    async fn archive(&self, owner: UserId, id: NotificationId) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET is_archived = TRUE
            WHERE id = $1 AND recipient_id = $2 AND NOT is_archived
            ",
        )
        .bind(id.0)
        .bind(owner.0)
        .execute(self.pool())
        .await
        .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }
}

/// Decode one `notifications` row.
fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let kind: String = row.try_get("kind").map_err(infra)?;
    let kind = NotificationKind::parse(&kind)
        .ok_or_else(|| Error::Infrastructure(format!("corrupt notification kind '{kind}'")))?;

    let related_kind: Option<String> = row.try_get("related_kind").map_err(infra)?;
    let related_id: Option<uuid::Uuid> = row.try_get("related_id").map_err(infra)?;
    let related = match (related_kind, related_id) {
        (Some(k), Some(id)) => {
            let kind = EntityKind::parse(&k)
                .ok_or_else(|| Error::Infrastructure(format!("corrupt entity kind '{k}'")))?;
            Some(RelatedEntity { kind, id })
        }
        _ => None,
    };

    Ok(Notification {
        id: NotificationId(row.try_get("id").map_err(infra)?),
        recipient: UserId(row.try_get("recipient_id").map_err(infra)?),
        kind,
        title: row.try_get("title").map_err(infra)?,
        message: row.try_get("message").map_err(infra)?,
        is_read: row.try_get("is_read").map_err(infra)?,
        is_archived: row.try_get("is_archived").map_err(infra)?,
        related,
        action_url: row.try_get("action_url").map_err(infra)?,
        group: row.try_get("group_id").map_err(infra)?,
        created_at: row.try_get("created_at").map_err(infra)?,
    })
}
