//! `SessionProvider` implementation over the sessions table.

use crate::directory::user_from_row;
use crate::{PostgresStore, infra};
use async_trait::async_trait;
use marketplace_core::{AuthUser, Result, SessionProvider};

#[async_trait]
impl SessionProvider for PostgresStore {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>> {
        let row = sqlx::query(
            r"
            SELECT u.id, u.name, u.is_staff
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now() AND u.is_active
            ",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(infra)?;
        row.as_ref().map(user_from_row).transpose()
    }
}
