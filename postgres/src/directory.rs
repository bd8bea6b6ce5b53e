//! `UserDirectory` implementation over the users table.

use crate::{PostgresStore, infra};
use async_trait::async_trait;
use marketplace_core::store::UserDirectory;
use marketplace_core::{AuthUser, Result, UserId};
use sqlx::Row;
use sqlx::postgres::PgRow;

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn get(&self, id: UserId) -> Result<Option<AuthUser>> {
        let row = sqlx::query(
            "SELECT id, name, is_staff FROM users WHERE id = $1 AND is_active",
        )
        .bind(id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(infra)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn staff(&self) -> Result<Vec<AuthUser>> {
        let rows = sqlx::query(
            "SELECT id, name, is_staff FROM users WHERE is_staff AND is_active",
        )
        .fetch_all(self.pool())
        .await
        .map_err(infra)?;
        rows.iter().map(user_from_row).collect()
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> Result<AuthUser> {
    Ok(AuthUser {
        id: UserId(row.try_get("id").map_err(infra)?),
        name: row.try_get("name").map_err(infra)?,
        is_staff: row.try_get("is_staff").map_err(infra)?,
    })
}
