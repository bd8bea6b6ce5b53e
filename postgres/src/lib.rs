//! PostgreSQL implementation of the marketplace store traits.
//!
//! One [`PostgresStore`] implements `BookingStore`, `NotificationStore`, and
//! `UserDirectory` over a shared connection pool. The transition commit runs
//! in a single transaction that re-reads the booking's status under
//! `SELECT ... FOR UPDATE`, which is the row-lock guarantee the engine's
//! concurrent-transition property rests on.
//!
//! Queries use the runtime-checked sqlx API so the crate builds without a
//! live database; schema lives in embedded migrations.

mod booking;
mod directory;
mod notification;
mod session;

use marketplace_core::{Error, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Shared Postgres-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a fresh pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Infrastructure`] if the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(infra)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Infrastructure`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Infrastructure(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Access the underlying pool (health checks, ad-hoc queries).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map any sqlx error into the infrastructure category.
pub(crate) fn infra(e: sqlx::Error) -> Error {
    Error::Infrastructure(e.to_string())
}
