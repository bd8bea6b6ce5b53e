//! Server configuration from the environment.

use anyhow::Context;
use std::net::SocketAddr;

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Connection pool cap.
    pub max_connections: u32,
}

impl AppConfig {
    /// Read configuration from `DATABASE_URL`, `BIND_ADDR`, and
    /// `MAX_DB_CONNECTIONS`, with defaults for the latter two.
    ///
    /// # Errors
    ///
    /// Returns an error when `DATABASE_URL` is missing or a value fails to
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;
        let max_connections = std::env::var("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("MAX_DB_CONNECTIONS must be a number")?;
        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
        })
    }
}
