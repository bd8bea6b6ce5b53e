//! Liveness probe.

use axum::Json;
use serde::Serialize;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `"ok"` when the process answers at all.
    pub status: &'static str,
}

/// `GET /health`
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}
