//! Route table.

use crate::handlers::{bookings, health, notifications};
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, patch, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create))
        .route("/api/bookings/:id", get(bookings::get))
        .route("/api/bookings/:id/status", put(bookings::change_status))
        .route("/api/bookings/:id/cancel", post(bookings::cancel))
        .route("/api/bookings/:id/reschedule", patch(bookings::reschedule))
        .route("/api/bookings/:id/review", post(bookings::review))
        .route("/api/providers/:id/stats", get(bookings::provider_stats))
        .route("/ws/notifications", get(notifications::websocket))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
