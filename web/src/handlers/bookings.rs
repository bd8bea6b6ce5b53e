//! Booking REST handlers.
//!
//! Thin shells: deserialize, delegate to the transition engine, map errors.
//! No booking rule lives here.

use crate::error::ApiError;
use crate::extractors::SessionUser;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use marketplace_core::store::ProviderStats;
use marketplace_core::{
    Booking, BookingId, BookingStatus, CancellationReason, NewBooking, UserId,
};
use serde::Deserialize;
use uuid::Uuid;

/// `POST /api/bookings`
pub async fn create(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(new): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state.engine.create_booking(&user, new).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// `GET /api/bookings/:id`
pub async fn get(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state.engine.get_booking(BookingId(id), &user).await?;
    Ok(Json(booking))
}

/// Body of `PUT /api/bookings/:id/status`.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    /// Requested target status.
    pub status: BookingStatus,
    /// Optional note appended to the booking.
    pub notes: Option<String>,
}

/// `PUT /api/bookings/:id/status`
pub async fn change_status(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .change_status(BookingId(id), &user, req.status, req.notes)
        .await?;
    Ok(Json(booking))
}

/// Body of `POST /api/bookings/:id/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Why the booking is being cancelled.
    pub cancellation_reason: CancellationReason,
    /// Optional free-text detail, appended to the booking notes.
    pub notes: Option<String>,
}

/// `POST /api/bookings/:id/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .cancel(BookingId(id), &user, req.cancellation_reason, req.notes)
        .await?;
    Ok(Json(booking))
}

/// Body of `PATCH /api/bookings/:id/reschedule`.
#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    /// The new (future) date.
    pub booking_date: NaiveDate,
    /// Mandatory reason, shown to the counterpart.
    pub rescheduled_reason: String,
}

/// `PATCH /api/bookings/:id/reschedule`
pub async fn reschedule(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .reschedule(BookingId(id), &user, req.booking_date, req.rescheduled_reason)
        .await?;
    Ok(Json(booking))
}

/// Body of `POST /api/bookings/:id/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Rating, 1 through 5.
    pub rating: u8,
    /// Review text.
    pub review: String,
}

/// `POST /api/bookings/:id/review`
pub async fn review(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .add_review(BookingId(id), &user, req.rating, req.review)
        .await?;
    Ok(Json(booking))
}

/// `GET /api/providers/:id/stats`
pub async fn provider_stats(
    State(state): State<AppState>,
    SessionUser(_user): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProviderStats>, ApiError> {
    let stats = state.engine.provider_stats(UserId(id)).await?;
    Ok(Json(stats))
}
