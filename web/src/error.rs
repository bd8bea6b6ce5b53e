//! Error bridge between the domain and HTTP.
//!
//! One [`ApiError`] type wraps domain errors and implements `IntoResponse`.
//! The mapping is fixed: validation → 422, permission → 403, transition-rule
//! violations → 400 (carrying the currently valid targets), not-found → 404,
//! infrastructure → 500 with the detail kept out of the body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use marketplace_core::{BookingStatus, Error as CoreError};
use serde::Serialize;
use std::fmt;

/// HTTP-facing error.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    valid_next_states: Option<Vec<BookingStatus>>,
}

impl ApiError {
    /// 401 for missing or unresolvable credentials.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: message.into(),
            valid_next_states: None,
        }
    }

    #[cfg(test)]
    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn valid_next_states(&self) -> Option<&[BookingStatus]> {
        self.valid_next_states.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, code, valid_next_states) = match &err {
            CoreError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", None),
            CoreError::Permission(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", None),
            CoreError::InvalidTransition { valid, .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_TRANSITION",
                Some(valid.clone()),
            ),
            CoreError::PrematureCompletion { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_TRANSITION", None)
            }
            CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            CoreError::Infrastructure(detail) => {
                tracing::error!(%detail, "request failed on infrastructure");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "INTERNAL_SERVER_ERROR",
                    message: "An internal error occurred".to_string(),
                    valid_next_states: None,
                };
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
            valid_next_states,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_next_states: Option<Vec<BookingStatus>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
            valid_next_states: self.valid_next_states,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use marketplace_core::Role;
    use uuid::Uuid;

    #[test]
    fn transition_errors_carry_the_valid_targets() {
        let err = ApiError::from(CoreError::InvalidTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Completed,
            role: Role::Provider,
            valid: vec![BookingStatus::Disputed],
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.valid_next_states(), Some(&[BookingStatus::Disputed][..]));
    }

    #[test]
    fn status_mapping_per_category() {
        let cases = [
            (CoreError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::Permission("x".into()), StatusCode::FORBIDDEN),
            (
                CoreError::not_found("booking", Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::Infrastructure("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn infrastructure_detail_stays_out_of_the_body() {
        let err = ApiError::from(CoreError::Infrastructure("password=hunter2".into()));
        assert!(!err.message.contains("hunter2"));
    }
}
