//! Request authentication extractor.
//!
//! Every protected route takes a [`SessionUser`], which resolves the bearer
//! token through the injected session provider. Realtime clients that cannot
//! set headers (browser `WebSocket`) may carry the token in a `token` query
//! parameter instead.

use crate::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use marketplace_core::AuthUser;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct SessionUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| parts.uri.query().and_then(token_from_query))
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
        let user = state
            .sessions
            .authenticate(&token)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::unauthorized("unknown or expired token"))?;
        Ok(Self(user))
    }
}

/// Token from an `Authorization: Bearer …` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

/// Token from a raw query string (`?token=…`).
fn token_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}
