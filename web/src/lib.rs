//! HTTP and WebSocket surface for the marketplace backend.
//!
//! Handlers stay thin: request parsing, the session extractor, and the
//! domain-error-to-status mapping live here; every booking and notification
//! rule lives in `marketplace-core`.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
