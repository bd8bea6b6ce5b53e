//! Shared application state.

use marketplace_core::{GroupRegistry, NotificationService, SessionProvider, TransitionEngine};
use std::sync::Arc;

/// Handles to every service a handler can reach. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// The booking transition engine.
    pub engine: Arc<TransitionEngine>,
    /// Notification persistence and fan-out.
    pub notifications: NotificationService,
    /// Per-user event groups, joined by realtime connections.
    pub registry: GroupRegistry,
    /// Resolves bearer tokens into users.
    pub sessions: Arc<dyn SessionProvider>,
}
