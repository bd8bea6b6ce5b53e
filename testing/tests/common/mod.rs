//! Shared wiring for the behavioral suites.
#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)] // Test code

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use marketplace_core::{GroupRegistry, NotificationService, TransitionEngine};
use marketplace_testing::{CapturingPushGateway, FixedClock, InMemoryStore};
use std::sync::Arc;

/// Everything a scenario needs, wired the way `main` wires production.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub registry: GroupRegistry,
    pub clock: Arc<FixedClock>,
    pub push: Arc<CapturingPushGateway>,
    pub notifications: NotificationService,
    pub engine: Arc<TransitionEngine>,
}

/// The frozen "today" every scenario starts from.
pub fn start_of_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let registry = GroupRegistry::new();
    let clock = Arc::new(FixedClock::at(start_of_time()));
    let push = Arc::new(CapturingPushGateway::new());
    let notifications = NotificationService::new(store.clone(), registry.clone(), push.clone());
    let engine = Arc::new(TransitionEngine::new(
        store.clone(),
        notifications.clone(),
        store.clone(),
        clock.clone(),
    ));
    Harness {
        store,
        registry,
        clock,
        push,
        notifications,
        engine,
    }
}
