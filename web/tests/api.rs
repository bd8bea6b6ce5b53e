//! Router-level tests over the in-memory stores.
#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use marketplace_core::{
    AuthUser, GroupRegistry, NotificationService, SystemClock, TransitionEngine,
};
use marketplace_testing::{CapturingPushGateway, InMemoryStore, StaticTokenSessions, user};
use marketplace_web::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

struct App {
    router: Router,
    customer: AuthUser,
    provider: AuthUser,
}

/// Wire the router against in-memory stores with two known tokens.
fn app() -> App {
    let customer = user("Ada");
    let provider = user("Grace");
    let store = Arc::new(InMemoryStore::new());
    let registry = GroupRegistry::new();
    let notifications = NotificationService::new(
        store.clone(),
        registry.clone(),
        Arc::new(CapturingPushGateway::new()),
    );
    let engine = Arc::new(TransitionEngine::new(
        store.clone(),
        notifications.clone(),
        store.clone(),
        Arc::new(SystemClock),
    ));
    let sessions = StaticTokenSessions::new()
        .with_token("tok-customer", customer.clone())
        .with_token("tok-provider", provider.clone());
    let state = AppState {
        engine,
        notifications,
        registry,
        sessions: Arc::new(sessions),
    };
    App {
        router: router(state),
        customer,
        provider,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn booking_body(provider: &AuthUser) -> Value {
    let date = (Utc::now() + Duration::days(7)).date_naive();
    json!({
        "service_id": uuid::Uuid::new_v4(),
        "service_title": "Deep Cleaning",
        "provider": provider.id,
        "booking_date": date,
        "start_time": "09:00:00",
        "end_time": "11:00:00",
        "amount_cents": 15_000,
    })
}

#[tokio::test]
async fn health_answers_without_auth() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_and_unknown_tokens_are_401() {
    let app = app();
    let body = booking_body(&app.provider);

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/bookings", None, body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/bookings", Some("tok-stale"), body),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_can_be_created_and_fetched_by_participants_only() {
    let app = app();

    let (status, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/bookings",
            Some("tok-customer"),
            booking_body(&app.provider),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["customer"], json!(app.customer.id));
    let id = created["id"].as_str().unwrap().to_string();

    let uri = format!("/api/bookings/{id}");
    let (status, fetched) = send(
        &app.router,
        json_request("GET", &uri, Some("tok-provider"), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn rejected_transition_enumerates_valid_targets() {
    let app = app();
    let (_, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/bookings",
            Some("tok-customer"),
            booking_body(&app.provider),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    // A pending provider cannot jump to completed; the body says what they
    // could do instead.
    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/bookings/{id}/status"),
            Some("tok-provider"),
            json!({ "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert_eq!(body["valid_next_states"], json!(["disputed"]));
}

#[tokio::test]
async fn cancel_review_and_stats_round_trip() {
    let app = app();
    let (_, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/bookings",
            Some("tok-customer"),
            booking_body(&app.provider),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, cancelled) = send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            Some("tok-customer"),
            json!({ "cancellation_reason": "customer_request", "notes": "rain" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancellation_reason"], "customer_request");

    // Reviews are rejected off the completed state, as validation.
    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/review"),
            Some("tok-customer"),
            json!({ "rating": 5, "review": "never happened" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, stats) = send(
        &app.router,
        json_request(
            "GET",
            &format!("/api/providers/{}/stats", app.provider.id),
            Some("tok-customer"),
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["completed_bookings"], 0);
    assert_eq!(stats["average_rating"], Value::Null);
}
