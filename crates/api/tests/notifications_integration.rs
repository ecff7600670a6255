//! Notification preference integration tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_app, test_pool, TestUser};
use serde_json::json;

#[tokio::test]
async fn test_preferences_are_stored_per_user() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let manager = TestUser::manager();
    let other = TestUser::manager();

    let (status, initial) = send(
        &app,
        Method::GET,
        "/api/notifications/preferences",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", initial);

    let preferences = json!({
        "CONTRACT_EXPIRING": { "inApp": true, "email": false },
        "SYSTEM": { "inApp": false, "email": true },
    });
    let (status, stored) = send(
        &app,
        Method::PUT,
        "/api/notifications/preferences",
        Some(&manager),
        Some(preferences.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", stored);
    assert_eq!(stored, preferences);

    let (_, reread) = send(
        &app,
        Method::GET,
        "/api/notifications/preferences",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(reread, preferences);

    let (_, untouched) = send(
        &app,
        Method::GET,
        "/api/notifications/preferences",
        Some(&other),
        None,
    )
    .await;
    assert_ne!(untouched, preferences);
}

#[tokio::test]
async fn test_preferences_reject_unknown_type() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/notifications/preferences",
        Some(&TestUser::user()),
        Some(json!({ "NEWSLETTER": { "inApp": true, "email": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
