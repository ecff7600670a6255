//! Sender blacklist and activity log integration tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_provider, send, test_app, test_pool, unique_name, TestUser};
use serde_json::json;

#[tokio::test]
async fn test_blacklist_entry_blocks_sender_from_effective_date() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;
    let sender = unique_name("PROMO").replace(' ', "_");

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/blacklist",
        Some(&admin),
        Some(json!({
            "senderName": sender,
            "providerId": provider_id,
            "effectiveDate": "2025-03-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", entry);

    let check = |date: &str| {
        format!(
            "/api/blacklist/check?senderName={}&providerId={}&date={}",
            sender, provider_id, date
        )
    };

    let (status, before) = send(&app, Method::GET, &check("2025-02-28"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["blocked"], false);

    let (_, after) = send(&app, Method::GET, &check("2025-03-01"), Some(&admin), None).await;
    assert_eq!(after["blocked"], true);
    assert_eq!(after["matchingEntries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_blacklist_entry_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;
    let body = json!({
        "senderName": "DUPLICATE",
        "providerId": provider_id,
        "effectiveDate": "2025-01-01",
    });

    let (status, _) = send(&app, Method::POST, "/api/blacklist", Some(&admin), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = send(&app, Method::POST, "/api/blacklist", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "conflict");
}

#[tokio::test]
async fn test_agent_cannot_manage_blacklist() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let agent = TestUser::agent();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/blacklist",
        Some(&agent),
        Some(json!({ "senderName": "X", "effectiveDate": "2025-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_activity_logs_admin_only() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let manager = TestUser::manager();

    let (status, _) = send(&app, Method::GET, "/api/activity-logs", Some(&manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = send(
        &app,
        Method::GET,
        "/api/activity-logs?from=2025-01-01&limit=5",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert!(page["data"].is_array());
}
