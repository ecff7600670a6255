//! Scheduled report integration tests.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{send, test_app, test_pool, unique_name, TestUser};
use persistence::repositories::ScheduledReportRepository;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_schedule_update_and_delete_report() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let manager = TestUser::manager();
    let name = unique_name("Monthly revenue");

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/reports/scheduled",
        Some(&manager),
        Some(json!({
            "name": name,
            "reportType": "FINANCIAL",
            "frequency": "MONTHLY",
            "parameters": { "serviceType": "VAS" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["isActive"], true);
    assert!(created["nextRun"].is_string());
    assert!(created["lastRun"].is_null());
    assert_eq!(created["parameters"]["serviceType"], "VAS");
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/reports/scheduled/{}", id);

    let (status, listed) = send(
        &app,
        Method::GET,
        "/api/reports/scheduled?isActive=true",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().iter().any(|r| r["id"] == id));

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&manager),
        Some(json!({
            "name": name,
            "reportType": "SALES",
            "frequency": "WEEKLY",
            "isActive": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["reportType"], "SALES");
    assert_eq!(updated["frequency"], "WEEKLY");
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["parameters"], json!({}));
    assert_ne!(updated["nextRun"], created["nextRun"]);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schedule_report_validation() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/reports/scheduled",
        Some(&admin),
        Some(json!({ "name": "ab", "reportType": "SALES", "frequency": "DAILY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/reports/scheduled",
        Some(&admin),
        Some(json!({
            "name": "Daily sales",
            "reportType": "SALES",
            "frequency": "DAILY",
            "parameters": [],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/reports/scheduled/{}", Uuid::new_v4()),
        Some(&admin),
        Some(json!({ "name": "Daily sales", "reportType": "SALES", "frequency": "DAILY" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reports_forbidden_for_agent() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/reports/scheduled",
        Some(&TestUser::agent()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/reports/scheduled",
        Some(&TestUser::user()),
        Some(json!({ "name": "Daily sales", "reportType": "SALES", "frequency": "DAILY" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_one_off_report_is_claimed_once() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool.clone());
    let admin = TestUser::admin();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/reports/scheduled",
        Some(&admin),
        Some(json!({
            "name": unique_name("Complaint snapshot"),
            "reportType": "COMPLAINTS",
            "frequency": "ONCE",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let repo = ScheduledReportRepository::new(pool);
    let claimed = repo.claim_due(Utc::now()).await.unwrap();
    let report = claimed.iter().find(|r| r.id == id).unwrap();
    assert!(!report.is_active);
    assert!(report.next_run.is_none());
    assert!(report.last_run.is_some());

    let again = repo.claim_due(Utc::now()).await.unwrap();
    assert!(again.iter().all(|r| r.id != id));
}
