//! Financial and sales analytics integration tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_app, test_pool, TestUser};

const EMPTY_QUARTER: &str = "startDate=1990-01-01&endDate=1990-03-31";

#[tokio::test]
async fn test_financials_for_back_office() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/analytics/financials?{}", EMPTY_QUARTER),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["totalRevenue"], 0.0);
    assert_eq!(body["collectionRate"], 0.0);
    let months = body["revenueByMonth"].as_array().unwrap();
    assert_eq!(months.len(), 3);
    assert!(months.iter().all(|m| m["revenue"] == 0.0));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/analytics/financials",
        Some(&TestUser::manager()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["revenueByMonth"].is_array());
}

#[tokio::test]
async fn test_financials_forbidden_for_agent() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/analytics/financials",
        Some(&TestUser::agent()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/analytics/financials", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_financials_rejects_inverted_window() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/analytics/financials?startDate=2025-06-01&endDate=2025-01-01",
        Some(&TestUser::admin()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sales_metrics() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/analytics/sales?{}", EMPTY_QUARTER),
        Some(&TestUser::admin()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["totalTransactions"], 0);
    assert_eq!(body["transactionsByMonth"].as_array().unwrap().len(), 3);
    assert_eq!(body["growthRate"]["transactionsGrowth"], 0.0);
    assert_eq!(body["growthRate"]["revenueGrowth"], 0.0);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/analytics/sales",
        Some(&TestUser::agent()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
