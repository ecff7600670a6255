//! Common test utilities for integration tests.
//!
//! Integration tests run against the PostgreSQL database named by
//! `TEST_DATABASE_URL` and are skipped when it is unset.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use contract_admin_api::{
    app::{build_router, AppState},
    config::Config,
};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use serde_json::Value;
use shared::jwt::JwtConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-shared-secret-for-contract-admin";

/// Connects to the test database, or `None` when `TEST_DATABASE_URL` is unset.
pub async fn test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

pub fn test_config() -> Config {
    Config::load_for_test(&[("database.url", "postgres://unused")])
        .expect("Failed to load test config")
}

/// A router backed by the test database.
pub fn test_app(pool: PgPool) -> Router {
    let state = AppState::new(test_config(), pool).expect("Failed to build app state");
    build_router(state)
}

/// A signed-in caller.
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn new(role: &str) -> Self {
        let id = Uuid::new_v4();
        let email = format!("{}_{}@example.com", role.to_lowercase(), id.simple());
        let jwt = JwtConfig::hs256(TEST_SECRET, 0).expect("Failed to build JWT config");
        let token = jwt
            .issue_token(id, &email, role, 3600)
            .expect("Failed to issue token");
        Self { id, email, token }
    }

    pub fn admin() -> Self {
        Self::new("ADMIN")
    }

    pub fn manager() -> Self {
        Self::new("MANAGER")
    }

    pub fn agent() -> Self {
        Self::new("AGENT")
    }

    pub fn user() -> Self {
        Self::new("USER")
    }
}

/// Sends a request and returns the status with the parsed JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&TestUser>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4().simple())
}

/// Creates a provider and returns its id.
pub async fn create_provider(app: &Router, admin: &TestUser) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/providers",
        Some(admin),
        Some(serde_json::json!({ "name": unique_name(&CompanyName().fake::<String>()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "provider create failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// `today + days` as an ISO date.
pub fn days_from_today(days: i64) -> String {
    (chrono::Utc::now().date_naive() + chrono::Duration::days(days)).to_string()
}

pub fn contract_number() -> String {
    format!("UG-{}", &Uuid::new_v4().simple().to_string()[..10])
}

/// Creates a contract from `body` and returns its id.
pub async fn create_contract(app: &Router, admin: &TestUser, body: Value) -> String {
    let (status, created) = send(app, Method::POST, "/api/contracts", Some(admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "contract create failed: {}", created);
    created["id"].as_str().unwrap().to_string()
}

/// Creates an active provider contract and returns its id.
pub async fn create_provider_contract(app: &Router, admin: &TestUser, provider_id: &str) -> String {
    create_contract(
        app,
        admin,
        serde_json::json!({
            "contractNumber": contract_number(),
            "name": "Integration contract",
            "contractType": "PROVIDER",
            "status": "ACTIVE",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31",
            "revenuePercentage": 12.5,
            "providerId": provider_id,
        }),
    )
    .await
}

/// Creates an active provider contract ending `days` from today.
pub async fn create_provider_contract_ending(
    app: &Router,
    admin: &TestUser,
    provider_id: &str,
    days: i64,
) -> String {
    create_contract(
        app,
        admin,
        serde_json::json!({
            "contractNumber": contract_number(),
            "name": "Integration contract",
            "contractType": "PROVIDER",
            "status": "ACTIVE",
            "startDate": days_from_today(days - 365),
            "endDate": days_from_today(days),
            "revenuePercentage": 10.0,
            "providerId": provider_id,
        }),
    )
    .await
}

/// Creates a humanitarian organisation and returns its id.
pub async fn create_humanitarian_org(app: &Router, admin: &TestUser) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/humanitarian-orgs",
        Some(admin),
        Some(serde_json::json!({ "name": unique_name("Humanitarna organizacija") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "organisation create failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Creates an active humanitarian contract and returns `(id, contract number)`.
pub async fn create_humanitarian_contract(
    app: &Router,
    admin: &TestUser,
    org_id: &str,
) -> (String, String) {
    let number = contract_number();
    let id = create_contract(
        app,
        admin,
        serde_json::json!({
            "contractNumber": number,
            "name": "Humanitarni broj",
            "contractType": "HUMANITARIAN",
            "status": "ACTIVE",
            "startDate": days_from_today(-300),
            "endDate": days_from_today(65),
            "humanitarianOrgId": org_id,
        }),
    )
    .await;
    (id, number)
}
