//! Contract and renewal workflow integration tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    contract_number, create_contract, create_provider, create_provider_contract,
    create_provider_contract_ending, days_from_today, send, test_app, test_pool, TestUser,
};
use serde_json::{json, Value};

async fn open_renewal(app: &axum::Router, admin: &TestUser, contract_id: &str) -> String {
    let (status, renewal) = send(
        app,
        Method::POST,
        &format!("/api/contracts/{}/renewals", contract_id),
        Some(admin),
        Some(json!({
            "proposedStartDate": days_from_today(400),
            "proposedEndDate": days_from_today(765),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", renewal);
    renewal["id"].as_str().unwrap().to_string()
}

async fn contract_status(app: &axum::Router, admin: &TestUser, contract_id: &str) -> Value {
    let (status, contract) = send(
        app,
        Method::GET,
        &format!("/api/contracts/{}", contract_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    contract["status"].clone()
}

#[tokio::test]
async fn test_contract_requires_authentication() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/contracts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_agent_cannot_create_contract() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let agent = TestUser::agent();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/contracts",
        Some(&agent),
        Some(json!({
            "contractNumber": "UG-AGENT",
            "name": "Not allowed",
            "contractType": "PROVIDER",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31",
            "providerId": uuid::Uuid::new_v4(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_contract_rejects_end_before_start() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/contracts",
        Some(&admin),
        Some(json!({
            "contractNumber": "UG-BAD-DATES",
            "name": "Bad dates",
            "contractType": "PROVIDER",
            "startDate": "2025-12-31",
            "endDate": "2025-01-01",
            "providerId": provider_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}

#[tokio::test]
async fn test_renewal_workflow_completes_and_locks() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;
    let contract_id = create_provider_contract(&app, &admin, &provider_id).await;

    let (status, renewal) = send(
        &app,
        Method::POST,
        &format!("/api/contracts/{}/renewals", contract_id),
        Some(&admin),
        Some(json!({
            "proposedStartDate": "2026-01-01",
            "proposedEndDate": "2026-12-31",
            "proposedRevenue": 15.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", renewal);
    assert_eq!(renewal["subStatus"], "DOCUMENT_COLLECTION");
    assert_eq!(renewal["progressPercentage"], 0);
    let renewal_id = renewal["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/api/renewals/{}", renewal_id),
        Some(&admin),
        Some(json!({ "documentsReceived": true, "legalApproved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["subStatus"], "FINANCIAL_APPROVAL");
    assert_eq!(updated["progressPercentage"], 50);

    let (status, done) = send(
        &app,
        Method::PATCH,
        &format!("/api/renewals/{}", renewal_id),
        Some(&admin),
        Some(json!({ "financialApproved": true, "signatureReceived": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", done);
    assert_eq!(done["subStatus"], "FINAL_PROCESSING");
    assert_eq!(done["progressPercentage"], 100);

    let (status, contract) = send(
        &app,
        Method::GET,
        &format!("/api/contracts/{}", contract_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contract["status"], "ACTIVE");
    assert_eq!(contract["endDate"], "2026-12-31");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/renewals/{}", renewal_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_agent_cannot_delete_renewal() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let agent = TestUser::agent();
    let provider_id = create_provider(&app, &admin).await;
    let contract_id = create_provider_contract(&app, &admin, &provider_id).await;

    let (_, renewal) = send(
        &app,
        Method::POST,
        &format!("/api/contracts/{}/renewals", contract_id),
        Some(&admin),
        Some(json!({
            "proposedStartDate": "2026-01-01",
            "proposedEndDate": "2026-12-31",
        })),
    )
    .await;
    let renewal_id = renewal["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/renewals/{}", renewal_id),
        Some(&agent),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/renewals/{}", renewal_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_export_rejects_negative_window() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/contracts/export?expiringWithin=-5",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expiring_contracts_are_ordered() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;

    let later = create_provider_contract_ending(&app, &admin, &provider_id, 20).await;
    let sooner = create_provider_contract_ending(&app, &admin, &provider_id, 3).await;
    let renewing = create_provider_contract_ending(&app, &admin, &provider_id, 40).await;
    open_renewal(&app, &admin, &renewing).await;
    let expired = create_contract(
        &app,
        &admin,
        json!({
            "contractNumber": contract_number(),
            "name": "Expired contract",
            "contractType": "PROVIDER",
            "status": "EXPIRED",
            "startDate": days_from_today(-400),
            "endDate": days_from_today(-5),
            "providerId": provider_id,
        }),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/contracts/expiring?days=60", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let ours = [&renewing, &expired, &sooner, &later];
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["id"].as_str())
        .filter(|id| ours.iter().any(|o| o.as_str() == *id))
        .collect();
    assert_eq!(
        ids,
        vec![renewing.as_str(), expired.as_str(), sooner.as_str(), later.as_str()]
    );
}

#[tokio::test]
async fn test_deleting_last_renewal_restores_contract() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;
    let running = create_provider_contract_ending(&app, &admin, &provider_id, 30).await;
    let lapsed = create_provider_contract_ending(&app, &admin, &provider_id, -10).await;

    for (contract_id, expected) in [(&running, "ACTIVE"), (&lapsed, "EXPIRED")] {
        let renewal_id = open_renewal(&app, &admin, contract_id).await;
        assert_eq!(contract_status(&app, &admin, contract_id).await, "RENEWAL_IN_PROGRESS");

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/renewals/{}", renewal_id),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(contract_status(&app, &admin, contract_id).await, expected);
    }
}

#[tokio::test]
async fn test_contract_routes_ignore_humanitarian_renewals() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let org_id = common::create_humanitarian_org(&app, &admin).await;
    let (contract_id, _) = common::create_humanitarian_contract(&app, &admin, &org_id).await;

    let (status, renewal) = send(
        &app,
        Method::POST,
        "/api/humanitarian-renewals",
        Some(&admin),
        Some(json!({
            "contractId": contract_id,
            "humanitarianOrgId": org_id,
            "proposedStartDate": days_from_today(66),
            "proposedEndDate": days_from_today(430),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", renewal);
    let uri = format!("/api/renewals/{}", renewal["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&admin), Some(json!({ "documentsReceived": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expiry_statistics_and_timeline() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let provider_id = create_provider(&app, &admin).await;
    let contract_id = create_provider_contract_ending(&app, &admin, &provider_id, 10).await;

    let (status, stats) = send(&app, Method::GET, "/api/contracts/statistics/expiry", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", stats);
    assert!(stats["totalExpiring"].as_i64().unwrap() >= 1);
    assert!(stats["expiringIn30Days"].as_i64().unwrap() >= 1);
    assert!(stats["contractsByType"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["type"] == "PROVIDER" && t["label"] == "Pružalac usluga"));

    let (status, timeline) = send(
        &app,
        Method::GET,
        "/api/contracts/timeline/expiry?monthsAhead=2",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", timeline);
    let months = timeline.as_array().unwrap();
    assert!(months.iter().all(|m| m["total"].as_i64().unwrap() > 0));
    assert!(months
        .iter()
        .flat_map(|m| m["contracts"].as_array().unwrap().iter())
        .any(|c| c["id"] == contract_id.as_str()));

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/contracts/timeline/expiry?monthsAhead=61",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
