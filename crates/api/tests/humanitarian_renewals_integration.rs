//! Humanitarian renewal integration tests.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{
    create_humanitarian_contract, create_humanitarian_org, create_provider,
    create_provider_contract, days_from_today, send, test_app, test_pool, TestUser,
};
use serde_json::json;

async fn open_humanitarian_renewal(
    app: &Router,
    admin: &TestUser,
    contract_id: &str,
    org_id: &str,
) -> String {
    let (status, renewal) = send(
        app,
        Method::POST,
        "/api/humanitarian-renewals",
        Some(admin),
        Some(json!({
            "contractId": contract_id,
            "humanitarianOrgId": org_id,
            "proposedStartDate": days_from_today(66),
            "proposedEndDate": days_from_today(430),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", renewal);
    renewal["id"].as_str().unwrap().to_string()
}

async fn contract_status(app: &Router, admin: &TestUser, contract_id: &str) -> String {
    let (_, contract) = send(
        app,
        Method::GET,
        &format!("/api/contracts/{}", contract_id),
        Some(admin),
        None,
    )
    .await;
    contract["status"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_rejects_mismatched_organisation() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let org_id = create_humanitarian_org(&app, &admin).await;
    let other_org_id = create_humanitarian_org(&app, &admin).await;
    let (contract_id, _) = create_humanitarian_contract(&app, &admin, &org_id).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/humanitarian-renewals",
        Some(&admin),
        Some(json!({
            "contractId": contract_id,
            "humanitarianOrgId": other_org_id,
            "proposedStartDate": days_from_today(66),
            "proposedEndDate": days_from_today(430),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(contract_status(&app, &admin, &contract_id).await, "ACTIVE");
}

#[tokio::test]
async fn test_routes_ignore_provider_renewals() {
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
            "proposedStartDate": days_from_today(400),
            "proposedEndDate": days_from_today(765),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", renewal);
    let renewal_id = renewal["id"].as_str().unwrap();
    let uri = format!("/api/humanitarian-renewals/{}", renewal_id);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "legalApproved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/humanitarian-renewals/bulk-delete",
        Some(&admin),
        Some(json!({ "ids": [renewal_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["deleted"], 0);

    // Still reachable through the contract routes.
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
async fn test_bulk_delete_removes_all_and_restores_contracts() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let org_id = create_humanitarian_org(&app, &admin).await;
    let (first_contract, first_number) = create_humanitarian_contract(&app, &admin, &org_id).await;
    let (second_contract, second_number) = create_humanitarian_contract(&app, &admin, &org_id).await;
    let first = open_humanitarian_renewal(&app, &admin, &first_contract, &org_id).await;
    let second = open_humanitarian_renewal(&app, &admin, &second_contract, &org_id).await;
    assert_eq!(contract_status(&app, &admin, &first_contract).await, "RENEWAL_IN_PROGRESS");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/humanitarian-renewals/bulk-delete",
        Some(&admin),
        Some(json!({ "ids": [first, second] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["deleted"], 2);
    let numbers: Vec<&str> = body["contractNumbers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n.as_str())
        .collect();
    assert!(numbers.contains(&first_number.as_str()));
    assert!(numbers.contains(&second_number.as_str()));

    assert_eq!(contract_status(&app, &admin, &first_contract).await, "ACTIVE");
    assert_eq!(contract_status(&app, &admin, &second_contract).await, "ACTIVE");
}

#[tokio::test]
async fn test_bulk_delete_rejects_batch_with_final_processing() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    let admin = TestUser::admin();
    let org_id = create_humanitarian_org(&app, &admin).await;
    let (done_contract, done_number) = create_humanitarian_contract(&app, &admin, &org_id).await;
    let (open_contract, _) = create_humanitarian_contract(&app, &admin, &org_id).await;
    let done = open_humanitarian_renewal(&app, &admin, &done_contract, &org_id).await;
    let open = open_humanitarian_renewal(&app, &admin, &open_contract, &org_id).await;

    let (status, finished) = send(
        &app,
        Method::PATCH,
        &format!("/api/humanitarian-renewals/{}", done),
        Some(&admin),
        Some(json!({
            "documentsReceived": true,
            "legalApproved": true,
            "financialApproved": true,
            "signatureReceived": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", finished);
    assert_eq!(finished["subStatus"], "FINAL_PROCESSING");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/humanitarian-renewals/bulk-delete",
        Some(&admin),
        Some(json!({ "ids": [done, open] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert!(body["message"].as_str().unwrap().contains(&done_number));

    // Nothing was deleted.
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/humanitarian-renewals/{}", open),
        Some(&admin),
        Some(json!({ "documentsReceived": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contract_status(&app, &admin, &open_contract).await, "RENEWAL_IN_PROGRESS");
}
