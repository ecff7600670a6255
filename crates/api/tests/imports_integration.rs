//! Service import integration tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_app, test_config, test_pool, TestUser};
use serde_json::json;
use uuid::Uuid;

/// Writes a CSV into the upload directory and returns its relative name.
fn write_upload(contents: &str) -> String {
    let upload_dir = test_config().import.upload_dir;
    std::fs::create_dir_all(&upload_dir).unwrap();
    let file_name = format!("bulk_{}.csv", Uuid::new_v4().simple());
    std::fs::write(upload_dir.join(&file_name), contents).unwrap();
    file_name
}

#[tokio::test]
async fn test_bulk_import_reports_rows_with_missing_fields() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool.clone());
    let admin = TestUser::admin();

    let agreement = format!("Agreement {}", Uuid::new_v4().simple());
    let file_name = write_upload(&format!(
        "provider_name,agreement_name,service_name,step_name,sender_name,requests,message_parts\n\
         Telekom,{},Glasanje,Step 1,,120,2\n",
        agreement
    ));

    let (status, summary) = send(
        &app,
        Method::POST,
        "/api/bulk-services/import",
        Some(&admin),
        Some(json!({ "uploadedFilePath": file_name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", summary);
    assert_eq!(summary["fileName"], file_name.as_str());
    assert_eq!(summary["recordsProcessed"], 1);
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["failed"], 1);

    let invalid = summary["invalidRows"].as_array().unwrap();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0]["rowIndex"], 0);
    assert_eq!(
        invalid[0]["errors"],
        json!(["Missing required field: sender_name"])
    );
    assert_eq!(invalid[0]["originalRow"]["agreement_name"], agreement.as_str());

    let stored: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM bulk_services WHERE agreement_name = $1")
            .bind(&agreement)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_import_rejects_paths_outside_upload_dir() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app(pool);
    std::fs::create_dir_all(test_config().import.upload_dir).unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bulk-services/import",
        Some(&TestUser::admin()),
        Some(json!({ "uploadedFilePath": "../../../etc/passwd" })),
    )
    .await;
    assert!(status.is_client_error(), "{}", status);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bulk-services/import",
        Some(&TestUser::agent()),
        Some(json!({ "uploadedFilePath": "anything.csv" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
