//! VAS and bulk service import handlers.
//!
//! Both run the import inside the request and answer with a summary. The
//! parking import streams its progress instead; see
//! [`parking_services`](super::parking_services).

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, ImportKind, ImportReport, ImportRequest, InvalidRow, Permission,
};
use domain::services::{ActivityLogBuilder, NoopProgress};
use persistence::repositories::ActivityLogRepository;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, UserAuth};

/// Errors, warnings and invalid rows beyond this count are left out of the
/// response.
const MAX_REPORTED_MESSAGES: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/vas-services/import", post(import_vas))
        .route("/api/bulk-services/import", post(import_bulk))
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub file_name: String,
    pub records_processed: usize,
    pub imported: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub invalid_rows: Vec<InvalidRow>,
}

impl ImportSummary {
    pub fn new(file_name: String, report: &ImportReport) -> Self {
        Self {
            file_name,
            records_processed: report.records_processed,
            imported: report.imported,
            updated: report.updated,
            failed: report.failed(),
            errors: report.errors.iter().take(MAX_REPORTED_MESSAGES).cloned().collect(),
            warnings: report
                .warnings
                .iter()
                .take(MAX_REPORTED_MESSAGES)
                .cloned()
                .collect(),
            invalid_rows: report
                .invalid_rows
                .iter()
                .take(MAX_REPORTED_MESSAGES)
                .cloned()
                .collect(),
        }
    }
}

/// Import VAS services from an uploaded CSV or XLSX file.
///
/// POST /api/vas-services/import
async fn import_vas(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<ImportRequest>,
) -> Result<Json<ImportSummary>, ApiError> {
    run_import(&state, &user, ImportKind::Vas, request).await
}

/// Import bulk SMS services from an uploaded CSV file.
///
/// POST /api/bulk-services/import
async fn import_bulk(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<ImportRequest>,
) -> Result<Json<ImportSummary>, ApiError> {
    run_import(&state, &user, ImportKind::Bulk, request).await
}

async fn run_import(
    state: &AppState,
    user: &UserAuth,
    kind: ImportKind,
    request: ImportRequest,
) -> Result<Json<ImportSummary>, ApiError> {
    user.require(Permission::ImportServices)?;
    request.validate()?;

    // Dropping the handler (client gone) cancels any external conversion.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state
        .importer
        .run(
            kind,
            &request.uploaded_file_path,
            request.provider_id,
            Arc::new(NoopProgress),
            cancel,
        )
        .await?;

    let (action, entity_type) = match kind {
        ImportKind::Vas => (ActivityAction::ImportVasServices, entity::VAS_SERVICE),
        ImportKind::Bulk => (ActivityAction::ImportBulkServices, entity::BULK_SERVICE),
        ImportKind::Parking => (ActivityAction::ImportParkingServices, entity::PARKING_SERVICE),
    };
    record_import(state, user, action, entity_type, &outcome.file_name, &outcome.report);

    Ok(Json(ImportSummary::new(outcome.file_name, &outcome.report)))
}

/// Activity entry for a finished import; WARNING when rows were rejected.
pub(crate) fn record_import(
    state: &AppState,
    user: &UserAuth,
    action: ActivityAction,
    entity_type: &str,
    file_name: &str,
    report: &ImportReport,
) {
    let builder = ActivityLogBuilder::user_action(user.user_id, action)
        .on_entity_type(entity_type)
        .with_details(format!(
            "{}: {} imported, {} updated, {} failed",
            file_name,
            report.imported,
            report.updated,
            report.failed()
        ));
    let builder = if report.failed() > 0 {
        builder.warning()
    } else {
        builder
    };
    ActivityLogRepository::new(state.pool.clone()).record(builder.build());
}
