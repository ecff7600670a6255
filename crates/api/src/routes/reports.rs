//! Scheduled report handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, Permission, ScheduleReportRequest, ScheduledReport, ScheduledReportQuery,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, ScheduledReportRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(schedule_report))
        .route(
            "/:id",
            get(get_report).put(update_report).delete(delete_report),
        )
}

fn report_not_found() -> ApiError {
    ApiError::NotFound("Scheduled report not found".to_string())
}

/// Schedule a report. The first run is computed from now.
///
/// POST /api/reports/scheduled
async fn schedule_report(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<ScheduleReportRequest>,
) -> Result<(StatusCode, Json<ScheduledReport>), ApiError> {
    user.require(Permission::ManageReports)?;
    request.validate()?;

    let report = ScheduledReportRepository::new(state.pool.clone())
        .create(&request, user.user_id, Utc::now())
        .await?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::ScheduleReport)
            .on_entity(entity::REPORT, report.id)
            .with_details(format!(
                "Scheduled {} report \"{}\" ({})",
                report.report_type, report.name, report.frequency
            ))
            .build(),
    );

    info!(report_id = %report.id, frequency = %report.frequency, "Report scheduled");
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/reports/scheduled?isActive
async fn list_reports(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ScheduledReportQuery>,
) -> Result<Json<Vec<ScheduledReport>>, ApiError> {
    user.require(Permission::ManageReports)?;

    let reports = ScheduledReportRepository::new(state.pool.clone())
        .list(&query)
        .await?;
    Ok(Json(reports))
}

/// GET /api/reports/scheduled/:id
async fn get_report(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledReport>, ApiError> {
    user.require(Permission::ManageReports)?;

    let report = ScheduledReportRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(report_not_found)?;
    Ok(Json(report))
}

/// PUT /api/reports/scheduled/:id
async fn update_report(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<ScheduleReportRequest>,
) -> Result<Json<ScheduledReport>, ApiError> {
    user.require(Permission::ManageReports)?;
    request.validate()?;

    let report = ScheduledReportRepository::new(state.pool.clone())
        .update(id, &request, Utc::now())
        .await?
        .ok_or_else(report_not_found)?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateScheduledReport)
            .on_entity(entity::REPORT, report.id)
            .with_details(format!("Updated report \"{}\"", report.name))
            .build(),
    );
    Ok(Json(report))
}

/// DELETE /api/reports/scheduled/:id
async fn delete_report(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageReports)?;

    if !ScheduledReportRepository::new(state.pool.clone()).delete(id).await? {
        return Err(report_not_found());
    }

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::DeleteScheduledReport)
            .on_entity(entity::REPORT, id)
            .warning()
            .build(),
    );
    info!(report_id = %id, "Scheduled report deleted");
    Ok(StatusCode::NO_CONTENT)
}
