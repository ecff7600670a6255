//! Complaint endpoint handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use csv::{QuoteStyle, WriterBuilder};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, AssignComplaintRequest, ChangeComplaintStatusRequest, Complaint,
    ComplaintComment, ComplaintExportFormat, ComplaintExportQuery, ComplaintQuery,
    ComplaintStatistics, ComplaintStatisticsQuery, ComplaintStatusHistory, CreateComplaintCommentRequest, CreateComplaintRequest, Permission,
    StatusMilestones, UpdateComplaintRequest, UserRole,
};
use domain::services::{
    activity_helpers, compute_complaint_statistics, statistics_range, ActivityLogBuilder,
    NotificationEvent, TREND_DAYS,
};
use persistence::repositories::{ActivityLogRepository, ComplaintRepository, UserRepository};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use shared::pagination::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

const EXPORT_HEADERS: [&str; 12] = [
    "ID",
    "Title",
    "Description",
    "Status",
    "Priority",
    "Provider",
    "Service",
    "Submitter",
    "Assigned agent",
    "Financial impact",
    "Created at",
    "Resolved at",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_complaints).post(create_complaint))
        .route("/export", get(export_complaints))
        .route("/statistics", get(complaint_statistics))
        .route("/:id", get(get_complaint).patch(update_complaint))
        .route("/:id/status", patch(change_status))
        .route("/:id/assign", post(assign_complaint))
        .route("/:id/history", get(complaint_history))
        .route("/:id/comments", get(list_comments).post(add_comment))
}

/// Dashboard counts over complaints created in the requested range.
///
/// GET /api/complaints/statistics?period&startDate&endDate
async fn complaint_statistics(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ComplaintStatisticsQuery>,
) -> Result<Json<ComplaintStatistics>, ApiError> {
    user.require(Permission::ViewComplaintStatistics)?;

    let now = Utc::now();
    let range = statistics_range(&query, now)?;
    let today = now.date_naive();
    let repo = ComplaintRepository::new(state.pool.clone());
    let rows = repo.statistics_rows(range).await?;
    let daily = repo
        .daily_counts(today - chrono::Duration::days(TREND_DAYS - 1))
        .await?;

    Ok(Json(compute_complaint_statistics(&rows, &daily, today)))
}

/// Loads a complaint the caller may see. USER callers only see their own.
async fn visible_complaint(
    state: &AppState,
    user: &UserAuth,
    id: Uuid,
) -> Result<Complaint, ApiError> {
    let complaint = ComplaintRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .filter(|c| user.role != UserRole::User || c.submitter_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Complaint not found".to_string()))?;
    Ok(complaint)
}

/// Create a complaint.
///
/// POST /api/complaints
async fn create_complaint(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<Complaint>), ApiError> {
    request.validate()?;

    let complaint = ComplaintRepository::new(state.pool.clone())
        .create(&request, user.user_id)
        .await?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateComplaint)
            .on_entity(entity::COMPLAINT, complaint.id)
            .with_details(format!("Complaint submitted: {}", complaint.title))
            .build(),
    );
    state
        .notifier
        .notify(NotificationEvent::complaint_created(complaint.id, &complaint.title));

    info!(complaint_id = %complaint.id, priority = complaint.priority, "Complaint created");
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// List complaints.
///
/// GET /api/complaints
async fn list_complaints(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ComplaintQuery>,
) -> Result<Json<Paginated<Complaint>>, ApiError> {
    let own_only = (user.role == UserRole::User).then_some(user.user_id);
    let page = PageRequest::new(query.page, query.limit);
    let (complaints, total) = ComplaintRepository::new(state.pool.clone())
        .list(&query, own_only, page)
        .await?;
    Ok(Json(Paginated::new(complaints, page, total)))
}

/// Get a complaint.
///
/// GET /api/complaints/:id
async fn get_complaint(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Complaint>, ApiError> {
    Ok(Json(visible_complaint(&state, &user, id).await?))
}

/// Update complaint fields.
///
/// PATCH /api/complaints/:id
async fn update_complaint(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateComplaintRequest>,
) -> Result<Json<Complaint>, ApiError> {
    request.validate()?;

    let existing = visible_complaint(&state, &user, id).await?;
    if !existing.editable_by(user.user_id, user.role) {
        return Err(ApiError::Forbidden(
            "Complaint can no longer be edited".to_string(),
        ));
    }

    let complaint = ComplaintRepository::new(state.pool.clone())
        .update(id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound("Complaint not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateComplaint)
            .on_entity(entity::COMPLAINT, complaint.id)
            .build(),
    );
    Ok(Json(complaint))
}

/// Change a complaint's status.
///
/// PATCH /api/complaints/:id/status
async fn change_status(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<ChangeComplaintStatusRequest>,
) -> Result<Json<Complaint>, ApiError> {
    user.require(Permission::ChangeComplaintStatus)?;
    request.validate()?;

    let existing = visible_complaint(&state, &user, id).await?;
    if !existing.status_changeable_by(user.user_id, user.role, request.status) {
        return Err(ApiError::forbidden());
    }
    if existing.status == request.status {
        return Ok(Json(existing));
    }

    let milestones = StatusMilestones::for_transition(&existing, request.status);
    let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let complaint = ComplaintRepository::new(state.pool.clone())
        .change_status(id, existing.status, request.status, milestones, user.user_id, notes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Complaint not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        activity_helpers::complaint_status_changed(
            user.user_id,
            id,
            existing.status,
            complaint.status,
        ),
    );
    state.notifier.notify(NotificationEvent::complaint_status_changed(
        complaint.id,
        &complaint.title,
        complaint.status.as_str(),
        complaint.submitter_id,
    ));

    info!(
        complaint_id = %id,
        from = %existing.status,
        to = %complaint.status,
        "Complaint status changed"
    );
    Ok(Json(complaint))
}

/// Assign a complaint to an agent.
///
/// POST /api/complaints/:id/assign
async fn assign_complaint(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<AssignComplaintRequest>,
) -> Result<Json<Complaint>, ApiError> {
    if !user.role.is_back_office() {
        return Err(ApiError::forbidden());
    }

    let existing = visible_complaint(&state, &user, id).await?;
    if !UserRepository::new(state.pool.clone())
        .is_active_agent(request.agent_id)
        .await?
    {
        return Err(ApiError::validation("Complaints can only be assigned to active agents"));
    }

    let complaint = ComplaintRepository::new(state.pool.clone())
        .assign(id, existing.status, request.agent_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Complaint not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::AssignComplaint)
            .on_entity(entity::COMPLAINT, id)
            .with_details(format!("Assigned to agent {}", request.agent_id))
            .build(),
    );
    state.notifier.notify(NotificationEvent::complaint_assigned(
        complaint.id,
        &complaint.title,
        request.agent_id,
    ));

    Ok(Json(complaint))
}

/// Status history, oldest first.
///
/// GET /api/complaints/:id/history
async fn complaint_history(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ComplaintStatusHistory>>, ApiError> {
    visible_complaint(&state, &user, id).await?;
    let history = ComplaintRepository::new(state.pool.clone()).history(id).await?;
    Ok(Json(history))
}

/// Comments on a complaint. Internal comments are hidden from USER callers.
///
/// GET /api/complaints/:id/comments
async fn list_comments(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ComplaintComment>>, ApiError> {
    visible_complaint(&state, &user, id).await?;
    let comments = ComplaintRepository::new(state.pool.clone())
        .comments(id, user.role != UserRole::User)
        .await?;
    Ok(Json(comments))
}

/// Add a comment.
///
/// POST /api/complaints/:id/comments
async fn add_comment(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<CreateComplaintCommentRequest>,
) -> Result<(StatusCode, Json<ComplaintComment>), ApiError> {
    request.validate()?;
    if request.is_internal && user.role == UserRole::User {
        return Err(ApiError::Forbidden(
            "Only staff can add internal comments".to_string(),
        ));
    }

    visible_complaint(&state, &user, id).await?;
    let comment = ComplaintRepository::new(state.pool.clone())
        .add_comment(id, user.user_id, &request)
        .await?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::AddComplaintComment)
            .on_entity(entity::COMPLAINT, id)
            .build(),
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Export complaints as CSV, JSON or XLSX.
///
/// GET /api/complaints/export?format=xlsx
async fn export_complaints(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ComplaintExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::ExportComplaints)?;
    let format = query.resolved_format().map_err(ApiError::validation)?;
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(ApiError::validation("startDate must not be after endDate"));
        }
    }

    let complaints = ComplaintRepository::new(state.pool.clone())
        .list_for_export(&query)
        .await?;

    let body = match format {
        ComplaintExportFormat::Csv => complaints_csv(&complaints)
            .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?,
        ComplaintExportFormat::Json => serde_json::to_vec_pretty(&complaints)
            .map_err(|e| ApiError::Internal(format!("JSON export failed: {}", e)))?,
        ComplaintExportFormat::Xlsx => complaints_xlsx(&complaints)
            .map_err(|e| ApiError::Internal(format!("XLSX export failed: {}", e)))?,
    };

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::ExportComplaints)
            .on_entity_type(entity::COMPLAINT)
            .with_details(format!(
                "Exported {} complaints as {}",
                complaints.len(),
                format.extension()
            ))
            .build(),
    );

    let disposition = format!(
        "attachment; filename=\"complaints-{}.{}\"",
        Utc::now().format("%Y-%m-%d"),
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

fn export_row(complaint: &Complaint) -> [String; 12] {
    let name = |name: &Option<String>, email: &Option<String>| {
        name.clone()
            .or_else(|| email.clone())
            .unwrap_or_default()
    };
    [
        complaint.id.to_string(),
        complaint.title.clone(),
        complaint.description.clone(),
        complaint.status.to_string(),
        complaint.priority.to_string(),
        complaint.provider_name.clone().unwrap_or_default(),
        complaint.service_name.clone().unwrap_or_default(),
        name(&complaint.submitter_name, &complaint.submitter_email),
        name(&complaint.assigned_agent_name, &complaint.assigned_agent_email),
        complaint
            .financial_impact
            .map(|v| format!("{:.2}", v))
            .unwrap_or_default(),
        complaint.created_at.format("%Y-%m-%d %H:%M").to_string(),
        complaint
            .resolved_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    ]
}

pub fn complaints_csv(complaints: &[Complaint]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(b"\xEF\xBB\xBF".to_vec());
    writer.write_record(EXPORT_HEADERS)?;
    for complaint in complaints {
        writer.write_record(export_row(complaint))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn complaints_xlsx(complaints: &[Complaint]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Complaints")?;

    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    for (idx, complaint) in complaints.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, value) in export_row(complaint).into_iter().enumerate() {
            sheet.write_string(row, col as u16, value)?;
        }
        sheet.write_number(row, 4, f64::from(complaint.priority))?;
        if let Some(impact) = complaint.financial_impact {
            sheet.write_number(row, 9, impact)?;
        }
    }
    sheet.autofit();

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ComplaintStatus;

    fn complaint() -> Complaint {
        Complaint {
            id: Uuid::new_v4(),
            title: "Dupla naplata".into(),
            description: "Naplaćeno dva puta, molim povraćaj".into(),
            status: ComplaintStatus::Resolved,
            priority: 2,
            financial_impact: Some(120.5),
            service_id: None,
            service_name: Some("Parking Zona 1".into()),
            product_id: None,
            product_name: None,
            provider_id: None,
            provider_name: Some("Telenor".into()),
            submitter_id: Uuid::new_v4(),
            submitter_name: None,
            submitter_email: Some("korisnik@example.rs".into()),
            assigned_agent_id: None,
            assigned_agent_name: None,
            assigned_agent_email: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            assigned_at: None,
            resolved_at: Some(Utc::now()),
            closed_at: None,
        }
    }

    #[test]
    fn test_export_row_falls_back_to_email() {
        let row = export_row(&complaint());
        assert_eq!(row[3], "RESOLVED");
        assert_eq!(row[7], "korisnik@example.rs");
        assert_eq!(row[8], "");
        assert_eq!(row[9], "120.50");
        assert!(!row[11].is_empty());
    }

    #[test]
    fn test_csv_export() {
        let bytes = complaints_csv(&[complaint()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("\u{feff}\"ID\",\"Title\""));
        assert!(text.contains("\"Dupla naplata\""));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_xlsx_export_is_zip() {
        let bytes = complaints_xlsx(&[complaint(), complaint()]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
