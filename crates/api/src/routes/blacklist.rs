//! Sender blacklist handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, BlacklistQuery, CreateBlacklistEntryRequest, Permission,
    SenderBlacklistEntry, UpdateBlacklistEntryRequest,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, BlacklistRepository};
use serde::{Deserialize, Serialize};
use shared::pagination::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

const DUPLICATE_ENTRY: &str = "Sender is already blacklisted for this provider";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/check", get(check_sender))
        .route(
            "/:id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub sender_name: String,
    pub provider_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub blocked: bool,
    pub matching_entries: Vec<SenderBlacklistEntry>,
}

/// Entries that block `sender` for `provider_id` on `on`.
pub fn matching_entries(
    entries: Vec<SenderBlacklistEntry>,
    sender: &str,
    provider_id: Option<Uuid>,
    on: NaiveDate,
) -> Vec<SenderBlacklistEntry> {
    entries
        .into_iter()
        .filter(|e| e.blocks(sender, provider_id, on))
        .collect()
}

/// GET /api/blacklist
async fn list_entries(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<BlacklistQuery>,
) -> Result<Json<Paginated<SenderBlacklistEntry>>, ApiError> {
    user.require(Permission::ManageBlacklist)?;

    let page = PageRequest::new(query.page, query.limit);
    let (entries, total) = BlacklistRepository::new(state.pool.clone())
        .list(&query, page)
        .await?;
    Ok(Json(Paginated::new(entries, page, total)))
}

/// GET /api/blacklist/:id
async fn get_entry(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<SenderBlacklistEntry>, ApiError> {
    user.require(Permission::ManageBlacklist)?;

    let entry = BlacklistRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blacklist entry not found".to_string()))?;
    Ok(Json(entry))
}

/// POST /api/blacklist
async fn create_entry(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateBlacklistEntryRequest>,
) -> Result<(StatusCode, Json<SenderBlacklistEntry>), ApiError> {
    user.require(Permission::ManageBlacklist)?;
    request.validate()?;

    let entry = BlacklistRepository::new(state.pool.clone())
        .create(&request, user.user_id)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_ENTRY))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateBlacklistEntry)
            .on_entity(entity::SENDER_BLACKLIST, entry.id)
            .with_details(format!("Blacklisted sender {}", entry.sender_name))
            .build(),
    );

    info!(entry_id = %entry.id, sender = %entry.sender_name, "Sender blacklisted");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PATCH /api/blacklist/:id
async fn update_entry(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateBlacklistEntryRequest>,
) -> Result<Json<SenderBlacklistEntry>, ApiError> {
    user.require(Permission::ManageBlacklist)?;
    request.validate()?;

    let entry = BlacklistRepository::new(state.pool.clone())
        .update(id, &request)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_ENTRY))?
        .ok_or_else(|| ApiError::NotFound("Blacklist entry not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateBlacklistEntry)
            .on_entity(entity::SENDER_BLACKLIST, entry.id)
            .build(),
    );
    Ok(Json(entry))
}

/// DELETE /api/blacklist/:id
async fn delete_entry(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageBlacklist)?;

    if !BlacklistRepository::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::NotFound("Blacklist entry not found".to_string()));
    }

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::DeleteBlacklistEntry)
            .on_entity(entity::SENDER_BLACKLIST, id)
            .warning()
            .build(),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Whether a sender is blocked for a provider on a date (default today).
///
/// GET /api/blacklist/check?senderName&providerId&date
async fn check_sender(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<CheckQuery>,
) -> Result<Json<CheckResponse>, ApiError> {
    user.require(Permission::ImportServices)?;
    if query.sender_name.trim().is_empty() {
        return Err(ApiError::validation("senderName is required"));
    }

    let on = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let active = BlacklistRepository::new(state.pool.clone())
        .active_on(on)
        .await?;
    let matching = matching_entries(active, &query.sender_name, query.provider_id, on);
    Ok(Json(CheckResponse {
        blocked: !matching.is_empty(),
        matching_entries: matching,
    }))
}
