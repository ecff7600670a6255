//! In-app notification handlers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, CreateNotificationRequest, MarkReadRequest, Notification,
    NotificationPreferences, NotificationQuery, Permission, UserRole,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{
    ActivityLogRepository, NewNotification, NotificationRepository, UserRepository,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/push",
            get(list_notifications)
                .post(send_notification)
                .patch(mark_read),
        )
        .route("/read-all", patch(mark_all_read))
        .route("/preferences", get(get_preferences).put(update_preferences))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// The caller's notifications, newest first. ADMIN may read another
/// user's list with `userId`.
///
/// GET /api/notifications/push
async fn list_notifications(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let target = match query.user_id {
        Some(id) if id != user.user_id => {
            if user.role != UserRole::Admin {
                return Err(ApiError::forbidden());
            }
            id
        }
        _ => user.user_id,
    };

    let repo = NotificationRepository::new(state.pool.clone());
    let notifications = repo.list_for_user(target, &query).await?;
    let unread_count = repo.unread_count(target).await?;
    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

/// Send a notification to one user.
///
/// POST /api/notifications/push
async fn send_notification(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    user.require(Permission::SendSystemNotification)?;
    request.validate()?;

    UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let notification = NotificationRepository::new(state.pool.clone())
        .create_for_users(
            &[request.user_id],
            &NewNotification {
                kind: request.notification_type,
                title: &request.title,
                message: &request.message,
                entity_type: request.entity_type.as_deref(),
                entity_id: request.entity_id,
            },
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("Notification was not stored".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::SendNotification)
            .on_entity(entity::NOTIFICATION, notification.id)
            .with_details(format!("Sent \"{}\" to {}", notification.title, request.user_id))
            .build(),
    );

    info!(notification_id = %notification.id, recipient = %request.user_id, "Notification sent");
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Mark notifications read. Only the owner's rows change, unless the caller
/// is ADMIN.
///
/// PATCH /api/notifications/push
async fn mark_read(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    request.validate()?;

    let owner = (user.role != UserRole::Admin).then_some(user.user_id);
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_read(&request.ids, owner)
        .await?;
    Ok(Json(MarkReadResponse { updated }))
}

/// PATCH /api/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_all_read(user.user_id)
        .await?;
    Ok(Json(MarkReadResponse { updated }))
}

/// GET /api/notifications/preferences
async fn get_preferences(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let stored = UserRepository::new(state.pool.clone())
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(stored.notification_preferences))
}

/// Replace the caller's delivery preferences.
///
/// PUT /api/notifications/preferences
async fn update_preferences(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(preferences): ApiJson<NotificationPreferences>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let stored = UserRepository::new(state.pool.clone())
        .update_preferences(user.user_id, &preferences)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(stored.notification_preferences))
}
