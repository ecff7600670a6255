//! Activity log handlers.

use axum::{extract::State, routing::get, Json, Router};
use domain::models::{ActivityLog, ActivityLogQuery, Permission};
use persistence::repositories::ActivityLogRepository;
use shared::pagination::{PageRequest, Paginated};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiQuery, UserAuth};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_activity_logs))
}

/// List activity entries, newest first.
///
/// GET /api/activity-logs?action&entityType&entityId&userId&severity&from&to
async fn list_activity_logs(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ActivityLogQuery>,
) -> Result<Json<Paginated<ActivityLog>>, ApiError> {
    user.require(Permission::ViewActivityLogs)?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::validation("from must not be after to"));
        }
    }

    let page = PageRequest::new(query.page, query.limit);
    let (entries, total) = ActivityLogRepository::new(state.pool.clone())
        .list(&query, page)
        .await?;
    Ok(Json(Paginated::new(entries, page, total)))
}
