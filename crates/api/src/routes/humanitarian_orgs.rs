//! Humanitarian organisation endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, CreateHumanitarianOrgRequest, HumanitarianOrg, PartnerQuery, Permission,
    UpdateHumanitarianOrgRequest,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, HumanitarianOrgRepository};
use shared::pagination::{PageRequest, Paginated};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

const DUPLICATE_NAME: &str = "A humanitarian organization with this name already exists";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orgs).post(create_org))
        .route("/:id", get(get_org).patch(update_org))
}

/// GET /api/humanitarian-orgs
async fn list_orgs(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<PartnerQuery>,
) -> Result<Json<Paginated<HumanitarianOrg>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let page = PageRequest::new(query.page, query.limit);
    let (orgs, total) = HumanitarianOrgRepository::new(state.pool.clone())
        .list(&query, page)
        .await?;
    Ok(Json(Paginated::new(orgs, page, total)))
}

/// GET /api/humanitarian-orgs/:id
async fn get_org(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<HumanitarianOrg>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let org = HumanitarianOrgRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Humanitarian organization not found".to_string()))?;
    Ok(Json(org))
}

/// POST /api/humanitarian-orgs
async fn create_org(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateHumanitarianOrgRequest>,
) -> Result<(StatusCode, Json<HumanitarianOrg>), ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let org = HumanitarianOrgRepository::new(state.pool.clone())
        .create(&request)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_NAME))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateHumanitarianOrg)
            .on_entity(entity::HUMANITARIAN_ORG, org.id)
            .with_details(format!("Created humanitarian organization {}", org.name))
            .build(),
    );
    Ok((StatusCode::CREATED, Json(org)))
}

/// PATCH /api/humanitarian-orgs/:id
async fn update_org(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateHumanitarianOrgRequest>,
) -> Result<Json<HumanitarianOrg>, ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let org = HumanitarianOrgRepository::new(state.pool.clone())
        .update(id, &request)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_NAME))?
        .ok_or_else(|| ApiError::NotFound("Humanitarian organization not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateHumanitarianOrg)
            .on_entity(entity::HUMANITARIAN_ORG, org.id)
            .build(),
    );
    Ok(Json(org))
}
