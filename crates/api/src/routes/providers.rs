//! Provider endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, CreateProviderRequest, PartnerQuery, Permission, Provider,
    UpdateProviderRequest,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, ProviderRepository};
use shared::pagination::Paginated;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_providers).post(create_provider))
        .route("/:id", get(get_provider).patch(update_provider))
}

/// List providers. Pages are cached per query for a short time.
///
/// GET /api/providers
async fn list_providers(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<PartnerQuery>,
) -> Result<Json<Paginated<Provider>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let repo = ProviderRepository::new(state.pool.clone());
    let page = state.provider_cache.list(&repo, query).await?;
    Ok(Json(page.as_ref().clone()))
}

/// Get a provider.
///
/// GET /api/providers/:id
async fn get_provider(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Provider>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let provider = ProviderRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Provider not found".to_string()))?;
    Ok(Json(provider))
}

/// Create a provider. Names are unique regardless of case.
///
/// POST /api/providers
async fn create_provider(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateProviderRequest>,
) -> Result<(StatusCode, Json<Provider>), ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let provider = ProviderRepository::new(state.pool.clone())
        .create(&request)
        .await
        .map_err(ApiError::on_unique("A provider with this name already exists"))?;
    state.provider_cache.invalidate();

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateProvider)
            .on_entity(entity::PROVIDER, provider.id)
            .with_details(format!("Created provider {}", provider.name))
            .build(),
    );

    info!(provider_id = %provider.id, name = %provider.name, "Provider created");
    Ok((StatusCode::CREATED, Json(provider)))
}

/// Update a provider.
///
/// PATCH /api/providers/:id
async fn update_provider(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateProviderRequest>,
) -> Result<Json<Provider>, ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let provider = ProviderRepository::new(state.pool.clone())
        .update(id, &request)
        .await
        .map_err(ApiError::on_unique("A provider with this name already exists"))?
        .ok_or_else(|| ApiError::NotFound("Provider not found".to_string()))?;
    state.provider_cache.invalidate();

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateProvider)
            .on_entity(entity::PROVIDER, provider.id)
            .build(),
    );
    Ok(Json(provider))
}
