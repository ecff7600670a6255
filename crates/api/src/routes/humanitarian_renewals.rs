//! Humanitarian organisation renewal handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use domain::models::{
    BulkDeleteRenewalsRequest, ContractRenewal, ContractType, CreateHumanitarianRenewalRequest,
    HumanitarianRenewalQuery, Permission, RenewalListItem, RenewalStatistics,
    UpdateRenewalRequest,
};
use domain::services::{activity_helpers, compute_statistics, NotificationEvent};
use domain::DomainError;
use persistence::repositories::{
    ActivityLogRepository, BulkRenewalDeletion, ContractRepository, CreatedRenewal,
    HumanitarianOrgRepository, NewRenewal, RenewalChange, RenewalRepository, RenewalScope,
};
use serde::Serialize;
use shared::pagination::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};
use crate::routes::contracts::{after_renewal_change, remove_renewal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_renewals).post(create_renewal))
        .route("/statistics", get(statistics))
        .route("/bulk-delete", post(bulk_delete))
        .route("/:id", patch(update_renewal).delete(delete_renewal))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted: u64,
    pub contract_numbers: Vec<String>,
}

/// List humanitarian renewals.
///
/// GET /api/humanitarian-renewals
async fn list_renewals(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<HumanitarianRenewalQuery>,
) -> Result<Json<Paginated<RenewalListItem>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = RenewalRepository::new(state.pool.clone())
        .list_humanitarian(&query, page)
        .await?;
    Ok(Json(Paginated::new(items, page, total)))
}

/// Open a renewal for a humanitarian contract.
///
/// POST /api/humanitarian-renewals
async fn create_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateHumanitarianRenewalRequest>,
) -> Result<(StatusCode, Json<ContractRenewal>), ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let contract = ContractRepository::new(state.pool.clone())
        .find_by_id(request.contract_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contract not found".to_string()))?;
    if contract.contract_type != ContractType::Humanitarian {
        return Err(ApiError::validation("Contract is not a humanitarian contract"));
    }
    if contract.humanitarian_org_id != Some(request.humanitarian_org_id) {
        return Err(ApiError::validation(
            "Humanitarian organization does not match the contract",
        ));
    }
    HumanitarianOrgRepository::new(state.pool.clone())
        .find_by_id(request.humanitarian_org_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Humanitarian organization not found".to_string()))?;

    let CreatedRenewal {
        renewal,
        contract_number,
    } = RenewalRepository::new(state.pool.clone())
        .create(NewRenewal {
            contract_id: request.contract_id,
            humanitarian_org_id: Some(request.humanitarian_org_id),
            proposed_start_date: request.proposed_start_date,
            proposed_end_date: request.proposed_end_date,
            proposed_revenue: request.proposed_revenue,
            comments: request.comments,
            created_by: user.user_id,
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Contract not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(activity_helpers::renewal_created(
        user.user_id,
        renewal.id,
        &contract_number,
        true,
    ));
    state.notifier.notify(NotificationEvent::renewal_status_changed(
        renewal.contract_id,
        &contract_number,
        renewal.sub_status.label(),
    ));

    info!(renewal_id = %renewal.id, contract_number = %contract_number, "Humanitarian renewal opened");
    Ok((StatusCode::CREATED, Json(renewal)))
}

/// Patch a humanitarian renewal.
///
/// PATCH /api/humanitarian-renewals/:id
async fn update_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateRenewalRequest>,
) -> Result<Json<ContractRenewal>, ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let update = RenewalRepository::new(state.pool.clone())
        .apply_change(id, RenewalScope::Humanitarian, RenewalChange::Patch(&request))
        .await?
        .ok_or_else(|| ApiError::NotFound("Renewal not found".to_string()))?;
    Ok(Json(after_renewal_change(&state, &user, update)))
}

/// Delete a humanitarian renewal.
///
/// DELETE /api/humanitarian-renewals/:id
async fn delete_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::DeleteRenewals)?;
    remove_renewal(&state, &user, id, RenewalScope::Humanitarian).await
}

/// Delete several humanitarian renewals at once. Nothing is deleted when any
/// of them is in final processing; ids of other renewals are ignored.
///
/// POST /api/humanitarian-renewals/bulk-delete
async fn bulk_delete(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<BulkDeleteRenewalsRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    user.require(Permission::DeleteRenewals)?;
    request.validate()?;

    match RenewalRepository::new(state.pool.clone())
        .bulk_delete(&request.ids, RenewalScope::Humanitarian)
        .await?
    {
        BulkRenewalDeletion::Deleted {
            count,
            contract_numbers,
            contracts_restored,
        } => {
            ActivityLogRepository::new(state.pool.clone()).record(
                activity_helpers::renewals_bulk_deleted(user.user_id, &contract_numbers),
            );
            info!(count, contracts_restored, "Humanitarian renewals deleted");
            Ok(Json(BulkDeleteResponse {
                deleted: count,
                contract_numbers,
            }))
        }
        BulkRenewalDeletion::Locked { contract_numbers } => {
            Err(DomainError::RenewalLocked { contract_numbers }.into())
        }
    }
}

/// Dashboard figures for humanitarian renewals.
///
/// GET /api/humanitarian-renewals/statistics
async fn statistics(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<RenewalStatistics>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let snapshots = RenewalRepository::new(state.pool.clone())
        .humanitarian_snapshots()
        .await?;
    Ok(Json(compute_statistics(&snapshots, Utc::now())))
}
