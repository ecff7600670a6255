//! Contract endpoint handlers, including contract renewals and the expiry
//! scanner.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use csv::{QuoteStyle, WriterBuilder};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, AdvanceRenewalRequest, Contract, ContractExportQuery, ContractQuery,
    ContractRenewal, ContractStatus, CreateContractRequest, CreateRenewalRequest,
    ExpiringContract, ExpiryStatistics, ExpiryTimelineMonth, ExpiryTimelineQuery, Permission,
    UpdateContractRequest, UpdateContractStatusRequest, UpdateRenewalRequest,
};
use domain::services::expiry::STATISTICS_HORIZON_DAYS;
use domain::services::{
    activity_helpers, build_expiry_timeline, compute_expiry_statistics, timeline_range,
    ActivityLogBuilder, ExpiryWindow, NotificationEvent,
};
use domain::DomainError;
use persistence::repositories::{
    ActivityLogRepository, ContractRepository, CreatedRenewal, NewRenewal, RenewalChange,
    RenewalDeletion, RenewalRepository, RenewalScope, RenewalUpdate,
};
use serde::Deserialize;
use shared::pagination::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const EXPORT_HEADERS: [&str; 10] = [
    "Broj ugovora",
    "Naziv",
    "Organizacija",
    "Tip ugovora",
    "Status",
    "Datum početka",
    "Datum kraja",
    "Procenat prihoda",
    "Opis",
    "Dana do isteka",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/export", get(export_contracts))
        .route("/expiring", get(expiring_contracts))
        .route("/statistics/expiry", get(expiry_statistics))
        .route("/timeline/expiry", get(expiry_timeline))
        .route("/:id", get(get_contract).patch(update_contract))
        .route("/:id/status", patch(update_contract_status))
        .route("/:id/renewals", post(create_renewal))
        .route("/:id/renewals/latest", get(latest_renewal))
}

/// Item routes for a single contract renewal, mounted under `/api/renewals`.
pub fn renewals_router() -> Router<AppState> {
    Router::new()
        .route("/:id", patch(update_renewal).delete(delete_renewal))
        .route("/:id/advance", post(advance_renewal))
}

fn contract_not_found() -> ApiError {
    ApiError::NotFound("Contract not found".to_string())
}

fn renewal_not_found() -> ApiError {
    ApiError::NotFound("Renewal not found".to_string())
}

/// List contracts.
///
/// GET /api/contracts
async fn list_contracts(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ContractQuery>,
) -> Result<Json<Paginated<Contract>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let page = PageRequest::new(query.page, query.limit);
    let (contracts, total) = ContractRepository::new(state.pool.clone())
        .list(&query, page)
        .await?;
    Ok(Json(Paginated::new(contracts, page, total)))
}

/// Get a contract.
///
/// GET /api/contracts/:id
async fn get_contract(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let contract = ContractRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(contract_not_found)?;
    Ok(Json(contract))
}

/// Create a contract.
///
/// POST /api/contracts
async fn create_contract(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateContractRequest>,
) -> Result<(StatusCode, Json<Contract>), ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let contract = ContractRepository::new(state.pool.clone())
        .create(&request, user.user_id)
        .await
        .map_err(ApiError::on_unique("Contract number already exists"))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateContract)
            .on_entity(entity::CONTRACT, contract.id)
            .with_details(format!("Created contract {}", contract.contract_number))
            .build(),
    );

    info!(
        contract_id = %contract.id,
        contract_number = %contract.contract_number,
        "Contract created"
    );

    Ok((StatusCode::CREATED, Json(contract)))
}

/// Update a contract.
///
/// PATCH /api/contracts/:id
async fn update_contract(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateContractRequest>,
) -> Result<Json<Contract>, ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let repo = ContractRepository::new(state.pool.clone());
    let existing = repo.find_by_id(id).await?.ok_or_else(contract_not_found)?;

    let start = request.start_date.unwrap_or(existing.start_date);
    let end = request.end_date.unwrap_or(existing.end_date);
    if end < start {
        return Err(ApiError::validation("End date must not be before start date"));
    }
    let sharing = request.is_revenue_sharing.unwrap_or(existing.is_revenue_sharing);
    if sharing && request.operator_revenue.or(existing.operator_revenue).is_none() {
        return Err(ApiError::validation(
            "Operator revenue is required for revenue sharing contracts",
        ));
    }

    let contract = repo.update(id, &request).await?.ok_or_else(contract_not_found)?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateContract)
            .on_entity(entity::CONTRACT, contract.id)
            .with_details(format!("Updated contract {}", contract.contract_number))
            .build(),
    );

    Ok(Json(contract))
}

/// Change a contract's status.
///
/// PATCH /api/contracts/:id/status
async fn update_contract_status(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateContractStatusRequest>,
) -> Result<Json<Contract>, ApiError> {
    user.require(Permission::ManageContracts)?;

    let contract = ContractRepository::new(state.pool.clone())
        .update_status(id, request.status)
        .await?
        .ok_or_else(contract_not_found)?;

    let mut details = format!(
        "Contract {} status set to {}",
        contract.contract_number, request.status
    );
    if let Some(reason) = request.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        details.push_str(": ");
        details.push_str(reason.trim());
    }
    let builder = ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateContractStatus)
        .on_entity(entity::CONTRACT, contract.id)
        .with_details(details);
    let builder = if request.status == ContractStatus::Terminated {
        builder.warning()
    } else {
        builder
    };
    ActivityLogRepository::new(state.pool.clone()).record(builder.build());

    info!(contract_id = %contract.id, status = %request.status, "Contract status changed");
    Ok(Json(contract))
}

#[derive(Debug, Deserialize)]
struct ExpiringQuery {
    days: Option<i64>,
}

/// Contracts that need attention: expiring soon, recently expired, or in renewal.
///
/// GET /api/contracts/expiring?days=60
async fn expiring_contracts(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> Result<Json<Vec<ExpiringContract>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let window = ExpiryWindow::new(Utc::now().date_naive(), query.days)?;
    let contracts = ContractRepository::new(state.pool.clone())
        .find_expiring(&window)
        .await?;
    Ok(Json(contracts))
}

/// Counts of contracts ending within the next 60 days, and of those
/// already past their end date.
///
/// GET /api/contracts/statistics/expiry
async fn expiry_statistics(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<ExpiryStatistics>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let today = Utc::now().date_naive();
    let rows = ContractRepository::new(state.pool.clone())
        .ending_by(today + Duration::days(STATISTICS_HORIZON_DAYS))
        .await?;
    Ok(Json(compute_expiry_statistics(&rows, today)))
}

/// Contracts grouped by the month they end in.
///
/// GET /api/contracts/timeline/expiry?monthsAhead=12&includeExpired=false
async fn expiry_timeline(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ExpiryTimelineQuery>,
) -> Result<Json<Vec<ExpiryTimelineMonth>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let (first, last) = timeline_range(&query, Utc::now().date_naive())?;
    let rows = ContractRepository::new(state.pool.clone())
        .ending_between(first, last)
        .await?;
    Ok(Json(build_expiry_timeline(&rows)))
}

/// Export contracts as CSV.
///
/// GET /api/contracts/export
async fn export_contracts(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<ContractExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::ManageContracts)?;
    if matches!(query.expiring_within, Some(days) if days < 0) {
        return Err(ApiError::validation("expiringWithin must not be negative"));
    }

    let today = Utc::now().date_naive();
    let contracts = ContractRepository::new(state.pool.clone())
        .list_for_export(&query, today)
        .await?;
    let body = contracts_csv(&contracts, today)
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::ExportContracts)
            .on_entity_type(entity::CONTRACT)
            .with_details(format!("Exported {} contracts", contracts.len()))
            .build(),
    );

    let disposition = format!(
        "attachment; filename=\"ugovori-{}.csv\"",
        today.format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Renders contracts as a BOM-prefixed CSV with every field quoted.
pub fn contracts_csv(contracts: &[Contract], today: NaiveDate) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(EXPORT_HEADERS)?;

    for contract in contracts {
        let organization = contract
            .partner
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        writer.write_record([
            contract.contract_number.clone(),
            contract.name.clone(),
            organization,
            contract.contract_type.label().to_string(),
            contract.status.label().to_string(),
            contract.start_date.format("%d.%m.%Y").to_string(),
            contract.end_date.format("%d.%m.%Y").to_string(),
            format!("{}%", contract.revenue_percentage),
            contract.description.clone().unwrap_or_default(),
            contract.days_until_expiry(today).to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Open a renewal for a contract.
///
/// POST /api/contracts/:id/renewals
async fn create_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(contract_id): Path<Uuid>,
    ApiJson(request): ApiJson<CreateRenewalRequest>,
) -> Result<(StatusCode, Json<ContractRenewal>), ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let CreatedRenewal {
        renewal,
        contract_number,
    } = RenewalRepository::new(state.pool.clone())
        .create(NewRenewal {
            contract_id,
            humanitarian_org_id: None,
            proposed_start_date: request.proposed_start_date,
            proposed_end_date: request.proposed_end_date,
            proposed_revenue: request.proposed_revenue,
            comments: request.comments,
            created_by: user.user_id,
        })
        .await?
        .ok_or_else(contract_not_found)?;

    ActivityLogRepository::new(state.pool.clone()).record(activity_helpers::renewal_created(
        user.user_id,
        renewal.id,
        &contract_number,
        false,
    ));
    state.notifier.notify(NotificationEvent::renewal_status_changed(
        contract_id,
        &contract_number,
        renewal.sub_status.label(),
    ));

    info!(renewal_id = %renewal.id, contract_id = %contract_id, "Renewal opened");
    Ok((StatusCode::CREATED, Json(renewal)))
}

/// Most recent renewal of a contract.
///
/// GET /api/contracts/:id/renewals/latest
async fn latest_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractRenewal>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let renewal = RenewalRepository::new(state.pool.clone())
        .find_latest_for_contract(contract_id)
        .await?
        .ok_or_else(renewal_not_found)?;
    Ok(Json(renewal))
}

/// Patch renewal gates and proposed terms.
///
/// PATCH /api/renewals/:id
async fn update_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateRenewalRequest>,
) -> Result<Json<ContractRenewal>, ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let update = RenewalRepository::new(state.pool.clone())
        .apply_change(id, RenewalScope::Contract, RenewalChange::Patch(&request))
        .await?
        .ok_or_else(renewal_not_found)?;
    Ok(Json(after_renewal_change(&state, &user, update)))
}

/// Move a renewal to a stage.
///
/// POST /api/renewals/:id/advance
async fn advance_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<AdvanceRenewalRequest>,
) -> Result<Json<ContractRenewal>, ApiError> {
    user.require(Permission::ManageContracts)?;
    request.validate()?;

    let update = RenewalRepository::new(state.pool.clone())
        .apply_change(id, RenewalScope::Contract, RenewalChange::Advance(&request))
        .await?
        .ok_or_else(renewal_not_found)?;
    Ok(Json(after_renewal_change(&state, &user, update)))
}

/// Logs the change and notifies the back office when the stage moved.
pub(crate) fn after_renewal_change(
    state: &AppState,
    user: &UserAuth,
    update: RenewalUpdate,
) -> ContractRenewal {
    let humanitarian = update.renewal.humanitarian_org_id.is_some();
    ActivityLogRepository::new(state.pool.clone()).record(activity_helpers::renewal_updated(
        user.user_id,
        update.renewal.id,
        update.renewal.sub_status,
        humanitarian,
    ));

    if update.stage_changed() {
        state.notifier.notify(NotificationEvent::renewal_status_changed(
            update.renewal.contract_id,
            &update.contract_number,
            update.renewal.sub_status.label(),
        ));
    }
    if update.contract_activated {
        info!(
            contract_id = %update.renewal.contract_id,
            contract_number = %update.contract_number,
            "Renewal completed, contract activated"
        );
    }
    update.renewal
}

/// Delete a renewal that has not reached final processing.
///
/// DELETE /api/renewals/:id
async fn delete_renewal(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::DeleteRenewals)?;
    remove_renewal(&state, &user, id, RenewalScope::Contract).await
}

pub(crate) async fn remove_renewal(
    state: &AppState,
    user: &UserAuth,
    id: Uuid,
    scope: RenewalScope,
) -> Result<StatusCode, ApiError> {
    match RenewalRepository::new(state.pool.clone())
        .delete(id, scope)
        .await?
    {
        RenewalDeletion::Deleted {
            contract_number,
            humanitarian,
            contract_restored,
            ..
        } => {
            ActivityLogRepository::new(state.pool.clone()).record(
                activity_helpers::renewal_deleted(user.user_id, id, &contract_number, humanitarian),
            );
            info!(
                renewal_id = %id,
                contract_number = %contract_number,
                contract_restored,
                "Renewal deleted"
            );
            Ok(StatusCode::NO_CONTENT)
        }
        RenewalDeletion::NotFound => Err(renewal_not_found()),
        RenewalDeletion::Locked { contract_number } => Err(DomainError::RenewalLocked {
            contract_numbers: vec![contract_number],
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ContractType, PartnerRef};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract() -> Contract {
        Contract {
            id: Uuid::new_v4(),
            contract_number: "UG-2025-014".into(),
            name: "Humanitarni SMS \"Pomoć\"".into(),
            contract_type: ContractType::Humanitarian,
            status: ContractStatus::Active,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 3, 31),
            revenue_percentage: 10.0,
            is_revenue_sharing: false,
            operator_revenue: None,
            description: None,
            provider_id: None,
            humanitarian_org_id: Some(Uuid::new_v4()),
            parking_service_id: None,
            partner: Some(PartnerRef {
                id: Uuid::new_v4(),
                name: "Crveni krst".into(),
            }),
            created_by_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_csv_has_bom_and_serbian_headers() {
        let bytes = contracts_csv(&[], date(2025, 3, 1)).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("\"Broj ugovora\",\"Naziv\",\"Organizacija\""));
        assert!(text.trim_end().ends_with("\"Dana do isteka\""));
    }

    #[test]
    fn test_csv_row_uses_labels_and_quotes_everything() {
        let bytes = contracts_csv(&[contract()], date(2025, 3, 1)).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"UG-2025-014\",\"Humanitarni SMS \"\"Pomoć\"\"\",\"Crveni krst\",\"Humanitarna pomoć\",\
             \"Aktivan\",\"01.01.2025\",\"31.03.2025\",\"10%\",\"\",\"30\""
        );
    }

    #[test]
    fn test_csv_negative_days_for_expired() {
        let mut expired = contract();
        expired.status = ContractStatus::Expired;
        let bytes = contracts_csv(&[expired], date(2025, 4, 10)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"Istekao\""));
        assert!(text.trim_end().ends_with("\"-10\""));
    }
}
