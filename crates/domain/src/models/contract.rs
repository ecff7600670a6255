//! Commercial contracts with partners.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

text_enum! {
    /// Kind of partner a contract is signed with.
    pub enum ContractType {
        Provider => "PROVIDER",
        Humanitarian => "HUMANITARIAN",
        Parking => "PARKING",
        Bulk => "BULK",
    }
}

text_enum! {
    /// Contract lifecycle state.
    pub enum ContractStatus {
        Draft => "DRAFT",
        Pending => "PENDING",
        Active => "ACTIVE",
        Expired => "EXPIRED",
        RenewalInProgress => "RENEWAL_IN_PROGRESS",
        Terminated => "TERMINATED",
    }
}

impl ContractType {
    /// Serbian label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::Humanitarian => "Humanitarna pomoć",
            ContractType::Provider => "Pružalac usluga",
            ContractType::Parking => "Parking servis",
            ContractType::Bulk => "Bulk servis",
        }
    }
}

impl ContractStatus {
    /// Serbian label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            ContractStatus::Active => "Aktivan",
            ContractStatus::Expired => "Istekao",
            ContractStatus::Pending => "Na čekanju",
            ContractStatus::RenewalInProgress => "Obnova u toku",
            ContractStatus::Terminated => "Prekinut",
            ContractStatus::Draft => "Nacrt",
        }
    }
}

/// Partner reference resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRef {
    pub id: Uuid,
    pub name: String,
}

/// A stored contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: ContractType,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue_percentage: f64,
    pub is_revenue_sharing: bool,
    pub operator_revenue: Option<f64>,
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    pub humanitarian_org_id: Option<Uuid>,
    pub parking_service_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<PartnerRef>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Whole days from `today` until the end date (negative once past).
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }
}

fn default_revenue_percentage() -> f64 {
    10.0
}

/// Request payload for creating a contract.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_contract", skip_on_field_errors = false))]
pub struct CreateContractRequest {
    #[validate(length(min = 1, max = 50, message = "Contract number is required"))]
    pub contract_number: String,
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,
    pub contract_type: ContractType,
    #[serde(default)]
    pub status: Option<ContractStatus>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_revenue_percentage")]
    #[validate(range(min = 0.0, max = 100.0, message = "Revenue percentage must be between 0 and 100"))]
    pub revenue_percentage: f64,
    #[serde(default)]
    pub is_revenue_sharing: bool,
    #[validate(range(min = 0.0, max = 100.0, message = "Operator revenue must be between 0 and 100"))]
    pub operator_revenue: Option<f64>,
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    pub humanitarian_org_id: Option<Uuid>,
    pub parking_service_id: Option<Uuid>,
}

fn validate_create_contract(req: &CreateContractRequest) -> Result<(), ValidationError> {
    shared::validation::validate_date_order(req.start_date, req.end_date, false)?;
    if req.is_revenue_sharing && req.operator_revenue.is_none() {
        let mut err = ValidationError::new("operator_revenue_required");
        err.message = Some("Operator revenue is required for revenue sharing contracts".into());
        return Err(err);
    }
    validate_partner_link(
        req.contract_type,
        req.provider_id,
        req.humanitarian_org_id,
        req.parking_service_id,
    )
}

/// Checks that exactly the partner id matching the contract type is set.
pub fn validate_partner_link(
    contract_type: ContractType,
    provider_id: Option<Uuid>,
    humanitarian_org_id: Option<Uuid>,
    parking_service_id: Option<Uuid>,
) -> Result<(), ValidationError> {
    let (expected, others_empty) = match contract_type {
        ContractType::Provider | ContractType::Bulk => (
            provider_id.is_some(),
            humanitarian_org_id.is_none() && parking_service_id.is_none(),
        ),
        ContractType::Humanitarian => (
            humanitarian_org_id.is_some(),
            provider_id.is_none() && parking_service_id.is_none(),
        ),
        ContractType::Parking => (
            parking_service_id.is_some(),
            provider_id.is_none() && humanitarian_org_id.is_none(),
        ),
    };

    if expected && others_empty {
        Ok(())
    } else {
        let mut err = ValidationError::new("partner_link");
        err.message = Some(
            format!(
                "A {} contract must reference exactly one {}",
                contract_type.as_str().to_lowercase(),
                match contract_type {
                    ContractType::Provider | ContractType::Bulk => "provider",
                    ContractType::Humanitarian => "humanitarian organization",
                    ContractType::Parking => "parking service",
                }
            )
            .into(),
        );
        Err(err)
    }
}

/// Partial update of a contract. Partner links are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 100.0, message = "Revenue percentage must be between 0 and 100"))]
    pub revenue_percentage: Option<f64>,
    pub is_revenue_sharing: Option<bool>,
    #[validate(range(min = 0.0, max = 100.0, message = "Operator revenue must be between 0 and 100"))]
    pub operator_revenue: Option<f64>,
    pub description: Option<String>,
}

/// Manual status change (e.g. termination).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractStatusRequest {
    pub status: ContractStatus,
    pub reason: Option<String>,
}

/// List filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQuery {
    pub status: Option<ContractStatus>,
    #[serde(rename = "type")]
    pub contract_type: Option<ContractType>,
    pub provider_id: Option<Uuid>,
    pub humanitarian_org_id: Option<Uuid>,
    pub parking_service_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Filters for the CSV export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractExportQuery {
    pub status: Option<ContractStatus>,
    #[serde(rename = "type")]
    pub contract_type: Option<ContractType>,
    pub search: Option<String>,
    pub expiring_within: Option<i64>,
    #[serde(default)]
    pub include_expired: bool,
}

/// A contract near its end date, as read by the expiry dashboards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryCandidate {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: ContractType,
    pub status: ContractStatus,
    pub end_date: NaiveDate,
    pub partner_name: Option<String>,
    pub has_renewal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractTypeCount {
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub count: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenewalCoverage {
    pub with_renewal: i64,
    pub without_renewal: i64,
}

/// Payload of `GET /api/contracts/statistics/expiry`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryStatistics {
    pub total_expiring: i64,
    pub expired_count: i64,
    pub expiring_in_30_days: i64,
    pub expiring_in_60_days: i64,
    pub average_days_to_expiry: i64,
    pub contracts_by_type: Vec<ContractTypeCount>,
    pub renewal_stats: RenewalCoverage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryTimelineQuery {
    pub months_ahead: Option<u32>,
    #[serde(default)]
    pub include_expired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineContract {
    pub id: Uuid,
    pub contract_number: String,
    pub organization_name: String,
    pub contract_type: ContractType,
    pub end_date: NaiveDate,
    pub status: ContractStatus,
    pub has_renewal: bool,
}

/// Contracts ending in one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryTimelineMonth {
    /// `MMM YYYY`, e.g. `Mar 2025`.
    pub month: String,
    pub date: NaiveDate,
    pub provider: i64,
    pub humanitarian: i64,
    pub parking: i64,
    pub bulk: i64,
    pub total: i64,
    pub contracts: Vec<TimelineContract>,
}
