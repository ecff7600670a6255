//! Contract renewals and their four-gate approval workflow.
//!
//! The stage of a renewal is never stored independently: it is derived from
//! the gate flags. The persisted `sub_status` column is a projection kept
//! for filtering.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::contract::{ContractStatus, ContractType};

text_enum! {
    /// Administrative stage of a renewal, in workflow order.
    pub enum RenewalSubStatus {
        DocumentCollection => "DOCUMENT_COLLECTION",
        LegalReview => "LEGAL_REVIEW",
        FinancialApproval => "FINANCIAL_APPROVAL",
        AwaitingSignature => "AWAITING_SIGNATURE",
        FinalProcessing => "FINAL_PROCESSING",
    }
}

impl RenewalSubStatus {
    /// Serbian label shown on dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            RenewalSubStatus::DocumentCollection => "Prikupljanje dokumenata",
            RenewalSubStatus::LegalReview => "Pravni pregled",
            RenewalSubStatus::FinancialApproval => "Finansijska potvrda",
            RenewalSubStatus::AwaitingSignature => "Čeka potpis",
            RenewalSubStatus::FinalProcessing => "Završno procesiranje",
        }
    }

    /// Position in the workflow, 0 for document collection.
    pub fn ordinal(&self) -> usize {
        match self {
            RenewalSubStatus::DocumentCollection => 0,
            RenewalSubStatus::LegalReview => 1,
            RenewalSubStatus::FinancialApproval => 2,
            RenewalSubStatus::AwaitingSignature => 3,
            RenewalSubStatus::FinalProcessing => 4,
        }
    }
}

/// The four approval gates of a renewal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalGates {
    pub documents_received: bool,
    pub legal_approved: bool,
    pub financial_approved: bool,
    pub signature_received: bool,
}

impl RenewalGates {
    fn as_array(&self) -> [bool; 4] {
        [
            self.documents_received,
            self.legal_approved,
            self.financial_approved,
            self.signature_received,
        ]
    }

    fn from_array(flags: [bool; 4]) -> Self {
        Self {
            documents_received: flags[0],
            legal_approved: flags[1],
            financial_approved: flags[2],
            signature_received: flags[3],
        }
    }

    /// Gates set so that [`RenewalGates::sub_status`] yields `stage`.
    pub fn for_stage(stage: RenewalSubStatus) -> Self {
        let cut = stage.ordinal();
        let mut flags = [false; 4];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = i < cut;
        }
        Self::from_array(flags)
    }

    pub fn completed_count(&self) -> usize {
        self.as_array().iter().filter(|g| **g).count()
    }

    /// Percentage of gates passed, rounded to the nearest integer.
    pub fn progress(&self) -> u8 {
        ((self.completed_count() as f64 / 4.0) * 100.0).round() as u8
    }

    /// Stage of the first unpassed gate, or final processing when all pass.
    pub fn sub_status(&self) -> RenewalSubStatus {
        match self.as_array().iter().position(|g| !g) {
            Some(0) => RenewalSubStatus::DocumentCollection,
            Some(1) => RenewalSubStatus::LegalReview,
            Some(2) => RenewalSubStatus::FinancialApproval,
            Some(_) => RenewalSubStatus::AwaitingSignature,
            None => RenewalSubStatus::FinalProcessing,
        }
    }

    pub fn is_final(&self) -> bool {
        self.sub_status() == RenewalSubStatus::FinalProcessing
    }
}

/// A stored renewal. Humanitarian renewals carry `humanitarian_org_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRenewal {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub humanitarian_org_id: Option<Uuid>,
    #[serde(flatten)]
    pub gates: RenewalGates,
    pub sub_status: RenewalSubStatus,
    pub progress_percentage: u8,
    pub proposed_start_date: Option<NaiveDate>,
    pub proposed_end_date: Option<NaiveDate>,
    pub proposed_revenue: Option<f64>,
    pub comments: Option<String>,
    pub internal_notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractRenewal {
    pub fn is_final(&self) -> bool {
        self.gates.is_final()
    }
}

/// A renewal listed together with its contract and organisation names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalListItem {
    #[serde(flatten)]
    pub renewal: ContractRenewal,
    pub contract_number: String,
    pub contract_name: String,
    pub contract_end_date: NaiveDate,
    pub organization_name: Option<String>,
}

fn validate_proposed_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(s), Some(e)) => shared::validation::validate_date_order(s, e, true),
        _ => Ok(()),
    }
}

/// Body of `POST /api/contracts/{id}/renewal`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_renewal"))]
pub struct CreateRenewalRequest {
    pub proposed_start_date: NaiveDate,
    pub proposed_end_date: NaiveDate,
    #[validate(range(min = 0.0, max = 100.0, message = "Proposed revenue must be between 0 and 100"))]
    pub proposed_revenue: Option<f64>,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

fn validate_create_renewal(req: &CreateRenewalRequest) -> Result<(), ValidationError> {
    validate_proposed_dates(Some(req.proposed_start_date), Some(req.proposed_end_date))
}

/// Body of `POST /api/humanitarian-renewals`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_humanitarian_renewal"))]
pub struct CreateHumanitarianRenewalRequest {
    pub contract_id: Uuid,
    pub humanitarian_org_id: Uuid,
    pub proposed_start_date: NaiveDate,
    pub proposed_end_date: NaiveDate,
    #[validate(range(min = 0.0, max = 100.0, message = "Proposed revenue must be between 0 and 100"))]
    pub proposed_revenue: Option<f64>,
    pub comments: Option<String>,
}

fn validate_create_humanitarian_renewal(
    req: &CreateHumanitarianRenewalRequest,
) -> Result<(), ValidationError> {
    validate_proposed_dates(Some(req.proposed_start_date), Some(req.proposed_end_date))
}

/// Partial update of a renewal. Stage is recomputed from the resulting gates.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_renewal"))]
pub struct UpdateRenewalRequest {
    pub documents_received: Option<bool>,
    pub legal_approved: Option<bool>,
    pub financial_approved: Option<bool>,
    pub signature_received: Option<bool>,
    pub proposed_start_date: Option<NaiveDate>,
    pub proposed_end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 100.0, message = "Proposed revenue must be between 0 and 100"))]
    pub proposed_revenue: Option<f64>,
    pub comments: Option<String>,
    pub internal_notes: Option<String>,
}

fn validate_update_renewal(req: &UpdateRenewalRequest) -> Result<(), ValidationError> {
    validate_proposed_dates(req.proposed_start_date, req.proposed_end_date)
}

impl UpdateRenewalRequest {
    /// Applies the gate part of the patch to `current`.
    pub fn apply_gates(&self, current: RenewalGates) -> RenewalGates {
        RenewalGates {
            documents_received: self.documents_received.unwrap_or(current.documents_received),
            legal_approved: self.legal_approved.unwrap_or(current.legal_approved),
            financial_approved: self.financial_approved.unwrap_or(current.financial_approved),
            signature_received: self.signature_received.unwrap_or(current.signature_received),
        }
    }

    pub fn touches_gates(&self) -> bool {
        self.documents_received.is_some()
            || self.legal_approved.is_some()
            || self.financial_approved.is_some()
            || self.signature_received.is_some()
    }
}

/// Moves a renewal to a target stage.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRenewalRequest {
    pub target_stage: RenewalSubStatus,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

impl AdvanceRenewalRequest {
    /// Internal notes after appending the stage change line.
    pub fn append_note(&self, existing: Option<&str>) -> String {
        let line = format!(
            "Status changed to {}: {}",
            self.target_stage.as_str(),
            self.comments.as_deref().unwrap_or("")
        );
        match existing {
            Some(prev) if !prev.trim().is_empty() => format!("{}\n{}", prev, line.trim_end()),
            _ => line.trim_end().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkDeleteRenewalsRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 ids are required"))]
    pub ids: Vec<Uuid>,
}

/// Filters for the humanitarian renewal list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanitarianRenewalQuery {
    pub humanitarian_org_id: Option<Uuid>,
    pub sub_status: Option<RenewalSubStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Latest renewal attached to an expiring contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestRenewalSummary {
    pub id: Uuid,
    pub sub_status: RenewalSubStatus,
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
}

/// A row returned by the expiry scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringContract {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: ContractType,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_until_expiry: i64,
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub latest_renewal: Option<LatestRenewalSummary>,
    pub created_by_name: Option<String>,
    pub created_by_email: Option<String>,
}

/// Count per stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: RenewalSubStatus,
    pub label: String,
    pub count: i64,
}

/// Renewals opened in a `YYYY-MM` month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

/// Organisation ranked by renewal count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCount {
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub count: i64,
}

/// Dashboard statistics for humanitarian renewals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenewalStatistics {
    pub total_renewals: i64,
    pub in_progress: i64,
    pub awaiting_signature: i64,
    pub completed: i64,
    pub expiring_contracts: i64,
    pub average_progress: i64,
    pub renewals_by_status: Vec<StatusCount>,
    pub monthly_renewals: Vec<MonthlyCount>,
    pub top_organizations: Vec<OrganizationCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gates(a: bool, b: bool, c: bool, d: bool) -> RenewalGates {
        RenewalGates {
            documents_received: a,
            legal_approved: b,
            financial_approved: c,
            signature_received: d,
        }
    }

    #[test]
    fn test_progress_is_quarter_steps() {
        assert_eq!(gates(false, false, false, false).progress(), 0);
        assert_eq!(gates(true, false, false, false).progress(), 25);
        assert_eq!(gates(true, true, false, false).progress(), 50);
        assert_eq!(gates(false, true, true, true).progress(), 75);
        assert_eq!(gates(true, true, true, true).progress(), 100);
    }

    #[test]
    fn test_sub_status_is_first_unpassed_gate() {
        assert_eq!(
            gates(false, true, true, true).sub_status(),
            RenewalSubStatus::DocumentCollection
        );
        assert_eq!(
            gates(true, false, true, false).sub_status(),
            RenewalSubStatus::LegalReview
        );
        assert_eq!(
            gates(true, true, false, true).sub_status(),
            RenewalSubStatus::FinancialApproval
        );
        assert_eq!(
            gates(true, true, true, false).sub_status(),
            RenewalSubStatus::AwaitingSignature
        );
        assert_eq!(
            gates(true, true, true, true).sub_status(),
            RenewalSubStatus::FinalProcessing
        );
    }

    #[test]
    fn test_sub_status_total_over_all_flag_states() {
        for bits in 0u8..16 {
            let g = gates(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            assert!(g.progress() <= 100);
            assert_eq!(g.is_final(), bits == 15);
        }
    }

    #[test]
    fn test_for_stage_round_trips() {
        for stage in RenewalSubStatus::ALL {
            assert_eq!(RenewalGates::for_stage(*stage).sub_status(), *stage);
        }
        assert_eq!(
            RenewalGates::for_stage(RenewalSubStatus::FinancialApproval),
            gates(true, true, false, false)
        );
    }

    #[test]
    fn test_apply_gate_patch() {
        let patch = UpdateRenewalRequest {
            legal_approved: Some(true),
            ..Default::default()
        };
        let updated = patch.apply_gates(gates(true, false, false, false));
        assert_eq!(updated, gates(true, true, false, false));
        assert!(patch.touches_gates());
        assert!(!UpdateRenewalRequest::default().touches_gates());
    }

    #[test]
    fn test_renewal_dates_must_be_ordered() {
        let req = CreateRenewalRequest {
            proposed_start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            proposed_end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            proposed_revenue: None,
            comments: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_append_note() {
        let req = AdvanceRenewalRequest {
            target_stage: RenewalSubStatus::LegalReview,
            comments: Some("dokumenta kompletna".into()),
        };
        assert_eq!(
            req.append_note(None),
            "Status changed to LEGAL_REVIEW: dokumenta kompletna"
        );
        assert_eq!(
            req.append_note(Some("prva napomena")),
            "prva napomena\nStatus changed to LEGAL_REVIEW: dokumenta kompletna"
        );
    }

    #[test]
    fn test_labels_are_serbian() {
        assert_eq!(RenewalSubStatus::AwaitingSignature.label(), "Čeka potpis");
        assert_eq!(
            RenewalSubStatus::FinalProcessing.label(),
            "Završno procesiranje"
        );
    }
}
