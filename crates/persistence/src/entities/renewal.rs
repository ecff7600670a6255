//! Renewal entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{ContractRenewal, RenewalGates, RenewalListItem};
use domain::services::RenewalSnapshot;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the contract_renewals table.
#[derive(Debug, Clone, FromRow)]
pub struct RenewalEntity {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub humanitarian_org_id: Option<Uuid>,
    pub documents_received: bool,
    pub legal_approved: bool,
    pub financial_approved: bool,
    pub signature_received: bool,
    /// Projection of the gates; not read back.
    pub sub_status: String,
    pub progress_percentage: i16,
    pub proposed_start_date: Option<NaiveDate>,
    pub proposed_end_date: Option<NaiveDate>,
    pub proposed_revenue: Option<f64>,
    pub comments: Option<String>,
    pub internal_notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RenewalEntity {
    pub fn gates(&self) -> RenewalGates {
        RenewalGates {
            documents_received: self.documents_received,
            legal_approved: self.legal_approved,
            financial_approved: self.financial_approved,
            signature_received: self.signature_received,
        }
    }
}

impl From<RenewalEntity> for ContractRenewal {
    fn from(entity: RenewalEntity) -> Self {
        let gates = entity.gates();
        Self {
            id: entity.id,
            contract_id: entity.contract_id,
            humanitarian_org_id: entity.humanitarian_org_id,
            gates,
            sub_status: gates.sub_status(),
            progress_percentage: gates.progress(),
            proposed_start_date: entity.proposed_start_date,
            proposed_end_date: entity.proposed_end_date,
            proposed_revenue: entity.proposed_revenue,
            comments: entity.comments,
            internal_notes: entity.internal_notes,
            created_by_id: entity.created_by_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Renewal joined with its contract and organisation.
#[derive(Debug, Clone, FromRow)]
pub struct RenewalListEntity {
    #[sqlx(flatten)]
    pub renewal: RenewalEntity,
    pub contract_number: String,
    pub contract_name: String,
    pub contract_end_date: NaiveDate,
    pub organization_name: Option<String>,
}

impl From<RenewalListEntity> for RenewalListItem {
    fn from(entity: RenewalListEntity) -> Self {
        Self {
            renewal: entity.renewal.into(),
            contract_number: entity.contract_number,
            contract_name: entity.contract_name,
            contract_end_date: entity.contract_end_date,
            organization_name: entity.organization_name,
        }
    }
}

impl From<RenewalListEntity> for RenewalSnapshot {
    fn from(entity: RenewalListEntity) -> Self {
        Self {
            gates: entity.renewal.gates(),
            created_at: entity.renewal.created_at,
            organization_id: entity.renewal.humanitarian_org_id,
            organization_name: entity.organization_name,
            contract_end_date: entity.contract_end_date,
        }
    }
}

/// Lock row read by the delete guards.
#[derive(Debug, Clone, FromRow)]
pub struct RenewalLockEntity {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub contract_number: String,
    pub documents_received: bool,
    pub legal_approved: bool,
    pub financial_approved: bool,
    pub signature_received: bool,
}

impl RenewalLockEntity {
    pub fn is_final(&self) -> bool {
        RenewalGates {
            documents_received: self.documents_received,
            legal_approved: self.legal_approved,
            financial_approved: self.financial_approved,
            signature_received: self.signature_received,
        }
        .is_final()
    }
}
