//! Contract entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{
    Contract, ContractStatus, ContractType, ExpiringContract, ExpiryCandidate,
    LatestRenewalSummary, PartnerRef, RenewalSubStatus,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of `contracts` joined with the name of whichever partner it links.
#[derive(Debug, Clone, FromRow)]
pub struct ContractEntity {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue_percentage: f64,
    pub is_revenue_sharing: bool,
    pub operator_revenue: Option<f64>,
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    pub humanitarian_org_id: Option<Uuid>,
    pub parking_service_id: Option<Uuid>,
    /// `COALESCE` of the provider, organisation and parking service names.
    pub partner_name: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractEntity {
    fn partner_id(&self) -> Option<Uuid> {
        self.provider_id
            .or(self.humanitarian_org_id)
            .or(self.parking_service_id)
    }
}

impl From<ContractEntity> for Contract {
    fn from(entity: ContractEntity) -> Self {
        let partner = match (entity.partner_id(), entity.partner_name.clone()) {
            (Some(id), Some(name)) => Some(PartnerRef { id, name }),
            _ => None,
        };
        Self {
            id: entity.id,
            contract_number: entity.contract_number,
            name: entity.name,
            contract_type: entity.contract_type.parse().unwrap_or(ContractType::Provider),
            status: entity.status.parse().unwrap_or(ContractStatus::Draft),
            start_date: entity.start_date,
            end_date: entity.end_date,
            revenue_percentage: entity.revenue_percentage,
            is_revenue_sharing: entity.is_revenue_sharing,
            operator_revenue: entity.operator_revenue,
            description: entity.description,
            provider_id: entity.provider_id,
            humanitarian_org_id: entity.humanitarian_org_id,
            parking_service_id: entity.parking_service_id,
            partner,
            created_by_id: entity.created_by_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Row returned by the expiry scan: contract, partner, creator and the
/// latest renewal (via `LEFT JOIN LATERAL`).
#[derive(Debug, Clone, FromRow)]
pub struct ExpiringContractEntity {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub created_by_name: Option<String>,
    pub created_by_email: Option<String>,
    pub renewal_id: Option<Uuid>,
    pub renewal_sub_status: Option<String>,
    pub renewal_progress: Option<i16>,
    pub renewal_created_at: Option<DateTime<Utc>>,
}

impl ExpiringContractEntity {
    pub fn into_domain(self, today: NaiveDate) -> ExpiringContract {
        let latest_renewal = match (self.renewal_id, self.renewal_created_at) {
            (Some(id), Some(created_at)) => Some(LatestRenewalSummary {
                id,
                sub_status: self
                    .renewal_sub_status
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(RenewalSubStatus::DocumentCollection),
                progress_percentage: self.renewal_progress.unwrap_or(0).clamp(0, 100) as u8,
                created_at,
            }),
            _ => None,
        };
        ExpiringContract {
            id: self.id,
            contract_number: self.contract_number,
            name: self.name,
            contract_type: self.contract_type.parse().unwrap_or(ContractType::Provider),
            status: self.status.parse().unwrap_or(ContractStatus::Active),
            start_date: self.start_date,
            end_date: self.end_date,
            days_until_expiry: (self.end_date - today).num_days(),
            partner_id: self.partner_id,
            partner_name: self.partner_name,
            latest_renewal,
            created_by_name: self.created_by_name,
            created_by_email: self.created_by_email,
        }
    }
}

/// Contract row read by the expiry statistics and timeline.
#[derive(Debug, Clone, FromRow)]
pub struct ExpiryCandidateEntity {
    pub id: Uuid,
    pub contract_number: String,
    pub name: String,
    pub contract_type: String,
    pub status: String,
    pub end_date: NaiveDate,
    pub partner_name: Option<String>,
    pub has_renewal: bool,
}

impl From<ExpiryCandidateEntity> for ExpiryCandidate {
    fn from(e: ExpiryCandidateEntity) -> Self {
        Self {
            id: e.id,
            contract_number: e.contract_number,
            name: e.name,
            contract_type: e.contract_type.parse().unwrap_or(ContractType::Provider),
            status: e.status.parse().unwrap_or(ContractStatus::Active),
            end_date: e.end_date,
            partner_name: e.partner_name,
            has_renewal: e.has_renewal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_contract_entity_resolves_partner() {
        let org = Uuid::new_v4();
        let entity = ContractEntity {
            id: Uuid::new_v4(),
            contract_number: "HUM-2025-07".into(),
            name: "Humanitarni broj 3030".into(),
            contract_type: "HUMANITARIAN".into(),
            status: "ACTIVE".into(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 12, 31),
            revenue_percentage: 0.0,
            is_revenue_sharing: false,
            operator_revenue: None,
            description: None,
            provider_id: None,
            humanitarian_org_id: Some(org),
            parking_service_id: None,
            partner_name: Some("Crveni krst".into()),
            created_by_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let contract: Contract = entity.into();
        assert_eq!(contract.contract_type, ContractType::Humanitarian);
        assert_eq!(
            contract.partner,
            Some(PartnerRef {
                id: org,
                name: "Crveni krst".into()
            })
        );
    }

    #[test]
    fn test_expiring_entity_without_renewal() {
        let entity = ExpiringContractEntity {
            id: Uuid::new_v4(),
            contract_number: "PRV-1".into(),
            name: "VAS".into(),
            contract_type: "PROVIDER".into(),
            status: "ACTIVE".into(),
            start_date: date(2024, 7, 1),
            end_date: date(2025, 7, 1),
            partner_id: None,
            partner_name: None,
            created_by_name: None,
            created_by_email: None,
            renewal_id: None,
            renewal_sub_status: None,
            renewal_progress: None,
            renewal_created_at: None,
        };
        let row = entity.into_domain(date(2025, 6, 21));
        assert_eq!(row.days_until_expiry, 10);
        assert!(row.latest_renewal.is_none());
    }
}
