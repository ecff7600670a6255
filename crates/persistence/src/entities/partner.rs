//! Partner and service catalogue entities.

use chrono::{DateTime, Utc};
use domain::models::{HumanitarianOrg, ParkingService, Provider, Service, ServiceType};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ProviderEntity {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderEntity> for Provider {
    fn from(e: ProviderEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            contact_name: e.contact_name,
            email: e.email,
            phone: e.phone,
            address: e.address,
            is_active: e.is_active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HumanitarianOrgEntity {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub pib: Option<String>,
    pub registration_number: Option<String>,
    pub bank_account: Option<String>,
    pub short_number: Option<String>,
    pub mission: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<HumanitarianOrgEntity> for HumanitarianOrg {
    fn from(e: HumanitarianOrgEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            contact_person: e.contact_person,
            email: e.email,
            phone: e.phone,
            address: e.address,
            website: e.website,
            pib: e.pib,
            registration_number: e.registration_number,
            bank_account: e.bank_account,
            short_number: e.short_number,
            mission: e.mission,
            is_active: e.is_active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Parking service row, including metadata of the last imported report.
#[derive(Debug, Clone, FromRow)]
pub struct ParkingServiceEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub service_number: Option<String>,
    pub is_active: bool,
    pub original_file_name: Option<String>,
    pub original_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub last_import_date: Option<DateTime<Utc>>,
    pub import_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingServiceEntity> for ParkingService {
    fn from(e: ParkingServiceEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            contact_name: e.contact_name,
            email: e.email,
            phone: e.phone,
            address: e.address,
            service_number: e.service_number,
            is_active: e.is_active,
            original_file_name: e.original_file_name,
            original_file_path: e.original_file_path,
            file_size: e.file_size,
            mime_type: e.mime_type,
            last_import_date: e.last_import_date,
            import_status: e.import_status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceEntity {
    pub id: Uuid,
    pub name: String,
    pub service_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ServiceEntity> for Service {
    fn from(e: ServiceEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            service_type: e.service_type.parse().unwrap_or(ServiceType::Vas),
            description: e.description,
            is_active: e.is_active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// `(name, id)` pair used to build import lookups.
#[derive(Debug, Clone, FromRow)]
pub struct NameIdEntity {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_entity_type() {
        let entity = ServiceEntity {
            id: Uuid::new_v4(),
            name: "4455".into(),
            service_type: "PARKING".into(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let service: Service = entity.into();
        assert_eq!(service.service_type, ServiceType::Parking);
    }
}
