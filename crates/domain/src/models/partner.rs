//! Partner entities: providers, humanitarian organisations, parking services.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    /// Catalogue service category.
    pub enum ServiceType {
        Vas => "VAS",
        Bulk => "BULK",
        Humanitarian => "HUMANITARIAN",
        Parking => "PARKING",
    }
}

/// Catalogue entry billed through a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// VAS / bulk messaging provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
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

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProviderRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// Humanitarian organisation collecting donations over SMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanitarianOrg {
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

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHumanitarianOrgRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,
    #[validate(length(equal = 9, message = "PIB must have 9 digits"))]
    pub pib: Option<String>,
    pub registration_number: Option<String>,
    pub bank_account: Option<String>,
    pub short_number: Option<String>,
    pub mission: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHumanitarianOrgRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,
    #[validate(length(equal = 9, message = "PIB must have 9 digits"))]
    pub pib: Option<String>,
    pub registration_number: Option<String>,
    pub bank_account: Option<String>,
    pub short_number: Option<String>,
    pub mission: Option<String>,
    pub is_active: Option<bool>,
}

/// Parking operator billed through SMS/micropayments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingService {
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

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParkingServiceRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub service_number: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParkingServiceRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub service_number: Option<String>,
    pub is_active: Option<bool>,
}

/// One imported parking transaction row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingTransaction {
    pub parking_service_id: Uuid,
    pub service_id: Option<Uuid>,
    pub date: NaiveDate,
    pub group: String,
    pub service_name: String,
    pub price: f64,
    pub quantity: f64,
    pub amount: f64,
}

/// Shared list filters for partner lists.
#[derive(Debug, Clone, Default, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerQuery {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PartnerQuery {
    /// `ORDER BY` column, restricted to a known set.
    pub fn sort_column(&self) -> &'static str {
        match self.sort_by.as_deref() {
            Some("createdAt") | Some("created_at") => "created_at",
            Some("updatedAt") | Some("updated_at") => "updated_at",
            _ => "name",
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        match self.sort_order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("desc") => "DESC",
            _ => "ASC",
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::company::en::CompanyName;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    #[test]
    fn test_create_provider_request_valid() {
        let req = CreateProviderRequest {
            name: CompanyName().fake(),
            contact_name: None,
            email: Some(SafeEmail().fake()),
            phone: None,
            address: None,
            is_active: true,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_provider_invalid_email() {
        let req = UpdateProviderRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_org_pib_length() {
        let req = UpdateHumanitarianOrgRequest {
            pib: Some("1234".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_sort_column_whitelist() {
        let mut q = PartnerQuery::default();
        assert_eq!(q.sort_column(), "name");
        q.sort_by = Some("createdAt".into());
        assert_eq!(q.sort_column(), "created_at");
        q.sort_by = Some("name; DROP TABLE".into());
        assert_eq!(q.sort_column(), "name");
        q.sort_order = Some("DESC".into());
        assert_eq!(q.sort_direction(), "DESC");
    }

    #[test]
    fn test_is_active_defaults_true() {
        let req: CreateParkingServiceRequest =
            serde_json::from_value(serde_json::json!({ "name": "Parking Servis Niš" })).unwrap();
        assert!(req.is_active);
    }
}
