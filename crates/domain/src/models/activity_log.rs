//! Append-only activity trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum LogSeverity {
        Info => "INFO",
        Warning => "WARNING",
        Error => "ERROR",
    }
}

text_enum! {
    /// Action codes written to the activity trail.
    pub enum ActivityAction {
        CreateContract => "CREATE_CONTRACT",
        UpdateContract => "UPDATE_CONTRACT",
        UpdateContractStatus => "UPDATE_CONTRACT_STATUS",
        ExportContracts => "EXPORT_CONTRACTS",
        CreateContractRenewal => "CREATE_CONTRACT_RENEWAL",
        UpdateContractRenewal => "UPDATE_CONTRACT_RENEWAL",
        DeleteContractRenewal => "DELETE_CONTRACT_RENEWAL",
        CreateHumanitarianRenewal => "CREATE_HUMANITARIAN_RENEWAL",
        UpdateHumanitarianRenewal => "UPDATE_HUMANITARIAN_RENEWAL",
        DeleteHumanitarianRenewal => "DELETE_HUMANITARIAN_RENEWAL",
        BulkDeleteHumanitarianRenewals => "BULK_DELETE_HUMANITARIAN_RENEWALS",
        CreateComplaint => "CREATE_COMPLAINT",
        UpdateComplaint => "UPDATE_COMPLAINT",
        ComplaintStatusChanged => "COMPLAINT_STATUS_CHANGED",
        AssignComplaint => "ASSIGN_COMPLAINT",
        AddComplaintComment => "ADD_COMPLAINT_COMMENT",
        ExportComplaints => "EXPORT_COMPLAINTS",
        CreateProvider => "CREATE_PROVIDER",
        UpdateProvider => "UPDATE_PROVIDER",
        CreateHumanitarianOrg => "CREATE_HUMANITARIAN_ORG",
        UpdateHumanitarianOrg => "UPDATE_HUMANITARIAN_ORG",
        CreateParkingService => "CREATE_PARKING_SERVICE",
        UpdateParkingService => "UPDATE_PARKING_SERVICE",
        ImportVasServices => "IMPORT_VAS_SERVICES",
        ImportBulkServices => "IMPORT_BULK_SERVICES",
        ImportParkingServices => "IMPORT_PARKING_SERVICES",
        CreateBlacklistEntry => "CREATE_BLACKLIST_ENTRY",
        UpdateBlacklistEntry => "UPDATE_BLACKLIST_ENTRY",
        DeleteBlacklistEntry => "DELETE_BLACKLIST_ENTRY",
        SendNotification => "SEND_NOTIFICATION",
        ScheduleReport => "SCHEDULE_REPORT",
        UpdateScheduledReport => "UPDATE_SCHEDULED_REPORT",
        DeleteScheduledReport => "DELETE_SCHEDULED_REPORT",
    }
}

/// Entity types referenced by activity entries.
pub mod entity {
    pub const CONTRACT: &str = "contract";
    pub const CONTRACT_RENEWAL: &str = "contract_renewal";
    pub const HUMANITARIAN_RENEWAL: &str = "humanitarian_renewal";
    pub const COMPLAINT: &str = "complaint";
    pub const PROVIDER: &str = "provider";
    pub const HUMANITARIAN_ORG: &str = "humanitarian_org";
    pub const PARKING_SERVICE: &str = "parking_service";
    pub const SENDER_BLACKLIST: &str = "sender_blacklist";
    pub const VAS_SERVICE: &str = "vas_service";
    pub const BULK_SERVICE: &str = "bulk_service";
    pub const NOTIFICATION: &str = "notification";
    pub const REPORT: &str = "report";
}

/// A stored activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<String>,
    pub severity: LogSeverity,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Values needed to append an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateActivityLogInput {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<String>,
    pub severity: LogSeverity,
    pub user_id: Option<Uuid>,
}

/// Filters of `GET /api/activity-logs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub severity: Option<LogSeverity>,
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
