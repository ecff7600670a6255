//! Users, roles and permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notification::NotificationPreferences;

text_enum! {
    /// Role assigned to a user by the identity provider.
    pub enum UserRole {
        Admin => "ADMIN",
        Manager => "MANAGER",
        Agent => "AGENT",
        User => "USER",
    }
}

/// Capabilities checked at every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewContracts,
    ManageContracts,
    DeleteRenewals,
    ViewFinancialAnalytics,
    ImportServices,
    ManagePartners,
    ManageBlacklist,
    ExportComplaints,
    ChangeComplaintStatus,
    SendSystemNotification,
    ViewActivityLogs,
    ViewComplaintStatistics,
    ManageReports,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewContracts => "view_contracts",
            Permission::ManageContracts => "manage_contracts",
            Permission::DeleteRenewals => "delete_renewals",
            Permission::ViewFinancialAnalytics => "view_financial_analytics",
            Permission::ImportServices => "import_services",
            Permission::ManagePartners => "manage_partners",
            Permission::ManageBlacklist => "manage_blacklist",
            Permission::ExportComplaints => "export_complaints",
            Permission::ChangeComplaintStatus => "change_complaint_status",
            Permission::SendSystemNotification => "send_system_notification",
            Permission::ViewActivityLogs => "view_activity_logs",
            Permission::ViewComplaintStatistics => "view_complaint_statistics",
            Permission::ManageReports => "manage_reports",
        }
    }
}

impl UserRole {
    /// Whether this role grants the permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            UserRole::Admin => true,
            UserRole::Manager => !matches!(permission, ViewActivityLogs),
            UserRole::Agent => matches!(permission, ViewContracts | ChangeComplaintStatus),
            UserRole::User => matches!(permission, ViewContracts),
        }
    }

    /// Whether the role may act on behalf of the back office (ADMIN or MANAGER).
    pub fn is_back_office(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

/// A stored user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub notification_preferences: NotificationPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl Actor {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_round_trip_codes() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::from_str(role.as_str()).unwrap(), *role);
        }
        assert_eq!(UserRole::from_str("manager").unwrap(), UserRole::Manager);
        assert!(UserRole::from_str("OWNER").is_err());
    }

    #[test]
    fn test_financial_view_limited_to_back_office() {
        assert!(UserRole::Admin.has_permission(Permission::ViewFinancialAnalytics));
        assert!(UserRole::Manager.has_permission(Permission::ViewFinancialAnalytics));
        assert!(!UserRole::Agent.has_permission(Permission::ViewFinancialAnalytics));
        assert!(!UserRole::User.has_permission(Permission::ViewFinancialAnalytics));
    }

    #[test]
    fn test_agent_permissions() {
        assert!(UserRole::Agent.has_permission(Permission::ChangeComplaintStatus));
        assert!(!UserRole::Agent.has_permission(Permission::DeleteRenewals));
        assert!(!UserRole::Agent.has_permission(Permission::ImportServices));
    }

    #[test]
    fn test_statistics_and_reports_for_back_office() {
        for permission in [Permission::ViewComplaintStatistics, Permission::ManageReports] {
            assert!(UserRole::Admin.has_permission(permission));
            assert!(UserRole::Manager.has_permission(permission));
            assert!(!UserRole::Agent.has_permission(permission));
            assert!(!UserRole::User.has_permission(permission));
        }
    }

    #[test]
    fn test_activity_logs_admin_only() {
        assert!(UserRole::Admin.has_permission(Permission::ViewActivityLogs));
        assert!(!UserRole::Manager.has_permission(Permission::ViewActivityLogs));
    }

    #[test]
    fn test_every_role_views_contracts() {
        for role in UserRole::ALL {
            assert!(role.has_permission(Permission::ViewContracts));
        }
    }

    #[test]
    fn test_role_serializes_as_code() {
        let json = serde_json::to_string(&UserRole::Agent).unwrap();
        assert_eq!(json, "\"AGENT\"");
    }
}
