//! Activity logging helpers for route handlers.
//!
//! Entries are built here and handed to the repository, which inserts them
//! in the background so a failed write never fails the request.

use crate::models::activity_log::entity;
use crate::models::{ActivityAction, CreateActivityLogInput, LogSeverity};
use uuid::Uuid;

/// Fluent builder for [`CreateActivityLogInput`].
#[derive(Debug, Clone)]
pub struct ActivityLogBuilder {
    action: ActivityAction,
    entity_type: String,
    entity_id: Option<Uuid>,
    details: Option<String>,
    severity: LogSeverity,
    user_id: Option<Uuid>,
}

impl ActivityLogBuilder {
    /// Entry for an action taken by a user.
    pub fn user_action(user_id: Uuid, action: ActivityAction) -> Self {
        Self {
            action,
            entity_type: String::new(),
            entity_id: None,
            details: None,
            severity: LogSeverity::Info,
            user_id: Some(user_id),
        }
    }

    /// Entry for an action taken by a background job.
    pub fn system_action(action: ActivityAction) -> Self {
        Self {
            action,
            entity_type: String::new(),
            entity_id: None,
            details: None,
            severity: LogSeverity::Info,
            user_id: None,
        }
    }

    /// Sets the entity the action applies to.
    pub fn on_entity(mut self, entity_type: impl Into<String>, entity_id: Uuid) -> Self {
        self.entity_type = entity_type.into();
        self.entity_id = Some(entity_id);
        self
    }

    /// Set just the entity type (bulk operations, exports).
    pub fn on_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }

    /// Sets the human-readable details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: LogSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Shorthand for [`LogSeverity::Warning`].
    pub fn warning(self) -> Self {
        self.with_severity(LogSeverity::Warning)
    }

    /// Finishes the entry.
    pub fn build(self) -> CreateActivityLogInput {
        CreateActivityLogInput {
            action: self.action.as_str().to_string(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            details: self.details,
            severity: self.severity,
            user_id: self.user_id,
        }
    }
}

/// Shortcuts for the entries written most often.
pub mod activity_helpers {
    use super::*;
    use crate::models::{ComplaintStatus, RenewalSubStatus};

    /// Entry for an opened renewal.
    pub fn renewal_created(
        user_id: Uuid,
        renewal_id: Uuid,
        contract_number: &str,
        humanitarian: bool,
    ) -> CreateActivityLogInput {
        let (action, entity_type) = if humanitarian {
            (ActivityAction::CreateHumanitarianRenewal, entity::HUMANITARIAN_RENEWAL)
        } else {
            (ActivityAction::CreateContractRenewal, entity::CONTRACT_RENEWAL)
        };
        ActivityLogBuilder::user_action(user_id, action)
            .on_entity(entity_type, renewal_id)
            .with_details(format!("Renewal opened for contract {}", contract_number))
            .build()
    }

    /// Entry for a renewal patch or stage change.
    pub fn renewal_updated(
        user_id: Uuid,
        renewal_id: Uuid,
        stage: RenewalSubStatus,
        humanitarian: bool,
    ) -> CreateActivityLogInput {
        let (action, entity_type) = if humanitarian {
            (ActivityAction::UpdateHumanitarianRenewal, entity::HUMANITARIAN_RENEWAL)
        } else {
            (ActivityAction::UpdateContractRenewal, entity::CONTRACT_RENEWAL)
        };
        ActivityLogBuilder::user_action(user_id, action)
            .on_entity(entity_type, renewal_id)
            .with_details(format!("Renewal stage: {}", stage.label()))
            .build()
    }

    /// Warning entry for a deleted renewal.
    pub fn renewal_deleted(
        user_id: Uuid,
        renewal_id: Uuid,
        contract_number: &str,
        humanitarian: bool,
    ) -> CreateActivityLogInput {
        let (action, entity_type) = if humanitarian {
            (ActivityAction::DeleteHumanitarianRenewal, entity::HUMANITARIAN_RENEWAL)
        } else {
            (ActivityAction::DeleteContractRenewal, entity::CONTRACT_RENEWAL)
        };
        ActivityLogBuilder::user_action(user_id, action)
            .on_entity(entity_type, renewal_id)
            .with_details(format!("Deleted renewal for contract {}", contract_number))
            .warning()
            .build()
    }

    /// Warning entry listing the contracts whose renewals were bulk deleted.
    pub fn renewals_bulk_deleted(user_id: Uuid, contract_numbers: &[String]) -> CreateActivityLogInput {
        ActivityLogBuilder::user_action(user_id, ActivityAction::BulkDeleteHumanitarianRenewals)
            .on_entity_type(entity::HUMANITARIAN_RENEWAL)
            .with_details(format!(
                "Deleted {} renewals: {}",
                contract_numbers.len(),
                contract_numbers.join(", ")
            ))
            .warning()
            .build()
    }

    /// Entry for a complaint status transition.
    pub fn complaint_status_changed(
        user_id: Uuid,
        complaint_id: Uuid,
        from: ComplaintStatus,
        to: ComplaintStatus,
    ) -> CreateActivityLogInput {
        let builder = ActivityLogBuilder::user_action(user_id, ActivityAction::ComplaintStatusChanged)
            .on_entity(entity::COMPLAINT, complaint_id)
            .with_details(format!("Status changed from {} to {}", from, to));
        if to == ComplaintStatus::Rejected {
            builder.warning().build()
        } else {
            builder.build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplaintStatus, RenewalSubStatus};

    #[test]
    fn test_builder_defaults_to_info() {
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let input = ActivityLogBuilder::user_action(user, ActivityAction::CreateContract)
            .on_entity(entity::CONTRACT, id)
            .build();
        assert_eq!(input.action, "CREATE_CONTRACT");
        assert_eq!(input.entity_type, "contract");
        assert_eq!(input.entity_id, Some(id));
        assert_eq!(input.user_id, Some(user));
        assert_eq!(input.severity, LogSeverity::Info);
    }

    #[test]
    fn test_system_action_has_no_user() {
        let input = ActivityLogBuilder::system_action(ActivityAction::ImportParkingServices)
            .on_entity_type(entity::PARKING_SERVICE)
            .build();
        assert!(input.user_id.is_none());
        assert!(input.entity_id.is_none());
    }

    #[test]
    fn test_delete_entries_are_warnings() {
        let input = activity_helpers::renewal_deleted(Uuid::new_v4(), Uuid::new_v4(), "UG-9", true);
        assert_eq!(input.action, "DELETE_HUMANITARIAN_RENEWAL");
        assert_eq!(input.severity, LogSeverity::Warning);

        let bulk = activity_helpers::renewals_bulk_deleted(
            Uuid::new_v4(),
            &["UG-1".to_string(), "UG-2".to_string()],
        );
        assert_eq!(bulk.details.as_deref(), Some("Deleted 2 renewals: UG-1, UG-2"));
    }

    #[test]
    fn test_rejected_complaint_logged_as_warning() {
        let id = Uuid::new_v4();
        let rejected = activity_helpers::complaint_status_changed(
            Uuid::new_v4(),
            id,
            ComplaintStatus::New,
            ComplaintStatus::Rejected,
        );
        assert_eq!(rejected.severity, LogSeverity::Warning);

        let resolved = activity_helpers::complaint_status_changed(
            Uuid::new_v4(),
            id,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
        );
        assert_eq!(resolved.severity, LogSeverity::Info);
        assert_eq!(
            resolved.details.as_deref(),
            Some("Status changed from IN_PROGRESS to RESOLVED")
        );
    }

    #[test]
    fn test_renewal_update_uses_label() {
        let input = activity_helpers::renewal_updated(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RenewalSubStatus::LegalReview,
            false,
        );
        assert_eq!(input.action, "UPDATE_CONTRACT_RENEWAL");
        assert_eq!(input.details.as_deref(), Some("Renewal stage: Pravni pregled"));
    }
}
