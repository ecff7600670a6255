//! Customer complaints, their comments and status history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::user::UserRole;

text_enum! {
    pub enum ComplaintStatus {
        New => "NEW",
        Assigned => "ASSIGNED",
        InProgress => "IN_PROGRESS",
        Pending => "PENDING",
        Resolved => "RESOLVED",
        Closed => "CLOSED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    /// Output format of the complaint export.
    pub enum ComplaintExportFormat {
        Csv => "CSV",
        Json => "JSON",
        Xlsx => "XLSX",
    }
}

impl ComplaintExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ComplaintExportFormat::Csv => "csv",
            ComplaintExportFormat::Json => "json",
            ComplaintExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ComplaintExportFormat::Csv => "text/csv; charset=utf-8",
            ComplaintExportFormat::Json => "application/json",
            ComplaintExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// A stored complaint with resolved display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub priority: i16,
    pub financial_impact: Option<f64>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub provider_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub submitter_id: Uuid,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub assigned_agent_id: Option<Uuid>,
    pub assigned_agent_name: Option<String>,
    pub assigned_agent_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Complaint {
    /// Whether `role`/`user_id` may edit the complaint's fields.
    pub fn editable_by(&self, user_id: Uuid, role: UserRole) -> bool {
        role.is_back_office() || (self.submitter_id == user_id && self.status == ComplaintStatus::New)
    }

    /// Whether the caller may move the complaint to `target`.
    pub fn status_changeable_by(
        &self,
        user_id: Uuid,
        role: UserRole,
        target: ComplaintStatus,
    ) -> bool {
        match role {
            UserRole::Admin | UserRole::Manager => true,
            UserRole::Agent => {
                self.assigned_agent_id == Some(user_id) || target == ComplaintStatus::Assigned
            }
            UserRole::User => false,
        }
    }
}

/// Milestone timestamps to set when a complaint enters `status`.
///
/// Each milestone is only set the first time; existing values are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusMilestones {
    pub set_assigned_at: bool,
    pub set_resolved_at: bool,
    pub set_closed_at: bool,
}

impl StatusMilestones {
    pub fn for_transition(complaint: &Complaint, status: ComplaintStatus) -> Self {
        Self {
            set_assigned_at: status == ComplaintStatus::Assigned && complaint.assigned_at.is_none(),
            set_resolved_at: status == ComplaintStatus::Resolved && complaint.resolved_at.is_none(),
            set_closed_at: status == ComplaintStatus::Closed && complaint.closed_at.is_none(),
        }
    }
}

/// Append-only status history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatusHistory {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub previous_status: Option<ComplaintStatus>,
    pub new_status: ComplaintStatus,
    pub changed_by_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintComment {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub text: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

fn validate_financial_impact(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("financial_impact");
        err.message = Some("Financial impact must be a non-negative amount".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    #[validate(length(min = 5, max = 100, message = "Title must be between 5 and 100 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters long"))]
    pub description: String,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: i16,
    pub service_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    #[validate(custom(function = "validate_financial_impact"))]
    pub financial_impact: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaintRequest {
    #[validate(length(min = 5, max = 100, message = "Title must be between 5 and 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters long"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i16>,
    pub service_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    #[validate(custom(function = "validate_financial_impact"))]
    pub financial_impact: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeComplaintStatusRequest {
    pub status: ComplaintStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignComplaintRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment cannot be empty"))]
    pub text: String,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintQuery {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<i16>,
    pub provider_id: Option<Uuid>,
    pub assigned_agent_id: Option<Uuid>,
    pub submitter_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Filters of `GET /api/complaints/export`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintExportQuery {
    pub format: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ComplaintStatus>,
    pub service_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

impl ComplaintExportQuery {
    /// Requested format; xlsx when omitted.
    pub fn resolved_format(&self) -> Result<ComplaintExportFormat, String> {
        match self.format.as_deref() {
            None => Ok(ComplaintExportFormat::Xlsx),
            Some(f) => f.parse(),
        }
    }
}

text_enum! {
    /// Look-back window of the complaint statistics.
    pub enum StatisticsPeriod {
        Day => "DAY",
        Week => "WEEK",
        Month => "MONTH",
        Year => "YEAR",
        All => "ALL",
    }
}

/// Query of `GET /api/complaints/statistics`.
///
/// Explicit dates take precedence over `period`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatisticsQuery {
    pub period: Option<String>,
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
}

/// The columns of a complaint the statistics read.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintSnapshot {
    pub status: ComplaintStatus,
    pub priority: i16,
    pub financial_impact: Option<f64>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub provider_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatusCount {
    pub status: ComplaintStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCount {
    pub priority: i16,
    pub count: i64,
}

/// Count per service or provider; `id` is empty for complaints without one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamedCount {
    pub id: Option<Uuid>,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialImpactSummary {
    pub total: f64,
    pub average: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Complaint dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatistics {
    pub total_complaints: i64,
    pub by_status: Vec<ComplaintStatusCount>,
    pub by_priority: Vec<PriorityCount>,
    pub by_service: Vec<NamedCount>,
    pub by_provider: Vec<NamedCount>,
    /// Mean hours from creation to resolution.
    pub avg_resolution_time: f64,
    pub financial_impact: FinancialImpactSummary,
    pub trend_data: Vec<DailyCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    fn complaint(status: ComplaintStatus) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Uuid::new_v4(),
            title: "Naplata bez usluge".into(),
            description: Sentence(5..8).fake(),
            status,
            priority: 3,
            financial_impact: None,
            service_id: None,
            service_name: None,
            product_id: None,
            product_name: None,
            provider_id: None,
            provider_name: None,
            submitter_id: Uuid::new_v4(),
            submitter_name: None,
            submitter_email: None,
            assigned_agent_id: None,
            assigned_agent_name: None,
            assigned_agent_email: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            resolved_at: None,
            closed_at: None,
        }
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateComplaintRequest {
            title: "Kratko".into(),
            description: "Opis problema sa SMS uslugom".into(),
            priority: 3,
            service_id: None,
            product_id: None,
            provider_id: None,
            financial_impact: Some(120.0),
        };
        assert!(req.validate().is_ok());

        let mut bad = req.clone();
        bad.title = "abc".into();
        bad.priority = 6;
        bad.description = "kratko".into();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("priority"));
        assert!(fields.contains_key("description"));
    }

    #[test]
    fn test_negative_financial_impact_rejected() {
        let req = UpdateComplaintRequest {
            financial_impact: Some(-5.0),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_submitter_edits_only_while_new() {
        let mut c = complaint(ComplaintStatus::New);
        let submitter = c.submitter_id;
        assert!(c.editable_by(submitter, UserRole::User));
        c.status = ComplaintStatus::InProgress;
        assert!(!c.editable_by(submitter, UserRole::User));
        assert!(c.editable_by(Uuid::new_v4(), UserRole::Manager));
    }

    #[test]
    fn test_agent_status_rules() {
        let mut c = complaint(ComplaintStatus::New);
        let agent = Uuid::new_v4();
        assert!(c.status_changeable_by(agent, UserRole::Agent, ComplaintStatus::Assigned));
        assert!(!c.status_changeable_by(agent, UserRole::Agent, ComplaintStatus::Resolved));
        c.assigned_agent_id = Some(agent);
        assert!(c.status_changeable_by(agent, UserRole::Agent, ComplaintStatus::Resolved));
        assert!(!c.status_changeable_by(agent, UserRole::User, ComplaintStatus::Closed));
    }

    #[test]
    fn test_milestones_set_once() {
        let mut c = complaint(ComplaintStatus::InProgress);
        let m = StatusMilestones::for_transition(&c, ComplaintStatus::Resolved);
        assert!(m.set_resolved_at);
        assert!(!m.set_closed_at);
        c.resolved_at = Some(Utc::now());
        let m = StatusMilestones::for_transition(&c, ComplaintStatus::Resolved);
        assert!(!m.set_resolved_at);
    }

    #[test]
    fn test_export_format_default_and_parse() {
        let mut q = ComplaintExportQuery::default();
        assert_eq!(q.resolved_format().unwrap(), ComplaintExportFormat::Xlsx);
        q.format = Some("csv".into());
        assert_eq!(q.resolved_format().unwrap(), ComplaintExportFormat::Csv);
        q.format = Some("pdf".into());
        assert!(q.resolved_format().is_err());
    }
}
