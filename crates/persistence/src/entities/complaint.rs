//! Complaint entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{
    Complaint, ComplaintComment, ComplaintSnapshot, ComplaintStatus, ComplaintStatusHistory,
    DailyCount,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Complaint row with service, product, provider and user names joined in.
#[derive(Debug, Clone, FromRow)]
pub struct ComplaintEntity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
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

impl From<ComplaintEntity> for Complaint {
    fn from(e: ComplaintEntity) -> Self {
        Self {
            id: e.id,
            title: e.title,
            description: e.description,
            status: e.status.parse().unwrap_or(ComplaintStatus::New),
            priority: e.priority,
            financial_impact: e.financial_impact,
            service_id: e.service_id,
            service_name: e.service_name,
            product_id: e.product_id,
            product_name: e.product_name,
            provider_id: e.provider_id,
            provider_name: e.provider_name,
            submitter_id: e.submitter_id,
            submitter_name: e.submitter_name,
            submitter_email: e.submitter_email,
            assigned_agent_id: e.assigned_agent_id,
            assigned_agent_name: e.assigned_agent_name,
            assigned_agent_email: e.assigned_agent_email,
            created_at: e.created_at,
            updated_at: e.updated_at,
            assigned_at: e.assigned_at,
            resolved_at: e.resolved_at,
            closed_at: e.closed_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ComplaintStatusHistoryEntity {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_by_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ComplaintStatusHistoryEntity> for ComplaintStatusHistory {
    fn from(e: ComplaintStatusHistoryEntity) -> Self {
        Self {
            id: e.id,
            complaint_id: e.complaint_id,
            previous_status: e.previous_status.and_then(|s| s.parse().ok()),
            new_status: e.new_status.parse().unwrap_or(ComplaintStatus::New),
            changed_by_id: e.changed_by_id,
            notes: e.notes,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ComplaintCommentEntity {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub text: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ComplaintCommentEntity> for ComplaintComment {
    fn from(e: ComplaintCommentEntity) -> Self {
        Self {
            id: e.id,
            complaint_id: e.complaint_id,
            user_id: e.user_id,
            user_name: e.user_name,
            text: e.text,
            is_internal: e.is_internal,
            created_at: e.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entity_parses_statuses() {
        let entity = ComplaintStatusHistoryEntity {
            id: Uuid::new_v4(),
            complaint_id: Uuid::new_v4(),
            previous_status: None,
            new_status: "IN_PROGRESS".into(),
            changed_by_id: Uuid::new_v4(),
            notes: Some("Preuzeto".into()),
            created_at: Utc::now(),
        };
        let history: ComplaintStatusHistory = entity.into();
        assert_eq!(history.previous_status, None);
        assert_eq!(history.new_status, ComplaintStatus::InProgress);
    }
}

/// The statistics columns of a complaint.
#[derive(Debug, Clone, FromRow)]
pub struct ComplaintSnapshotEntity {
    pub status: String,
    pub priority: i16,
    pub financial_impact: Option<f64>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub provider_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<ComplaintSnapshotEntity> for ComplaintSnapshot {
    fn from(e: ComplaintSnapshotEntity) -> Self {
        Self {
            status: e.status.parse().unwrap_or(ComplaintStatus::New),
            priority: e.priority,
            financial_impact: e.financial_impact,
            service_id: e.service_id,
            service_name: e.service_name,
            provider_id: e.provider_id,
            provider_name: e.provider_name,
            created_at: e.created_at,
            resolved_at: e.resolved_at,
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct DailyCountEntity {
    pub date: NaiveDate,
    pub count: i64,
}

impl From<DailyCountEntity> for DailyCount {
    fn from(e: DailyCountEntity) -> Self {
        Self {
            date: e.date,
            count: e.count,
        }
    }
}
