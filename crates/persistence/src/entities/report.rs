//! Scheduled report entity.

use chrono::{DateTime, Utc};
use domain::models::{ReportFrequency, ReportType, ScheduledReport};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ScheduledReportEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub report_type: String,
    pub frequency: String,
    pub parameters: Json<serde_json::Value>,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduledReportEntity> for ScheduledReport {
    fn from(e: ScheduledReportEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            report_type: e.report_type.parse().unwrap_or(ReportType::Financial),
            frequency: e.frequency.parse().unwrap_or(ReportFrequency::Once),
            parameters: e.parameters.0,
            is_active: e.is_active,
            last_run: e.last_run,
            next_run: e.next_run,
            created_by_id: e.created_by_id,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
