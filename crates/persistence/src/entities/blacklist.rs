//! Sender blacklist entity.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::SenderBlacklistEntry;
use sqlx::FromRow;
use uuid::Uuid;

/// Blacklist row with the provider name joined in.
#[derive(Debug, Clone, FromRow)]
pub struct SenderBlacklistEntity {
    pub id: Uuid,
    pub sender_name: String,
    pub provider_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub effective_date: NaiveDate,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SenderBlacklistEntity> for SenderBlacklistEntry {
    fn from(e: SenderBlacklistEntity) -> Self {
        Self {
            id: e.id,
            sender_name: e.sender_name,
            provider_id: e.provider_id,
            provider_name: e.provider_name,
            effective_date: e.effective_date,
            description: e.description,
            is_active: e.is_active,
            created_by_id: e.created_by_id,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
