//! Notification entity.

use chrono::{DateTime, Utc};
use domain::models::{Notification, NotificationType};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub is_read: bool,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEntity> for Notification {
    fn from(e: NotificationEntity) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            title: e.title,
            message: e.message,
            notification_type: e
                .notification_type
                .parse()
                .unwrap_or(NotificationType::System),
            is_read: e.is_read,
            entity_type: e.entity_type,
            entity_id: e.entity_id,
            created_at: e.created_at,
        }
    }
}
