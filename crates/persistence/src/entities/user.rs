//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{NotificationPreferences, User, UserRole};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    /// Per-type channel toggles; `{}` means defaults everywhere.
    pub notification_preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            role: entity.role.parse().unwrap_or(UserRole::User),
            is_active: entity.is_active,
            notification_preferences: serde_json::from_value(entity.notification_preferences)
                .unwrap_or_default(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Minimal recipient row used by the notification fan-out.
#[derive(Debug, Clone, FromRow)]
pub struct RecipientEntity {
    pub id: Uuid,
    pub email: String,
    pub notification_preferences: serde_json::Value,
}

impl RecipientEntity {
    pub fn preferences(&self) -> NotificationPreferences {
        serde_json::from_value(self.notification_preferences.clone()).unwrap_or_default()
    }
}
