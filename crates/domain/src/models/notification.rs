//! In-app notifications and per-user delivery preferences.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    /// Event category a notification belongs to.
    pub enum NotificationType {
        ContractExpiring => "CONTRACT_EXPIRING",
        ContractRenewalStatusChange => "CONTRACT_RENEWAL_STATUS_CHANGE",
        ComplaintCreated => "COMPLAINT_CREATED",
        ComplaintAssigned => "COMPLAINT_ASSIGNED",
        ComplaintUpdated => "COMPLAINT_UPDATED",
        Reminder => "REMINDER",
        System => "SYSTEM",
    }
}

impl NotificationType {
    /// Whether email delivery is on when the user never set a preference.
    pub fn email_by_default(&self) -> bool {
        matches!(
            self,
            NotificationType::ContractExpiring | NotificationType::ComplaintAssigned
        )
    }
}

/// Delivery toggles for a single notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannels {
    pub in_app: bool,
    pub email: bool,
}

/// Per-type delivery preferences stored as JSON on the user row.
///
/// Types missing from the map fall back to in-app on and email on only for
/// [`NotificationType::email_by_default`] types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPreferences(pub HashMap<NotificationType, NotificationChannels>);

impl NotificationPreferences {
    pub fn channels_for(&self, kind: NotificationType) -> NotificationChannels {
        self.0.get(&kind).copied().unwrap_or(NotificationChannels {
            in_app: true,
            email: kind.email_by_default(),
        })
    }

    pub fn set(&mut self, kind: NotificationType, channels: NotificationChannels) {
        self.0.insert(kind, channels);
    }
}

/// A stored notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/notifications/push`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,
    #[serde(rename = "type", default = "default_type")]
    pub notification_type: NotificationType,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

fn default_type() -> NotificationType {
    NotificationType::System
}

/// Body of `PATCH /api/notifications/push`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[validate(length(min = 1, message = "At least one notification id is required"))]
    pub ids: Vec<Uuid>,
}

/// Query for listing notifications.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub is_read: Option<bool>,
    pub limit: Option<u32>,
}

impl NotificationQuery {
    pub fn effective_limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(10).clamp(1, 100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channels() {
        let prefs = NotificationPreferences::default();
        let expiring = prefs.channels_for(NotificationType::ContractExpiring);
        assert!(expiring.in_app && expiring.email);

        let created = prefs.channels_for(NotificationType::ComplaintCreated);
        assert!(created.in_app);
        assert!(!created.email);
    }

    #[test]
    fn test_explicit_preference_overrides_default() {
        let mut prefs = NotificationPreferences::default();
        prefs.set(
            NotificationType::ContractExpiring,
            NotificationChannels {
                in_app: false,
                email: false,
            },
        );
        let channels = prefs.channels_for(NotificationType::ContractExpiring);
        assert!(!channels.in_app);
        assert!(!channels.email);
    }

    #[test]
    fn test_preferences_json_shape() {
        let json = serde_json::json!({
            "COMPLAINT_CREATED": { "inApp": true, "email": true }
        });
        let prefs: NotificationPreferences = serde_json::from_value(json).unwrap();
        assert!(prefs.channels_for(NotificationType::ComplaintCreated).email);
    }

    #[test]
    fn test_limit_clamped() {
        let mut q = NotificationQuery::default();
        assert_eq!(q.effective_limit(), 10);
        q.limit = Some(500);
        assert_eq!(q.effective_limit(), 100);
        q.limit = Some(0);
        assert_eq!(q.effective_limit(), 1);
    }

    #[test]
    fn test_create_request_defaults_to_system() {
        let json = serde_json::json!({
            "userId": Uuid::new_v4(),
            "title": "Održavanje",
            "message": "Sistem neće biti dostupan od 22h"
        });
        let req: CreateNotificationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.notification_type, NotificationType::System);
        assert!(req.validate().is_ok());
    }
}
