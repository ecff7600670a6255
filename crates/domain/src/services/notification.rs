//! Notification routing and delivery channel abstraction.
//!
//! Decides who hears about an event and through which channels. Storage and
//! fan-out live in the api crate's dispatcher.

use uuid::Uuid;

use crate::models::{NotificationPreferences, NotificationType, UserRole};

/// Who should receive a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every active user holding any of these roles.
    Roles(Vec<UserRole>),
    /// One specific user.
    User(Uuid),
}

impl Audience {
    pub fn back_office() -> Self {
        Audience::Roles(vec![UserRole::Admin, UserRole::Manager])
    }
}

/// A domain event ready to be fanned out.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub audience: Audience,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

impl NotificationEvent {
    pub fn complaint_created(complaint_id: Uuid, title: &str) -> Self {
        Self {
            kind: NotificationType::ComplaintCreated,
            title: "Nova reklamacija".to_string(),
            message: format!("Kreirana je nova reklamacija: {}", title),
            audience: Audience::back_office(),
            entity_type: Some("complaint".to_string()),
            entity_id: Some(complaint_id),
        }
    }

    pub fn complaint_assigned(complaint_id: Uuid, title: &str, agent_id: Uuid) -> Self {
        Self {
            kind: NotificationType::ComplaintAssigned,
            title: "Dodeljena reklamacija".to_string(),
            message: format!("Dodeljena vam je reklamacija: {}", title),
            audience: Audience::User(agent_id),
            entity_type: Some("complaint".to_string()),
            entity_id: Some(complaint_id),
        }
    }

    pub fn complaint_status_changed(
        complaint_id: Uuid,
        title: &str,
        status: &str,
        submitter_id: Uuid,
    ) -> Self {
        Self {
            kind: NotificationType::ComplaintUpdated,
            title: "Status reklamacije promenjen".to_string(),
            message: format!("Reklamacija \"{}\" je sada u statusu {}", title, status),
            audience: Audience::User(submitter_id),
            entity_type: Some("complaint".to_string()),
            entity_id: Some(complaint_id),
        }
    }

    pub fn renewal_status_changed(contract_id: Uuid, contract_number: &str, stage_label: &str) -> Self {
        Self {
            kind: NotificationType::ContractRenewalStatusChange,
            title: "Promena statusa obnove ugovora".to_string(),
            message: format!("Obnova ugovora {}: {}", contract_number, stage_label),
            audience: Audience::back_office(),
            entity_type: Some("contract".to_string()),
            entity_id: Some(contract_id),
        }
    }

    pub fn contract_expiring(contract_id: Uuid, contract_number: &str, days_left: i64) -> Self {
        Self {
            kind: NotificationType::ContractExpiring,
            title: "Ugovor ističe".to_string(),
            message: format!("Ugovor {} ističe za {} dana", contract_number, days_left),
            audience: Audience::back_office(),
            entity_type: Some("contract".to_string()),
            entity_id: Some(contract_id),
        }
    }

    pub fn scheduled_report_due(report_id: Uuid, name: &str, report_type: &str) -> Self {
        Self {
            kind: NotificationType::System,
            title: "Zakazani izveštaj".to_string(),
            message: format!("Izveštaj \"{}\" ({}) je spreman za generisanje", name, report_type),
            audience: Audience::back_office(),
            entity_type: Some("report".to_string()),
            entity_id: Some(report_id),
        }
    }
}

/// A user considered for delivery.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub user_id: Uuid,
    pub email: String,
    pub preferences: NotificationPreferences,
}

/// Recipients split by channel after applying preferences.
#[derive(Debug, Clone, Default)]
pub struct DeliveryPlan {
    pub in_app: Vec<Uuid>,
    pub email: Vec<String>,
}

pub fn plan_delivery(kind: NotificationType, recipients: &[Recipient]) -> DeliveryPlan {
    let mut plan = DeliveryPlan::default();
    for r in recipients {
        let channels = r.preferences.channels_for(kind);
        if channels.in_app {
            plan.in_app.push(r.user_id);
        }
        if channels.email {
            plan.email.push(r.email.clone());
        }
    }
    plan
}

/// Result of a delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResult {
    Sent,
    Skipped,
    Failed(String),
}

/// Outbound channel for notification emails.
#[async_trait::async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> DeliveryResult;
}

/// Channel that logs instead of sending.
#[derive(Debug, Clone, Default)]
pub struct MockEmailChannel {
    pub simulate_failure: bool,
}

impl MockEmailChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl EmailChannel for MockEmailChannel {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> DeliveryResult {
        if self.simulate_failure {
            tracing::warn!(to = %to, "Mock email channel simulating failure");
            return DeliveryResult::Failed("Simulated failure".to_string());
        }
        tracing::info!(to = %to, subject = %subject, "Mock: Would send notification email");
        DeliveryResult::Sent
    }
}
