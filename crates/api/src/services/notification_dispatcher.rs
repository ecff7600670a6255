//! Fan-out of domain events to in-app notifications and email.

use std::sync::Arc;

use domain::services::{plan_delivery, Audience, DeliveryResult, EmailChannel, NotificationEvent};
use metrics::counter;
use persistence::repositories::{NewNotification, NotificationRepository, UserRepository};
use sqlx::PgPool;
use tracing::{debug, error, info};

/// What one dispatch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub in_app: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: PgPool,
    email: Arc<dyn EmailChannel>,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool, email: Arc<dyn EmailChannel>) -> Self {
        Self { pool, email }
    }

    /// Stores in-app notifications and sends emails for `event`, honouring
    /// each recipient's preferences.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<DispatchSummary, sqlx::Error> {
        let users = UserRepository::new(self.pool.clone());
        let recipients = match &event.audience {
            Audience::Roles(roles) => users.recipients_with_roles(roles).await?,
            Audience::User(user_id) => users.recipient(*user_id).await?.into_iter().collect(),
        };

        let plan = plan_delivery(event.kind, &recipients);
        let mut summary = DispatchSummary::default();

        let stored = NotificationRepository::new(self.pool.clone())
            .create_for_users(
                &plan.in_app,
                &NewNotification {
                    kind: event.kind,
                    title: &event.title,
                    message: &event.message,
                    entity_type: event.entity_type.as_deref(),
                    entity_id: event.entity_id,
                },
            )
            .await?;
        summary.in_app = stored.len();

        for address in &plan.email {
            match self.email.send(address, &event.title, &event.message).await {
                DeliveryResult::Sent => summary.emails_sent += 1,
                DeliveryResult::Skipped => {}
                DeliveryResult::Failed(_) => summary.emails_failed += 1,
            }
        }

        counter!("notifications_sent_total", "channel" => "in_app").increment(summary.in_app as u64);
        counter!("notifications_sent_total", "channel" => "email").increment(summary.emails_sent as u64);

        debug!(
            kind = event.kind.as_str(),
            in_app = summary.in_app,
            emails = summary.emails_sent,
            "Notification dispatched"
        );
        Ok(summary)
    }

    /// Dispatches in the background. Failures are logged and never reach the
    /// caller.
    pub fn notify(&self, event: NotificationEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(&event).await {
                error!(
                    kind = event.kind.as_str(),
                    entity_id = ?event.entity_id,
                    "Failed to dispatch notification: {}",
                    e
                );
            } else {
                info!(kind = event.kind.as_str(), "Notification queued");
            }
        });
    }
}
