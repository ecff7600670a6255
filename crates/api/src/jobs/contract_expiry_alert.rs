//! Daily CONTRACT_EXPIRING notifications.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{ContractStatus, ExpiringContract, NotificationType};
use domain::services::{ExpiryWindow, NotificationEvent};
use persistence::repositories::{ContractRepository, NotificationRepository};
use sqlx::PgPool;
use tracing::{debug, info};

use super::scheduler::{Job, JobError, JobFrequency};
use crate::config::JobsConfig;
use crate::services::NotificationDispatcher;

/// Alerts ADMIN and MANAGER users about ACTIVE contracts ending within the
/// configured threshold. Each contract is announced at most once per day.
pub struct ContractExpiryAlertJob {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
    threshold_days: i64,
    interval_secs: u64,
}

impl ContractExpiryAlertJob {
    pub fn new(pool: PgPool, dispatcher: NotificationDispatcher, config: &JobsConfig) -> Self {
        Self {
            pool,
            dispatcher,
            threshold_days: config.expiry_threshold_days,
            interval_secs: config.expiry_alert_interval_secs,
        }
    }
}

/// ACTIVE contracts from a scan that are due an alert.
pub fn alert_candidates(rows: &[ExpiringContract], threshold_days: i64) -> Vec<&ExpiringContract> {
    rows.iter()
        .filter(|c| c.status == ContractStatus::Active)
        .filter(|c| (0..=threshold_days).contains(&c.days_until_expiry))
        .collect()
}

fn start_of_day(today: NaiveDate) -> DateTime<Utc> {
    today.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[async_trait::async_trait]
impl Job for ContractExpiryAlertJob {
    fn name(&self) -> &'static str {
        "contract_expiry_alert"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), JobError> {
        let today = Utc::now().date_naive();
        let window = ExpiryWindow::new(today, Some(self.threshold_days))
            .map_err(|e| JobError::Failed(e.to_string()))?;
        let rows = ContractRepository::new(self.pool.clone())
            .find_expiring(&window)
            .await?;

        let notifications = NotificationRepository::new(self.pool.clone());
        let since = start_of_day(today);
        let mut sent = 0;

        for contract in alert_candidates(&rows, self.threshold_days) {
            if notifications
                .exists_since(NotificationType::ContractExpiring, contract.id, since)
                .await?
            {
                debug!(contract = %contract.contract_number, "Expiry alert already sent today");
                continue;
            }
            let event = NotificationEvent::contract_expiring(
                contract.id,
                &contract.contract_number,
                contract.days_until_expiry,
            );
            self.dispatcher.dispatch(&event).await?;
            sent += 1;
        }

        info!(scanned = rows.len(), alerts = sent, "Contract expiry scan finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ContractType;
    use uuid::Uuid;

    fn row(status: ContractStatus, days: i64) -> ExpiringContract {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        ExpiringContract {
            id: Uuid::new_v4(),
            contract_number: format!("K-{}", days),
            name: "Ugovor".into(),
            contract_type: ContractType::Provider,
            status,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: today + chrono::Duration::days(days),
            days_until_expiry: days,
            partner_id: None,
            partner_name: None,
            latest_renewal: None,
            created_by_name: None,
            created_by_email: None,
        }
    }

    #[test]
    fn test_only_active_within_threshold() {
        let rows = vec![
            row(ContractStatus::Active, 5),
            row(ContractStatus::Active, 45),
            row(ContractStatus::Expired, -3),
            row(ContractStatus::RenewalInProgress, 2),
        ];
        let picked = alert_candidates(&rows, 30);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].contract_number, "K-5");
    }

    #[test]
    fn test_start_of_day() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(start_of_day(day).to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }
}
