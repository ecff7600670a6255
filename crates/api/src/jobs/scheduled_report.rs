//! Runs due report schedules.

use chrono::Utc;
use domain::services::NotificationEvent;
use persistence::repositories::ScheduledReportRepository;
use sqlx::PgPool;
use tracing::{debug, info};

use super::scheduler::{Job, JobError, JobFrequency};
use crate::config::JobsConfig;
use crate::services::NotificationDispatcher;

/// Claims report schedules whose next run has passed, advances them and
/// tells ADMIN and MANAGER users the report is due.
pub struct ScheduledReportJob {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
    interval_secs: u64,
}

impl ScheduledReportJob {
    pub fn new(pool: PgPool, dispatcher: NotificationDispatcher, config: &JobsConfig) -> Self {
        Self {
            pool,
            dispatcher,
            interval_secs: config.scheduled_reports_interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for ScheduledReportJob {
    fn name(&self) -> &'static str {
        "scheduled_reports"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    fn run_on_start(&self) -> bool {
        false
    }

    async fn execute(&self) -> Result<(), JobError> {
        let claimed = ScheduledReportRepository::new(self.pool.clone())
            .claim_due(Utc::now())
            .await?;

        for report in &claimed {
            debug!(
                report_id = %report.id,
                next_run = ?report.next_run,
                "Scheduled report due"
            );
            let event = NotificationEvent::scheduled_report_due(
                report.id,
                &report.name,
                report.report_type.as_str(),
            );
            self.dispatcher.dispatch(&event).await?;
        }

        info!(reports = claimed.len(), "Scheduled report run finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::MockEmailChannel;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_job_uses_configured_interval() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://unused@localhost/unused")
            .unwrap();
        let dispatcher = NotificationDispatcher::new(pool.clone(), Arc::new(MockEmailChannel::new()));
        let config = JobsConfig {
            scheduled_reports_interval_secs: 900,
            ..Default::default()
        };

        let job = ScheduledReportJob::new(pool, dispatcher, &config);
        assert_eq!(job.name(), "scheduled_reports");
        assert_eq!(job.frequency(), JobFrequency::Seconds(900));
        assert!(!job.run_on_start());
    }
}
