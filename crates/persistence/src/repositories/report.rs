//! Scheduled report repository.

use chrono::{DateTime, Utc};
use domain::models::{ReportFrequency, ScheduleReportRequest, ScheduledReport, ScheduledReportQuery};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::entities::ScheduledReportEntity;
use crate::metrics::QueryTimer;

const REPORT_COLUMNS: &str = r#"
    id, name, description, report_type, frequency, parameters, is_active,
    last_run, next_run, created_by_id, created_at, updated_at
"#;

/// Repository for report schedules.
#[derive(Clone)]
pub struct ScheduledReportRepository {
    pool: PgPool,
}

impl ScheduledReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a schedule whose first run is computed from `now`.
    pub async fn create(
        &self,
        req: &ScheduleReportRequest,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScheduledReport, sqlx::Error> {
        let timer = QueryTimer::new("create_scheduled_report");
        let sql = format!(
            r#"
            INSERT INTO scheduled_reports
                (name, description, report_type, frequency, parameters, is_active, next_run, created_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let result = sqlx::query_as::<_, ScheduledReportEntity>(&sql)
            .bind(req.name.trim())
            .bind(&req.description)
            .bind(req.report_type.as_str())
            .bind(req.frequency.as_str())
            .bind(Json(&req.parameters))
            .bind(req.is_active)
            .bind(req.frequency.next_run(now))
            .bind(created_by)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        Ok(result?.into())
    }

    /// Schedules ordered active first, then by next run.
    pub async fn list(&self, query: &ScheduledReportQuery) -> Result<Vec<ScheduledReport>, sqlx::Error> {
        let timer = QueryTimer::new("list_scheduled_reports");
        let sql = format!(
            r#"
            SELECT {} FROM scheduled_reports
            WHERE ($1::boolean IS NULL OR is_active = $1)
            ORDER BY is_active DESC, next_run ASC NULLS LAST, created_at DESC
            "#,
            REPORT_COLUMNS
        );
        let result = sqlx::query_as::<_, ScheduledReportEntity>(&sql)
            .bind(query.is_active)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ScheduledReport>, sqlx::Error> {
        let timer = QueryTimer::new("find_scheduled_report");
        let sql = format!("SELECT {} FROM scheduled_reports WHERE id = $1", REPORT_COLUMNS);
        let result = sqlx::query_as::<_, ScheduledReportEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Replaces a schedule's fields. The next run is recomputed from `now`
    /// only when the frequency changes.
    ///
    /// Returns `None` when the schedule does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        req: &ScheduleReportRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduledReport>, sqlx::Error> {
        let timer = QueryTimer::new("update_scheduled_report");
        let sql = format!(
            r#"
            UPDATE scheduled_reports SET
                name = $2,
                description = $3,
                report_type = $4,
                next_run = CASE WHEN frequency = $5 THEN next_run ELSE $6 END,
                frequency = $5,
                parameters = $7,
                is_active = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let result = sqlx::query_as::<_, ScheduledReportEntity>(&sql)
            .bind(id)
            .bind(req.name.trim())
            .bind(&req.description)
            .bind(req.report_type.as_str())
            .bind(req.frequency.as_str())
            .bind(req.frequency.next_run(now))
            .bind(Json(&req.parameters))
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Deletes a schedule; `false` when nothing matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_scheduled_report");
        let result = sqlx::query("DELETE FROM scheduled_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Claims every active schedule that is due at `now` and moves it to its
    /// next run. One-off schedules are deactivated with no next run.
    ///
    /// Rows locked by a concurrent claimer are skipped.
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledReport>, sqlx::Error> {
        let timer = QueryTimer::new("claim_due_scheduled_reports");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {} FROM scheduled_reports
            WHERE is_active AND (next_run IS NULL OR next_run <= $1)
            ORDER BY next_run ASC NULLS FIRST
            FOR UPDATE SKIP LOCKED
            "#,
            REPORT_COLUMNS
        );
        let due: Vec<ScheduledReport> = sqlx::query_as::<_, ScheduledReportEntity>(&sql)
            .bind(now)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let mut claimed = Vec::with_capacity(due.len());
        for mut report in due {
            let (next_run, is_active) = match report.frequency {
                ReportFrequency::Once => (None, false),
                frequency => (Some(frequency.next_run(now)), true),
            };
            sqlx::query(
                r#"
                UPDATE scheduled_reports
                SET last_run = $2, next_run = $3, is_active = $4, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(report.id)
            .bind(now)
            .bind(next_run)
            .bind(is_active)
            .execute(&mut *tx)
            .await?;
            report.last_run = Some(now);
            report.next_run = next_run;
            report.is_active = is_active;
            claimed.push(report);
        }

        tx.commit().await?;
        timer.record();
        Ok(claimed)
    }
}
