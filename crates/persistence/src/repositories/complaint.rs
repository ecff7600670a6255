//! Complaint repository: complaints, status history and comments.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{
    Complaint, ComplaintComment, ComplaintExportQuery, ComplaintQuery, ComplaintSnapshot,
    ComplaintStatus, ComplaintStatusHistory, CreateComplaintCommentRequest,
    CreateComplaintRequest, DailyCount, StatusMilestones, UpdateComplaintRequest,
};
use shared::pagination::PageRequest;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::filter::{like_pattern, FilterBuilder};
use crate::entities::{
    ComplaintCommentEntity, ComplaintEntity, ComplaintSnapshotEntity, ComplaintStatusHistoryEntity,
    DailyCountEntity,
};
use crate::metrics::QueryTimer;

const COMPLAINT_SELECT: &str = r#"
    SELECT cp.id, cp.title, cp.description, cp.status, cp.priority, cp.financial_impact,
           cp.service_id, s.name AS service_name,
           cp.product_id, pr.name AS product_name,
           cp.provider_id, p.name AS provider_name,
           cp.submitter_id, su.name AS submitter_name, su.email AS submitter_email,
           cp.assigned_agent_id, ag.name AS assigned_agent_name, ag.email AS assigned_agent_email,
           cp.created_at, cp.updated_at, cp.assigned_at, cp.resolved_at, cp.closed_at
    FROM complaints cp
    LEFT JOIN services s ON s.id = cp.service_id
    LEFT JOIN products pr ON pr.id = cp.product_id
    LEFT JOIN providers p ON p.id = cp.provider_id
    LEFT JOIN users su ON su.id = cp.submitter_id
    LEFT JOIN users ag ON ag.id = cp.assigned_agent_id
"#;

fn build_list_filter(query: &ComplaintQuery, own_only: Option<Uuid>) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if own_only.is_some() {
        filter.push("cp.submitter_id = {}");
    }
    if query.status.is_some() {
        filter.push("cp.status = {}");
    }
    if query.priority.is_some() {
        filter.push("cp.priority = {}");
    }
    if query.provider_id.is_some() {
        filter.push("cp.provider_id = {}");
    }
    if query.assigned_agent_id.is_some() {
        filter.push("cp.assigned_agent_id = {}");
    }
    if query.submitter_id.is_some() {
        filter.push("cp.submitter_id = {}");
    }
    if query.start_date.is_some() {
        filter.push("cp.created_at::date >= {}");
    }
    if query.end_date.is_some() {
        filter.push("cp.created_at::date <= {}");
    }
    if query.search.is_some() {
        filter.push("(cp.title ILIKE {} OR cp.description ILIKE {})");
    }
    filter
}

macro_rules! bind_list_filters {
    ($builder:expr, $query:expr, $own_only:expr) => {{
        let mut b = $builder;
        if let Some(user_id) = $own_only {
            b = b.bind(user_id);
        }
        if let Some(status) = $query.status {
            b = b.bind(status.as_str());
        }
        if let Some(priority) = $query.priority {
            b = b.bind(priority);
        }
        if let Some(id) = $query.provider_id {
            b = b.bind(id);
        }
        if let Some(id) = $query.assigned_agent_id {
            b = b.bind(id);
        }
        if let Some(id) = $query.submitter_id {
            b = b.bind(id);
        }
        if let Some(date) = $query.start_date {
            b = b.bind(date);
        }
        if let Some(date) = $query.end_date {
            b = b.bind(date);
        }
        if let Some(ref search) = $query.search {
            b = b.bind(like_pattern(search));
        }
        b
    }};
}

/// Repository for complaints.
#[derive(Clone)]
pub struct ComplaintRepository {
    pool: PgPool,
}

impl ComplaintRepository {
    /// Creates a new complaint repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a NEW complaint and its first history entry.
    pub async fn create(
        &self,
        req: &CreateComplaintRequest,
        submitter_id: Uuid,
    ) -> Result<Complaint, sqlx::Error> {
        let timer = QueryTimer::new("create_complaint");
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO complaints (
                title, description, status, priority, financial_impact,
                service_id, product_id, provider_id, submitter_id
            )
            VALUES ($1, $2, 'NEW', $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(req.title.trim())
        .bind(req.description.trim())
        .bind(req.priority)
        .bind(req.financial_impact)
        .bind(req.service_id)
        .bind(req.product_id)
        .bind(req.provider_id)
        .bind(submitter_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_history(&mut tx, id, None, ComplaintStatus::New, submitter_id, None).await?;
        tx.commit().await?;
        timer.record();

        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a complaint by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        let timer = QueryTimer::new("find_complaint_by_id");
        let sql = format!("{} WHERE cp.id = $1", COMPLAINT_SELECT);
        let result = sqlx::query_as::<_, ComplaintEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Paginated list, newest first. `own_only` restricts to one submitter.
    pub async fn list(
        &self,
        query: &ComplaintQuery,
        own_only: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<Complaint>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_complaints");
        let filter = build_list_filter(query, own_only);

        let count_sql = format!(
            "SELECT COUNT(*) FROM complaints cp WHERE {}",
            filter.where_clause()
        );
        let total: i64 =
            bind_list_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query, own_only)
                .fetch_one(&self.pool)
                .await?;

        let list_sql = format!(
            "{} WHERE {} ORDER BY cp.created_at DESC {}",
            COMPLAINT_SELECT,
            filter.where_clause(),
            filter.limit_offset()
        );
        let entities =
            bind_list_filters!(sqlx::query_as::<_, ComplaintEntity>(&list_sql), query, own_only)
                .bind(page.limit_i64())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateComplaintRequest,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let timer = QueryTimer::new("update_complaint");
        let result = sqlx::query(
            r#"
            UPDATE complaints SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                service_id = COALESCE($5, service_id),
                product_id = COALESCE($6, product_id),
                provider_id = COALESCE($7, provider_id),
                financial_impact = COALESCE($8, financial_impact),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.description.as_deref().map(str::trim))
        .bind(req.priority)
        .bind(req.service_id)
        .bind(req.product_id)
        .bind(req.provider_id)
        .bind(req.financial_impact)
        .execute(&self.pool)
        .await?;
        timer.record();

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Moves a complaint to `status`, setting first-time milestones and
    /// appending a history entry in the same transaction.
    pub async fn change_status(
        &self,
        id: Uuid,
        previous: ComplaintStatus,
        status: ComplaintStatus,
        milestones: StatusMilestones,
        changed_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let timer = QueryTimer::new("change_complaint_status");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE complaints SET
                status = $2,
                assigned_at = CASE WHEN $3 THEN NOW() ELSE assigned_at END,
                resolved_at = CASE WHEN $4 THEN NOW() ELSE resolved_at END,
                closed_at = CASE WHEN $5 THEN NOW() ELSE closed_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(milestones.set_assigned_at)
        .bind(milestones.set_resolved_at)
        .bind(milestones.set_closed_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        insert_history(&mut tx, id, Some(previous), status, changed_by, notes).await?;
        tx.commit().await?;
        timer.record();

        self.find_by_id(id).await
    }

    /// Assigns an agent and moves the complaint to ASSIGNED.
    pub async fn assign(
        &self,
        id: Uuid,
        previous: ComplaintStatus,
        agent_id: Uuid,
        changed_by: Uuid,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let timer = QueryTimer::new("assign_complaint");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE complaints SET
                assigned_agent_id = $2,
                status = 'ASSIGNED',
                assigned_at = COALESCE(assigned_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        insert_history(
            &mut tx,
            id,
            Some(previous),
            ComplaintStatus::Assigned,
            changed_by,
            Some("Agent assigned"),
        )
        .await?;
        tx.commit().await?;
        timer.record();

        self.find_by_id(id).await
    }

    /// Status history of a complaint, oldest first.
    pub async fn history(&self, id: Uuid) -> Result<Vec<ComplaintStatusHistory>, sqlx::Error> {
        let timer = QueryTimer::new("complaint_history");
        let result = sqlx::query_as::<_, ComplaintStatusHistoryEntity>(
            r#"
            SELECT id, complaint_id, previous_status, new_status, changed_by_id, notes, created_at
            FROM complaint_status_history
            WHERE complaint_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn add_comment(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
        req: &CreateComplaintCommentRequest,
    ) -> Result<ComplaintComment, sqlx::Error> {
        let timer = QueryTimer::new("add_complaint_comment");
        let result = sqlx::query_as::<_, ComplaintCommentEntity>(
            r#"
            WITH inserted AS (
                INSERT INTO complaint_comments (complaint_id, user_id, text, is_internal)
                VALUES ($1, $2, $3, $4)
                RETURNING id, complaint_id, user_id, text, is_internal, created_at
            )
            SELECT i.id, i.complaint_id, i.user_id, u.name AS user_name,
                   i.text, i.is_internal, i.created_at
            FROM inserted i
            LEFT JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(complaint_id)
        .bind(user_id)
        .bind(req.text.trim())
        .bind(req.is_internal)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    /// Comments in posting order. Internal comments only when requested.
    pub async fn comments(
        &self,
        complaint_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<ComplaintComment>, sqlx::Error> {
        let timer = QueryTimer::new("list_complaint_comments");
        let result = sqlx::query_as::<_, ComplaintCommentEntity>(
            r#"
            SELECT cc.id, cc.complaint_id, cc.user_id, u.name AS user_name,
                   cc.text, cc.is_internal, cc.created_at
            FROM complaint_comments cc
            LEFT JOIN users u ON u.id = cc.user_id
            WHERE cc.complaint_id = $1 AND ($2 OR NOT cc.is_internal)
            ORDER BY cc.created_at ASC
            "#,
        )
        .bind(complaint_id)
        .bind(include_internal)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Complaints matching the export filters, newest first.
    pub async fn list_for_export(
        &self,
        query: &ComplaintExportQuery,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        let timer = QueryTimer::new("list_complaints_for_export");
        let mut filter = FilterBuilder::new();
        if query.start_date.is_some() {
            filter.push("cp.created_at::date >= {}");
        }
        if query.end_date.is_some() {
            filter.push("cp.created_at::date <= {}");
        }
        if query.status.is_some() {
            filter.push("cp.status = {}");
        }
        if query.service_id.is_some() {
            filter.push("cp.service_id = {}");
        }
        if query.provider_id.is_some() {
            filter.push("cp.provider_id = {}");
        }

        let sql = format!(
            "{} WHERE {} ORDER BY cp.created_at DESC",
            COMPLAINT_SELECT,
            filter.where_clause()
        );
        let mut builder = sqlx::query_as::<_, ComplaintEntity>(&sql);
        if let Some(date) = query.start_date {
            builder = builder.bind(date);
        }
        if let Some(date) = query.end_date {
            builder = builder.bind(date);
        }
        if let Some(status) = query.status {
            builder = builder.bind(status.as_str());
        }
        if let Some(id) = query.service_id {
            builder = builder.bind(id);
        }
        if let Some(id) = query.provider_id {
            builder = builder.bind(id);
        }
        let result = builder.fetch_all(&self.pool).await;
        timer.record();

        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Statistics columns of complaints created within `range`, or of every
    /// complaint when there is no range.
    pub async fn statistics_rows(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<ComplaintSnapshot>, sqlx::Error> {
        let timer = QueryTimer::new("complaint_statistics_rows");
        let (start, end) = range.unzip();
        let result = sqlx::query_as::<_, ComplaintSnapshotEntity>(
            r#"
            SELECT cp.status, cp.priority, cp.financial_impact,
                   cp.service_id, s.name AS service_name,
                   cp.provider_id, p.name AS provider_name,
                   cp.created_at, cp.resolved_at
            FROM complaints cp
            LEFT JOIN services s ON s.id = cp.service_id
            LEFT JOIN providers p ON p.id = cp.provider_id
            WHERE ($1::timestamptz IS NULL OR cp.created_at >= $1)
              AND ($2::timestamptz IS NULL OR cp.created_at <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Complaints created per day from `since` onwards. Days without
    /// complaints are absent.
    pub async fn daily_counts(&self, since: NaiveDate) -> Result<Vec<DailyCount>, sqlx::Error> {
        let timer = QueryTimer::new("complaint_daily_counts");
        let result = sqlx::query_as::<_, DailyCountEntity>(
            r#"
            SELECT cp.created_at::date AS date, COUNT(*) AS count
            FROM complaints cp
            WHERE cp.created_at::date >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}

async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    complaint_id: Uuid,
    previous: Option<ComplaintStatus>,
    status: ComplaintStatus,
    changed_by: Uuid,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO complaint_status_history (complaint_id, previous_status, new_status, changed_by_id, notes)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(complaint_id)
    .bind(previous.map(|s| s.as_str()))
    .bind(status.as_str())
    .bind(changed_by)
    .bind(notes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_only_filter_comes_first() {
        let user = Uuid::new_v4();
        let query = ComplaintQuery {
            status: Some(ComplaintStatus::New),
            search: Some("naplata".into()),
            ..Default::default()
        };
        let filter = build_list_filter(&query, Some(user));
        assert_eq!(
            filter.where_clause(),
            "cp.submitter_id = $1 AND cp.status = $2 AND (cp.title ILIKE $3 OR cp.description ILIKE $3)"
        );
    }

    #[test]
    fn test_back_office_filter_unrestricted() {
        let filter = build_list_filter(&ComplaintQuery::default(), None);
        assert_eq!(filter.where_clause(), "TRUE");
    }
}
