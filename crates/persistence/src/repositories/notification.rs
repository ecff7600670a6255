//! Notification repository.

use chrono::{DateTime, Utc};
use domain::models::{Notification, NotificationQuery, NotificationType};
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::FilterBuilder;
use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, notification_type, is_read, entity_type, entity_id, created_at";

/// Content shared by every copy of a fanned-out notification.
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub kind: NotificationType,
    pub title: &'a str,
    pub message: &'a str,
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores one notification per user in a single statement.
    pub async fn create_for_users(
        &self,
        user_ids: &[Uuid],
        content: &NewNotification<'_>,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("create_notifications");
        let sql = format!(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, entity_type, entity_id)
            SELECT recipient, $2, $3, $4, $5, $6
            FROM UNNEST($1::uuid[]) AS recipient
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );
        let result = sqlx::query_as::<_, NotificationEntity>(&sql)
            .bind(user_ids)
            .bind(content.title)
            .bind(content.message)
            .bind(content.kind.as_str())
            .bind(content.entity_type)
            .bind(content.entity_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Newest first, at most `query.effective_limit()` rows.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications");
        let mut filter = FilterBuilder::new();
        filter.push("user_id = {}");
        if query.notification_type.is_some() {
            filter.push("notification_type = {}");
        }
        if query.is_read.is_some() {
            filter.push("is_read = {}");
        }
        let sql = format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC LIMIT ${}",
            NOTIFICATION_COLUMNS,
            filter.where_clause(),
            filter.param_count() + 1
        );

        let mut q = sqlx::query_as::<_, NotificationEntity>(&sql).bind(user_id);
        if let Some(kind) = query.notification_type {
            q = q.bind(kind.as_str());
        }
        if let Some(is_read) = query.is_read {
            q = q.bind(is_read);
        }
        let result = q.bind(query.effective_limit()).fetch_all(&self.pool).await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_unread_notifications");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks the given notifications read. With `owner` set, only that
    /// user's notifications are touched.
    pub async fn mark_read(&self, ids: &[Uuid], owner: Option<Uuid>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_notifications_read");
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = ANY($1) AND ($2::uuid IS NULL OR user_id = $2) AND is_read = FALSE
            "#,
        )
        .bind(ids)
        .bind(owner)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_all_notifications_read");
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Whether a notification of `kind` about `entity_id` was stored since `since`.
    pub async fn exists_since(
        &self,
        kind: NotificationType,
        entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("notification_exists_since");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE notification_type = $1 AND entity_id = $2 AND created_at >= $3
            )
            "#,
        )
        .bind(kind.as_str())
        .bind(entity_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
