//! Activity log repository.

use domain::models::{ActivityLog, ActivityLogQuery, CreateActivityLogInput, LogSeverity};
use shared::pagination::PageRequest;
use sqlx::PgPool;

use crate::entities::ActivityLogEntity;
use super::filter::FilterBuilder;
use crate::metrics::QueryTimer;

fn build_filter(query: &ActivityLogQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if query.action.is_some() {
        filter.push("action = {}");
    }
    if query.entity_type.is_some() {
        filter.push("entity_type = {}");
    }
    if query.entity_id.is_some() {
        filter.push("entity_id = {}");
    }
    if query.user_id.is_some() {
        filter.push("user_id = {}");
    }
    if query.severity.is_some() {
        filter.push("severity = {}");
    }
    if query.from.is_some() {
        filter.push("created_at >= {}");
    }
    if query.to.is_some() {
        filter.push("created_at <= {}");
    }
    filter
}

/// Binds the optional filters in the order [`build_filter`] numbered them.
macro_rules! bind_activity_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(ref action) = $query.action {
            b = b.bind(action.clone());
        }
        if let Some(ref entity_type) = $query.entity_type {
            b = b.bind(entity_type.clone());
        }
        if let Some(entity_id) = $query.entity_id {
            b = b.bind(entity_id);
        }
        if let Some(user_id) = $query.user_id {
            b = b.bind(user_id);
        }
        if let Some(severity) = $query.severity {
            b = b.bind(severity.as_str());
        }
        if let Some(from) = $query.from {
            b = b.bind(from);
        }
        if let Some(to) = $query.to {
            b = b.bind(to);
        }
        b
    }};
}

/// Repository for the append-only activity trail.
#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an entry.
    pub async fn insert(&self, input: CreateActivityLogInput) -> Result<ActivityLog, sqlx::Error> {
        let timer = QueryTimer::new("insert_activity_log");
        let entity = sqlx::query_as::<_, ActivityLogEntity>(
            r#"
            INSERT INTO activity_logs (action, entity_type, entity_id, details, severity, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, action, entity_type, entity_id, details, severity, user_id, created_at
            "#,
        )
        .bind(&input.action)
        .bind(&input.entity_type)
        .bind(input.entity_id)
        .bind(&input.details)
        .bind(input.severity.as_str())
        .bind(input.user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity_to_domain(entity?))
    }

    /// Appends an entry in the background. Failures are logged and dropped.
    pub fn record(&self, input: CreateActivityLogInput) {
        let repo = self.clone();
        tokio::spawn(async move {
            let action = input.action.clone();
            if let Err(e) = repo.insert(input).await {
                tracing::error!(action = %action, "Failed to insert activity log: {}", e);
            }
        });
    }

    /// Lists entries, newest first.
    pub async fn list(
        &self,
        query: &ActivityLogQuery,
        page: PageRequest,
    ) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_activity_logs");
        let filter = build_filter(query);
        let where_clause = filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM activity_logs WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_sql);
        let total: i64 = bind_activity_filters!(count_builder, query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            r#"
            SELECT id, action, entity_type, entity_id, details, severity, user_id, created_at
            FROM activity_logs
            WHERE {}
            ORDER BY created_at DESC
            {}
            "#,
            where_clause,
            filter.limit_offset()
        );
        let list_builder = sqlx::query_as::<_, ActivityLogEntity>(&list_sql);
        let entities = bind_activity_filters!(list_builder, query)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((entities?.into_iter().map(entity_to_domain).collect(), total))
    }
}

fn entity_to_domain(entity: ActivityLogEntity) -> ActivityLog {
    ActivityLog {
        id: entity.id,
        action: entity.action,
        entity_type: entity.entity_type,
        entity_id: entity.entity_id,
        details: entity.details,
        severity: entity.severity.parse().unwrap_or(LogSeverity::Info),
        user_id: entity.user_id,
        created_at: entity.created_at,
    }
}
