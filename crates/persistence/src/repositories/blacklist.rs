//! Sender blacklist repository.

use chrono::NaiveDate;
use domain::models::{
    BlacklistQuery, CreateBlacklistEntryRequest, SenderBlacklistEntry, UpdateBlacklistEntryRequest,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::FilterBuilder;
use crate::entities::SenderBlacklistEntity;
use crate::metrics::QueryTimer;

const BLACKLIST_SELECT: &str = r#"
    SELECT b.id, b.sender_name, b.provider_id, p.name AS provider_name, b.effective_date,
           b.description, b.is_active, b.created_by_id, b.created_at, b.updated_at
    FROM sender_blacklist b
    LEFT JOIN providers p ON p.id = b.provider_id
"#;

fn build_filter(query: &BlacklistQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if query.sender_name.is_some() {
        filter.push("b.sender_name ILIKE {}");
    }
    if query.provider_id.is_some() {
        filter.push("b.provider_id = {}");
    }
    if query.is_active.is_some() {
        filter.push("b.is_active = {}");
    }
    if query.effective_from.is_some() {
        filter.push("b.effective_date >= {}");
    }
    filter
}

macro_rules! bind_blacklist_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(ref sender) = $query.sender_name {
            b = b.bind(super::filter::like_pattern(sender));
        }
        if let Some(provider_id) = $query.provider_id {
            b = b.bind(provider_id);
        }
        if let Some(active) = $query.is_active {
            b = b.bind(active);
        }
        if let Some(from) = $query.effective_from {
            b = b.bind(from);
        }
        b
    }};
}

/// Repository for sender blacklist entries.
#[derive(Clone)]
pub struct BlacklistRepository {
    pool: PgPool,
}

impl BlacklistRepository {
    /// Creates a new blacklist repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated entries matching the query, newest first.
    pub async fn list(
        &self,
        query: &BlacklistQuery,
        page: PageRequest,
    ) -> Result<(Vec<SenderBlacklistEntry>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_sender_blacklist");
        let filter = build_filter(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM sender_blacklist b WHERE {}",
            filter.where_clause()
        );
        let total: i64 = bind_blacklist_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "{} WHERE {} ORDER BY b.created_at DESC {}",
            BLACKLIST_SELECT,
            filter.where_clause(),
            filter.limit_offset()
        );
        let entities =
            bind_blacklist_filters!(sqlx::query_as::<_, SenderBlacklistEntity>(&list_sql), query)
                .bind(page.limit_i64())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Finds an entry by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SenderBlacklistEntry>, sqlx::Error> {
        let timer = QueryTimer::new("find_blacklist_entry");
        let sql = format!("{} WHERE b.id = $1", BLACKLIST_SELECT);
        let result = sqlx::query_as::<_, SenderBlacklistEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts an entry. Sender names are unique per provider, ignoring case.
    pub async fn create(
        &self,
        req: &CreateBlacklistEntryRequest,
        created_by: Uuid,
    ) -> Result<SenderBlacklistEntry, sqlx::Error> {
        let timer = QueryTimer::new("create_blacklist_entry");
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sender_blacklist (sender_name, provider_id, effective_date, description, is_active, created_by_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(req.sender_name.trim())
        .bind(req.provider_id)
        .bind(req.effective_date)
        .bind(&req.description)
        .bind(req.is_active)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Applies a partial update. Returns `None` when the entry does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateBlacklistEntryRequest,
    ) -> Result<Option<SenderBlacklistEntry>, sqlx::Error> {
        let timer = QueryTimer::new("update_blacklist_entry");
        let updated = sqlx::query(
            r#"
            UPDATE sender_blacklist SET
                sender_name = COALESCE($2, sender_name),
                provider_id = COALESCE($3, provider_id),
                effective_date = COALESCE($4, effective_date),
                description = COALESCE($5, description),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.sender_name.as_deref().map(str::trim))
        .bind(req.provider_id)
        .bind(req.effective_date)
        .bind(&req.description)
        .bind(req.is_active)
        .execute(&self.pool)
        .await?;
        timer.record();

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Deletes an entry; `false` when nothing matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_blacklist_entry");
        let result = sqlx::query("DELETE FROM sender_blacklist WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Entries in force on `on`: active with an effective date not after it.
    pub async fn active_on(&self, on: NaiveDate) -> Result<Vec<SenderBlacklistEntry>, sqlx::Error> {
        let timer = QueryTimer::new("active_blacklist_entries");
        let sql = format!(
            "{} WHERE b.is_active AND b.effective_date <= $1 ORDER BY b.sender_name",
            BLACKLIST_SELECT
        );
        let result = sqlx::query_as::<_, SenderBlacklistEntity>(&sql)
            .bind(on)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
