//! Provider repository.

use domain::models::{CreateProviderRequest, PartnerQuery, Provider, UpdateProviderRequest};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::FilterBuilder;
use crate::entities::{NameIdEntity, ProviderEntity};
use crate::metrics::QueryTimer;

const PROVIDER_COLUMNS: &str =
    "id, name, contact_name, email, phone, address, is_active, created_at, updated_at";

/// Name and active-flag filters shared by the partner lists.
pub(crate) fn build_partner_filter(query: &PartnerQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if query.name.is_some() {
        filter.push("name ILIKE {}");
    }
    if query.is_active.is_some() {
        filter.push("is_active = {}");
    }
    filter
}

macro_rules! bind_partner_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(ref name) = $query.name {
            b = b.bind($crate::repositories::filter::like_pattern(name));
        }
        if let Some(active) = $query.is_active {
            b = b.bind(active);
        }
        b
    }};
}
pub(crate) use bind_partner_filters;

/// Repository for VAS and bulk providers.
#[derive(Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    /// Creates a new provider repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated providers matching the query.
    pub async fn list(
        &self,
        query: &PartnerQuery,
        page: PageRequest,
    ) -> Result<(Vec<Provider>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_providers");
        let filter = build_partner_filter(query);

        let count_sql = format!("SELECT COUNT(*) FROM providers WHERE {}", filter.where_clause());
        let total: i64 = bind_partner_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {} FROM providers WHERE {} ORDER BY {} {} {}",
            PROVIDER_COLUMNS,
            filter.where_clause(),
            query.sort_column(),
            query.sort_direction(),
            filter.limit_offset()
        );
        let entities = bind_partner_filters!(sqlx::query_as::<_, ProviderEntity>(&list_sql), query)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Finds a provider by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Provider>, sqlx::Error> {
        let timer = QueryTimer::new("find_provider_by_id");
        let sql = format!("SELECT {} FROM providers WHERE id = $1", PROVIDER_COLUMNS);
        let result = sqlx::query_as::<_, ProviderEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts a provider. Names are unique case-insensitively.
    pub async fn create(&self, req: &CreateProviderRequest) -> Result<Provider, sqlx::Error> {
        let timer = QueryTimer::new("create_provider");
        let sql = format!(
            r#"
            INSERT INTO providers (name, contact_name, email, phone, address, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PROVIDER_COLUMNS
        );
        let result = sqlx::query_as::<_, ProviderEntity>(&sql)
            .bind(req.name.trim())
            .bind(&req.contact_name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(req.is_active)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        Ok(result?.into())
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateProviderRequest,
    ) -> Result<Option<Provider>, sqlx::Error> {
        let timer = QueryTimer::new("update_provider");
        let sql = format!(
            r#"
            UPDATE providers SET
                name = COALESCE($2, name),
                contact_name = COALESCE($3, contact_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROVIDER_COLUMNS
        );
        let result = sqlx::query_as::<_, ProviderEntity>(&sql)
            .bind(id)
            .bind(req.name.as_deref().map(str::trim))
            .bind(&req.contact_name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// All provider names and ids, for import lookups.
    pub async fn name_index(&self) -> Result<Vec<(String, Uuid)>, sqlx::Error> {
        let timer = QueryTimer::new("provider_name_index");
        let result = sqlx::query_as::<_, NameIdEntity>("SELECT id, name FROM providers")
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(|e| (e.name, e.id)).collect())
    }

    /// Id of the provider named `name` (case-insensitive), creating it if missing.
    pub async fn find_or_create(&self, name: &str) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("find_or_create_provider");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO providers (name)
            VALUES ($1)
            ON CONFLICT ((LOWER(name))) DO UPDATE SET name = providers.name
            RETURNING id
            "#,
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
