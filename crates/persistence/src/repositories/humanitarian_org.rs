//! Humanitarian organisation repository.

use domain::models::{
    CreateHumanitarianOrgRequest, HumanitarianOrg, PartnerQuery, UpdateHumanitarianOrgRequest,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use super::provider::{bind_partner_filters, build_partner_filter};
use crate::entities::HumanitarianOrgEntity;
use crate::metrics::QueryTimer;

const ORG_COLUMNS: &str = r#"
    id, name, contact_person, email, phone, address, website, pib, registration_number,
    bank_account, short_number, mission, is_active, created_at, updated_at
"#;

/// Repository for humanitarian organizations.
#[derive(Clone)]
pub struct HumanitarianOrgRepository {
    pool: PgPool,
}

impl HumanitarianOrgRepository {
    /// Creates a new humanitarian organization repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated organizations matching the query.
    pub async fn list(
        &self,
        query: &PartnerQuery,
        page: PageRequest,
    ) -> Result<(Vec<HumanitarianOrg>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_humanitarian_orgs");
        let filter = build_partner_filter(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM humanitarian_orgs WHERE {}",
            filter.where_clause()
        );
        let total: i64 = bind_partner_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {} FROM humanitarian_orgs WHERE {} ORDER BY {} {} {}",
            ORG_COLUMNS,
            filter.where_clause(),
            query.sort_column(),
            query.sort_direction(),
            filter.limit_offset()
        );
        let entities =
            bind_partner_filters!(sqlx::query_as::<_, HumanitarianOrgEntity>(&list_sql), query)
                .bind(page.limit_i64())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Finds an organization by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<HumanitarianOrg>, sqlx::Error> {
        let timer = QueryTimer::new("find_humanitarian_org_by_id");
        let sql = format!("SELECT {} FROM humanitarian_orgs WHERE id = $1", ORG_COLUMNS);
        let result = sqlx::query_as::<_, HumanitarianOrgEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts an organization. Duplicate names surface as unique violations.
    pub async fn create(
        &self,
        req: &CreateHumanitarianOrgRequest,
    ) -> Result<HumanitarianOrg, sqlx::Error> {
        let timer = QueryTimer::new("create_humanitarian_org");
        let sql = format!(
            r#"
            INSERT INTO humanitarian_orgs (
                name, contact_person, email, phone, address, website, pib,
                registration_number, bank_account, short_number, mission, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            ORG_COLUMNS
        );
        let result = sqlx::query_as::<_, HumanitarianOrgEntity>(&sql)
            .bind(req.name.trim())
            .bind(&req.contact_person)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(&req.website)
            .bind(&req.pib)
            .bind(&req.registration_number)
            .bind(&req.bank_account)
            .bind(&req.short_number)
            .bind(&req.mission)
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
        req: &UpdateHumanitarianOrgRequest,
    ) -> Result<Option<HumanitarianOrg>, sqlx::Error> {
        let timer = QueryTimer::new("update_humanitarian_org");
        let sql = format!(
            r#"
            UPDATE humanitarian_orgs SET
                name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                website = COALESCE($7, website),
                pib = COALESCE($8, pib),
                registration_number = COALESCE($9, registration_number),
                bank_account = COALESCE($10, bank_account),
                short_number = COALESCE($11, short_number),
                mission = COALESCE($12, mission),
                is_active = COALESCE($13, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORG_COLUMNS
        );
        let result = sqlx::query_as::<_, HumanitarianOrgEntity>(&sql)
            .bind(id)
            .bind(req.name.as_deref().map(str::trim))
            .bind(&req.contact_person)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(&req.website)
            .bind(&req.pib)
            .bind(&req.registration_number)
            .bind(&req.bank_account)
            .bind(&req.short_number)
            .bind(&req.mission)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }
}
