//! Contract repository, including the expiry scan.

use chrono::NaiveDate;
use domain::models::{
    Contract, ContractExportQuery, ContractQuery, ContractStatus, CreateContractRequest,
    ExpiringContract, ExpiryCandidate, UpdateContractRequest,
};
use domain::services::{sort_expiring, ExpiryWindow};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::{like_pattern, FilterBuilder};
use crate::entities::{ContractEntity, ExpiringContractEntity, ExpiryCandidateEntity};
use crate::metrics::QueryTimer;

const CONTRACT_COLUMNS: &str = r#"
    c.id, c.contract_number, c.name, c.contract_type, c.status, c.start_date, c.end_date,
    c.revenue_percentage, c.is_revenue_sharing, c.operator_revenue, c.description,
    c.provider_id, c.humanitarian_org_id, c.parking_service_id,
    COALESCE(p.name, h.name, ps.name) AS partner_name,
    c.created_by_id, c.created_at, c.updated_at
"#;

const PARTNER_JOINS: &str = r#"
    LEFT JOIN providers p ON p.id = c.provider_id
    LEFT JOIN humanitarian_orgs h ON h.id = c.humanitarian_org_id
    LEFT JOIN parking_services ps ON ps.id = c.parking_service_id
"#;

const CANDIDATE_SELECT: &str = r#"
    SELECT c.id, c.contract_number, c.name, c.contract_type, c.status, c.end_date,
           COALESCE(p.name, h.name, ps.name) AS partner_name,
           EXISTS (SELECT 1 FROM contract_renewals r WHERE r.contract_id = c.id) AS has_renewal
    FROM contracts c
    LEFT JOIN providers p ON p.id = c.provider_id
    LEFT JOIN humanitarian_orgs h ON h.id = c.humanitarian_org_id
    LEFT JOIN parking_services ps ON ps.id = c.parking_service_id
"#;

const SEARCH_CONDITION: &str =
    "(c.contract_number ILIKE {} OR c.name ILIKE {} OR COALESCE(p.name, h.name, ps.name) ILIKE {})";

fn build_list_filter(query: &ContractQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if query.status.is_some() {
        filter.push("c.status = {}");
    }
    if query.contract_type.is_some() {
        filter.push("c.contract_type = {}");
    }
    if query.provider_id.is_some() {
        filter.push("c.provider_id = {}");
    }
    if query.humanitarian_org_id.is_some() {
        filter.push("c.humanitarian_org_id = {}");
    }
    if query.parking_service_id.is_some() {
        filter.push("c.parking_service_id = {}");
    }
    if query.search.is_some() {
        filter.push(SEARCH_CONDITION);
    }
    filter
}

macro_rules! bind_list_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(status) = $query.status {
            b = b.bind(status.as_str());
        }
        if let Some(contract_type) = $query.contract_type {
            b = b.bind(contract_type.as_str());
        }
        if let Some(id) = $query.provider_id {
            b = b.bind(id);
        }
        if let Some(id) = $query.humanitarian_org_id {
            b = b.bind(id);
        }
        if let Some(id) = $query.parking_service_id {
            b = b.bind(id);
        }
        if let Some(ref search) = $query.search {
            b = b.bind(like_pattern(search));
        }
        b
    }};
}

fn build_export_filter(query: &ContractExportQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    if query.status.is_some() {
        filter.push("c.status = {}");
    }
    if query.contract_type.is_some() {
        filter.push("c.contract_type = {}");
    }
    if query.search.is_some() {
        filter.push(SEARCH_CONDITION);
    }
    if query.expiring_within.is_some() {
        filter.push("c.end_date <= {}");
        if !query.include_expired {
            filter.push("c.end_date >= {}");
        }
    }
    if !query.include_expired {
        filter.push_static("c.status <> 'EXPIRED'");
    }
    filter
}

/// Repository for contracts.
#[derive(Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Contract>, sqlx::Error> {
        let timer = QueryTimer::new("find_contract_by_id");
        let sql = format!(
            "SELECT {} FROM contracts c {} WHERE c.id = $1",
            CONTRACT_COLUMNS, PARTNER_JOINS
        );
        let result = sqlx::query_as::<_, ContractEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts a contract. A duplicate contract number surfaces as a unique
    /// violation.
    pub async fn create(
        &self,
        req: &CreateContractRequest,
        created_by: Uuid,
    ) -> Result<Contract, sqlx::Error> {
        let timer = QueryTimer::new("create_contract");
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO contracts (
                contract_number, name, contract_type, status, start_date, end_date,
                revenue_percentage, is_revenue_sharing, operator_revenue, description,
                provider_id, humanitarian_org_id, parking_service_id, created_by_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(req.contract_number.trim())
        .bind(req.name.trim())
        .bind(req.contract_type.as_str())
        .bind(req.status.unwrap_or(ContractStatus::Draft).as_str())
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.revenue_percentage)
        .bind(req.is_revenue_sharing)
        .bind(req.operator_revenue)
        .bind(&req.description)
        .bind(req.provider_id)
        .bind(req.humanitarian_org_id)
        .bind(req.parking_service_id)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        self.find_by_id(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Applies a partial update. Returns `None` when the contract does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateContractRequest,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let timer = QueryTimer::new("update_contract");
        let updated = sqlx::query(
            r#"
            UPDATE contracts SET
                name = COALESCE($2, name),
                start_date = COALESCE($3, start_date),
                end_date = COALESCE($4, end_date),
                revenue_percentage = COALESCE($5, revenue_percentage),
                is_revenue_sharing = COALESCE($6, is_revenue_sharing),
                operator_revenue = COALESCE($7, operator_revenue),
                description = COALESCE($8, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.revenue_percentage)
        .bind(req.is_revenue_sharing)
        .bind(req.operator_revenue)
        .bind(&req.description)
        .execute(&self.pool)
        .await?;
        timer.record();

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let timer = QueryTimer::new("update_contract_status");
        let updated = sqlx::query(
            "UPDATE contracts SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        timer.record();

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Paginated list ordered by end date.
    pub async fn list(
        &self,
        query: &ContractQuery,
        page: PageRequest,
    ) -> Result<(Vec<Contract>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_contracts");
        let filter = build_list_filter(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM contracts c {} WHERE {}",
            PARTNER_JOINS,
            filter.where_clause()
        );
        let total: i64 = bind_list_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {} FROM contracts c {} WHERE {} ORDER BY c.end_date ASC, c.contract_number ASC {}",
            CONTRACT_COLUMNS,
            PARTNER_JOINS,
            filter.where_clause(),
            filter.limit_offset()
        );
        let entities = bind_list_filters!(sqlx::query_as::<_, ContractEntity>(&list_sql), query)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Every contract matching the export filters, soonest end date first.
    pub async fn list_for_export(
        &self,
        query: &ContractExportQuery,
        today: NaiveDate,
    ) -> Result<Vec<Contract>, sqlx::Error> {
        let timer = QueryTimer::new("list_contracts_for_export");
        let filter = build_export_filter(query);
        let sql = format!(
            "SELECT {} FROM contracts c {} WHERE {} ORDER BY c.end_date ASC, c.created_at DESC",
            CONTRACT_COLUMNS,
            PARTNER_JOINS,
            filter.where_clause()
        );

        let mut builder = sqlx::query_as::<_, ContractEntity>(&sql);
        if let Some(status) = query.status {
            builder = builder.bind(status.as_str());
        }
        if let Some(contract_type) = query.contract_type {
            builder = builder.bind(contract_type.as_str());
        }
        if let Some(ref search) = query.search {
            builder = builder.bind(like_pattern(search));
        }
        if let Some(days) = query.expiring_within {
            builder = builder.bind(today + chrono::Duration::days(days));
            if !query.include_expired {
                builder = builder.bind(today);
            }
        }
        let result = builder.fetch_all(&self.pool).await;
        timer.record();

        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Contracts inside the expiry window, each with partner, creator and
    /// latest renewal, ordered by [`sort_expiring`].
    pub async fn find_expiring(
        &self,
        window: &ExpiryWindow,
    ) -> Result<Vec<ExpiringContract>, sqlx::Error> {
        let timer = QueryTimer::new("find_expiring_contracts");
        let result = sqlx::query_as::<_, ExpiringContractEntity>(
            r#"
            SELECT
                c.id, c.contract_number, c.name, c.contract_type, c.status,
                c.start_date, c.end_date,
                COALESCE(c.provider_id, c.humanitarian_org_id, c.parking_service_id) AS partner_id,
                COALESCE(p.name, h.name, ps.name) AS partner_name,
                u.name AS created_by_name,
                u.email AS created_by_email,
                r.id AS renewal_id,
                r.sub_status AS renewal_sub_status,
                r.progress_percentage AS renewal_progress,
                r.created_at AS renewal_created_at
            FROM contracts c
            LEFT JOIN providers p ON p.id = c.provider_id
            LEFT JOIN humanitarian_orgs h ON h.id = c.humanitarian_org_id
            LEFT JOIN parking_services ps ON ps.id = c.parking_service_id
            LEFT JOIN users u ON u.id = c.created_by_id
            LEFT JOIN LATERAL (
                SELECT id, sub_status, progress_percentage, created_at
                FROM contract_renewals
                WHERE contract_id = c.id
                ORDER BY created_at DESC
                LIMIT 1
            ) r ON TRUE
            WHERE (c.status = 'ACTIVE' AND c.end_date BETWEEN $1 AND $2)
               OR (c.status = 'EXPIRED' AND c.end_date >= $3 AND c.end_date < $1)
               OR c.status = 'RENEWAL_IN_PROGRESS'
            "#,
        )
        .bind(window.today)
        .bind(window.horizon())
        .bind(window.lookback())
        .fetch_all(&self.pool)
        .await;
        timer.record();

        let mut rows: Vec<ExpiringContract> = result?
            .into_iter()
            .map(|e| e.into_domain(window.today))
            .collect();
        sort_expiring(&mut rows);
        Ok(rows)
    }

    /// Every contract ending on or before `until`.
    pub async fn ending_by(&self, until: NaiveDate) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
        let timer = QueryTimer::new("contracts_ending_by");
        let sql = format!("{} WHERE c.end_date <= $1 ORDER BY c.end_date", CANDIDATE_SELECT);
        let result = sqlx::query_as::<_, ExpiryCandidateEntity>(&sql)
            .bind(until)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Active, expired and renewing contracts ending within `[first, last]`.
    pub async fn ending_between(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
        let timer = QueryTimer::new("contracts_ending_between");
        let sql = format!(
            r#"{}
            WHERE c.end_date BETWEEN $1 AND $2
              AND c.status IN ('ACTIVE', 'EXPIRED', 'RENEWAL_IN_PROGRESS')
            ORDER BY c.end_date"#,
            CANDIDATE_SELECT
        );
        let result = sqlx::query_as::<_, ExpiryCandidateEntity>(&sql)
            .bind(first)
            .bind(last)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
