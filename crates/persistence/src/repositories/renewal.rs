//! Renewal repository.
//!
//! Every write that touches the parent contract (opening a renewal,
//! completing or deleting it) or guards on the renewal stage runs in one
//! transaction with the renewal row locked.

use chrono::NaiveDate;
use domain::models::{
    AdvanceRenewalRequest, ContractRenewal, HumanitarianRenewalQuery, RenewalGates,
    RenewalListItem, RenewalSubStatus, UpdateRenewalRequest,
};
use domain::services::RenewalSnapshot;
use shared::pagination::PageRequest;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::filter::{like_pattern, FilterBuilder};
use crate::entities::{RenewalEntity, RenewalListEntity, RenewalLockEntity};
use crate::metrics::QueryTimer;

const RENEWAL_COLUMNS: &str = r#"
    r.id, r.contract_id, r.humanitarian_org_id,
    r.documents_received, r.legal_approved, r.financial_approved, r.signature_received,
    r.sub_status, r.progress_percentage,
    r.proposed_start_date, r.proposed_end_date, r.proposed_revenue,
    r.comments, r.internal_notes, r.created_by_id, r.created_at, r.updated_at
"#;

const LIST_FROM: &str = r#"
    FROM contract_renewals r
    JOIN contracts c ON c.id = r.contract_id
    LEFT JOIN humanitarian_orgs h ON h.id = r.humanitarian_org_id
"#;

/// Which renewals a caller may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalScope {
    /// Renewals of provider and parking contracts.
    Contract,
    /// Renewals tied to a humanitarian organization.
    Humanitarian,
}

impl RenewalScope {
    fn predicate(self) -> &'static str {
        match self {
            RenewalScope::Contract => "r.humanitarian_org_id IS NULL",
            RenewalScope::Humanitarian => "r.humanitarian_org_id IS NOT NULL",
        }
    }
}

/// Values for a new renewal.
#[derive(Debug, Clone)]
pub struct NewRenewal {
    pub contract_id: Uuid,
    pub humanitarian_org_id: Option<Uuid>,
    pub proposed_start_date: NaiveDate,
    pub proposed_end_date: NaiveDate,
    pub proposed_revenue: Option<f64>,
    pub comments: Option<String>,
    pub created_by: Uuid,
}

/// A renewal together with its contract number.
#[derive(Debug, Clone)]
pub struct CreatedRenewal {
    pub renewal: ContractRenewal,
    pub contract_number: String,
}

/// How a renewal is being changed.
#[derive(Debug, Clone, Copy)]
pub enum RenewalChange<'a> {
    /// Gate flags and fields from a partial update.
    Patch(&'a UpdateRenewalRequest),
    /// Jump to a stage, appending a note.
    Advance(&'a AdvanceRenewalRequest),
}

/// Result of [`RenewalRepository::apply_change`].
#[derive(Debug, Clone)]
pub struct RenewalUpdate {
    pub renewal: ContractRenewal,
    pub previous_stage: RenewalSubStatus,
    pub contract_number: String,
    /// The renewal reached final processing and the contract became ACTIVE.
    pub contract_activated: bool,
}

impl RenewalUpdate {
    pub fn stage_changed(&self) -> bool {
        self.previous_stage != self.renewal.sub_status
    }
}

/// Result of a single delete.
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalDeletion {
    Deleted {
        contract_id: Uuid,
        contract_number: String,
        humanitarian: bool,
        /// The contract left RENEWAL_IN_PROGRESS because no renewal remains.
        contract_restored: bool,
    },
    NotFound,
    /// Renewal is in final processing; nothing was deleted.
    Locked { contract_number: String },
}

/// Result of a bulk delete.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkRenewalDeletion {
    Deleted {
        count: u64,
        contract_numbers: Vec<String>,
        /// Contracts moved back out of RENEWAL_IN_PROGRESS.
        contracts_restored: u64,
    },
    /// At least one renewal is in final processing; nothing was deleted.
    Locked { contract_numbers: Vec<String> },
}

fn build_humanitarian_filter(query: &HumanitarianRenewalQuery) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    filter.push_static("r.humanitarian_org_id IS NOT NULL");
    if query.humanitarian_org_id.is_some() {
        filter.push("r.humanitarian_org_id = {}");
    }
    if query.sub_status.is_some() {
        filter.push("r.sub_status = {}");
    }
    if query.search.is_some() {
        filter.push("(c.contract_number ILIKE {} OR c.name ILIKE {} OR h.name ILIKE {})");
    }
    filter
}

macro_rules! bind_humanitarian_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(org_id) = $query.humanitarian_org_id {
            b = b.bind(org_id);
        }
        if let Some(sub_status) = $query.sub_status {
            b = b.bind(sub_status.as_str());
        }
        if let Some(ref search) = $query.search {
            b = b.bind(like_pattern(search));
        }
        b
    }};
}

/// Repository for contract and humanitarian renewals.
#[derive(Clone)]
pub struct RenewalRepository {
    pool: PgPool,
}

impl RenewalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a renewal and moves the contract to RENEWAL_IN_PROGRESS.
    ///
    /// Returns `None` when the contract does not exist.
    pub async fn create(&self, input: NewRenewal) -> Result<Option<CreatedRenewal>, sqlx::Error> {
        let timer = QueryTimer::new("create_renewal");
        let mut tx = self.pool.begin().await?;

        let contract_number: Option<String> = sqlx::query_scalar(
            "SELECT contract_number FROM contracts WHERE id = $1 FOR UPDATE",
        )
        .bind(input.contract_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(contract_number) = contract_number else {
            return Ok(None);
        };

        let gates = RenewalGates::default();
        let sql = format!(
            r#"
            INSERT INTO contract_renewals AS r (
                contract_id, humanitarian_org_id, sub_status, progress_percentage,
                proposed_start_date, proposed_end_date, proposed_revenue, comments, created_by_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            RENEWAL_COLUMNS
        );
        let entity = sqlx::query_as::<_, RenewalEntity>(&sql)
            .bind(input.contract_id)
            .bind(input.humanitarian_org_id)
            .bind(gates.sub_status().as_str())
            .bind(i16::from(gates.progress()))
            .bind(input.proposed_start_date)
            .bind(input.proposed_end_date)
            .bind(input.proposed_revenue)
            .bind(&input.comments)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE contracts SET status = 'RENEWAL_IN_PROGRESS', updated_at = NOW() WHERE id = $1",
        )
        .bind(input.contract_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        Ok(Some(CreatedRenewal {
            renewal: entity.into(),
            contract_number,
        }))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ContractRenewal>, sqlx::Error> {
        let timer = QueryTimer::new("find_renewal_by_id");
        let sql = format!("SELECT {} FROM contract_renewals r WHERE r.id = $1", RENEWAL_COLUMNS);
        let result = sqlx::query_as::<_, RenewalEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Most recently created renewal of a contract.
    pub async fn find_latest_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<ContractRenewal>, sqlx::Error> {
        let timer = QueryTimer::new("find_latest_renewal");
        let sql = format!(
            r#"
            SELECT {} FROM contract_renewals r
            WHERE r.contract_id = $1
            ORDER BY r.created_at DESC
            LIMIT 1
            "#,
            RENEWAL_COLUMNS
        );
        let result = sqlx::query_as::<_, RenewalEntity>(&sql)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Applies a patch or stage jump under a row lock.
    ///
    /// The stored `sub_status` and `progress_percentage` are always
    /// recomputed from the resulting gates. When the renewal newly reaches
    /// final processing the contract becomes ACTIVE and adopts the proposed
    /// dates and revenue.
    ///
    /// Returns `None` when the renewal does not exist in `scope`.
    pub async fn apply_change(
        &self,
        id: Uuid,
        scope: RenewalScope,
        change: RenewalChange<'_>,
    ) -> Result<Option<RenewalUpdate>, sqlx::Error> {
        let timer = QueryTimer::new("apply_renewal_change");
        let mut tx = self.pool.begin().await?;

        let lock_sql = format!(
            "SELECT {} FROM contract_renewals r WHERE r.id = $1 AND {} FOR UPDATE",
            RENEWAL_COLUMNS,
            scope.predicate()
        );
        let current = sqlx::query_as::<_, RenewalEntity>(&lock_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        let contract_number: String =
            sqlx::query_scalar("SELECT contract_number FROM contracts WHERE id = $1")
                .bind(current.contract_id)
                .fetch_one(&mut *tx)
                .await?;

        let previous_gates = current.gates();
        let (gates, start, end, revenue, comments, notes) = match change {
            RenewalChange::Patch(req) => (
                req.apply_gates(previous_gates),
                req.proposed_start_date.or(current.proposed_start_date),
                req.proposed_end_date.or(current.proposed_end_date),
                req.proposed_revenue.or(current.proposed_revenue),
                req.comments.clone().or_else(|| current.comments.clone()),
                req.internal_notes
                    .clone()
                    .or_else(|| current.internal_notes.clone()),
            ),
            RenewalChange::Advance(req) => (
                RenewalGates::for_stage(req.target_stage),
                current.proposed_start_date,
                current.proposed_end_date,
                current.proposed_revenue,
                current.comments.clone(),
                Some(req.append_note(current.internal_notes.as_deref())),
            ),
        };

        let update_sql = format!(
            r#"
            UPDATE contract_renewals AS r SET
                documents_received = $2,
                legal_approved = $3,
                financial_approved = $4,
                signature_received = $5,
                sub_status = $6,
                progress_percentage = $7,
                proposed_start_date = $8,
                proposed_end_date = $9,
                proposed_revenue = $10,
                comments = $11,
                internal_notes = $12,
                updated_at = NOW()
            WHERE r.id = $1
            RETURNING {}
            "#,
            RENEWAL_COLUMNS
        );
        let entity = sqlx::query_as::<_, RenewalEntity>(&update_sql)
            .bind(id)
            .bind(gates.documents_received)
            .bind(gates.legal_approved)
            .bind(gates.financial_approved)
            .bind(gates.signature_received)
            .bind(gates.sub_status().as_str())
            .bind(i16::from(gates.progress()))
            .bind(start)
            .bind(end)
            .bind(revenue)
            .bind(&comments)
            .bind(&notes)
            .fetch_one(&mut *tx)
            .await?;

        let contract_activated = gates.is_final() && !previous_gates.is_final();
        if contract_activated {
            activate_contract(&mut tx, &entity).await?;
        }

        tx.commit().await?;
        timer.record();

        Ok(Some(RenewalUpdate {
            renewal: entity.into(),
            previous_stage: previous_gates.sub_status(),
            contract_number,
            contract_activated,
        }))
    }

    /// Deletes a renewal unless it is in final processing.
    ///
    /// When it was the contract's last renewal, the contract leaves
    /// RENEWAL_IN_PROGRESS in the same transaction.
    pub async fn delete(
        &self,
        id: Uuid,
        scope: RenewalScope,
    ) -> Result<RenewalDeletion, sqlx::Error> {
        let timer = QueryTimer::new("delete_renewal");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT r.contract_id, r.humanitarian_org_id, c.contract_number,
                   r.documents_received, r.legal_approved, r.financial_approved, r.signature_received
            FROM contract_renewals r
            JOIN contracts c ON c.id = r.contract_id
            WHERE r.id = $1 AND {}
            FOR UPDATE OF r
            "#,
            scope.predicate()
        );
        let row = sqlx::query_as::<_, (Uuid, Option<Uuid>, String, bool, bool, bool, bool)>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((contract_id, org_id, contract_number, docs, legal, financial, signature)) = row
        else {
            return Ok(RenewalDeletion::NotFound);
        };

        let gates = RenewalGates {
            documents_received: docs,
            legal_approved: legal,
            financial_approved: financial,
            signature_received: signature,
        };
        if gates.is_final() {
            tx.rollback().await?;
            return Ok(RenewalDeletion::Locked { contract_number });
        }

        sqlx::query("DELETE FROM contract_renewals WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let restored = restore_contracts(&mut tx, &[contract_id]).await?;
        tx.commit().await?;
        timer.record();

        Ok(RenewalDeletion::Deleted {
            contract_id,
            contract_number,
            humanitarian: org_id.is_some(),
            contract_restored: restored > 0,
        })
    }

    /// Deletes a set of renewals atomically.
    ///
    /// The rows are locked first; if any of them is in final processing the
    /// transaction is rolled back and the blocking contract numbers returned.
    /// Ids outside `scope` are ignored.
    pub async fn bulk_delete(
        &self,
        ids: &[Uuid],
        scope: RenewalScope,
    ) -> Result<BulkRenewalDeletion, sqlx::Error> {
        let timer = QueryTimer::new("bulk_delete_renewals");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT r.id, r.contract_id, c.contract_number,
                   r.documents_received, r.legal_approved, r.financial_approved, r.signature_received
            FROM contract_renewals r
            JOIN contracts c ON c.id = r.contract_id
            WHERE r.id = ANY($1) AND {}
            ORDER BY r.id
            FOR UPDATE OF r
            "#,
            scope.predicate()
        );
        let rows = sqlx::query_as::<_, RenewalLockEntity>(&sql)
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;

        let locked: Vec<String> = rows
            .iter()
            .filter(|r| r.is_final())
            .map(|r| r.contract_number.clone())
            .collect();
        if !locked.is_empty() {
            tx.rollback().await?;
            return Ok(BulkRenewalDeletion::Locked {
                contract_numbers: locked,
            });
        }

        let found: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let result = sqlx::query("DELETE FROM contract_renewals WHERE id = ANY($1)")
            .bind(&found)
            .execute(&mut *tx)
            .await?;
        let contract_ids: Vec<Uuid> = rows.iter().map(|r| r.contract_id).collect();
        let contracts_restored = restore_contracts(&mut tx, &contract_ids).await?;
        tx.commit().await?;
        timer.record();

        Ok(BulkRenewalDeletion::Deleted {
            count: result.rows_affected(),
            contract_numbers: rows.into_iter().map(|r| r.contract_number).collect(),
            contracts_restored,
        })
    }

    /// Paginated humanitarian renewals, newest first.
    pub async fn list_humanitarian(
        &self,
        query: &HumanitarianRenewalQuery,
        page: PageRequest,
    ) -> Result<(Vec<RenewalListItem>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_humanitarian_renewals");
        let filter = build_humanitarian_filter(query);

        let count_sql = format!("SELECT COUNT(*) {} WHERE {}", LIST_FROM, filter.where_clause());
        let total: i64 =
            bind_humanitarian_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
                .fetch_one(&self.pool)
                .await?;

        let list_sql = format!(
            r#"
            SELECT {}, c.contract_number, c.name AS contract_name,
                   c.end_date AS contract_end_date, h.name AS organization_name
            {}
            WHERE {}
            ORDER BY r.created_at DESC
            {}
            "#,
            RENEWAL_COLUMNS,
            LIST_FROM,
            filter.where_clause(),
            filter.limit_offset()
        );
        let entities =
            bind_humanitarian_filters!(sqlx::query_as::<_, RenewalListEntity>(&list_sql), query)
                .bind(page.limit_i64())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Every humanitarian renewal, reduced to what the statistics need.
    pub async fn humanitarian_snapshots(&self) -> Result<Vec<RenewalSnapshot>, sqlx::Error> {
        let timer = QueryTimer::new("humanitarian_renewal_snapshots");
        let sql = format!(
            r#"
            SELECT {}, c.contract_number, c.name AS contract_name,
                   c.end_date AS contract_end_date, h.name AS organization_name
            {}
            WHERE r.humanitarian_org_id IS NOT NULL
            "#,
            RENEWAL_COLUMNS, LIST_FROM
        );
        let result = sqlx::query_as::<_, RenewalListEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}

/// Moves contracts that are RENEWAL_IN_PROGRESS but have no renewal left
/// back to ACTIVE, or EXPIRED when their end date has passed.
async fn restore_contracts(
    tx: &mut Transaction<'_, Postgres>,
    contract_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE contracts c SET
            status = CASE WHEN c.end_date < CURRENT_DATE THEN 'EXPIRED' ELSE 'ACTIVE' END,
            updated_at = NOW()
        WHERE c.id = ANY($1)
          AND c.status = 'RENEWAL_IN_PROGRESS'
          AND NOT EXISTS (SELECT 1 FROM contract_renewals r WHERE r.contract_id = c.id)
        "#,
    )
    .bind(contract_ids)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

async fn activate_contract(
    tx: &mut Transaction<'_, Postgres>,
    renewal: &RenewalEntity,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE contracts SET
            status = 'ACTIVE',
            start_date = COALESCE($2, start_date),
            end_date = COALESCE($3, end_date),
            revenue_percentage = COALESCE($4, revenue_percentage),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(renewal.contract_id)
    .bind(renewal.proposed_start_date)
    .bind(renewal.proposed_end_date)
    .bind(renewal.proposed_revenue)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
