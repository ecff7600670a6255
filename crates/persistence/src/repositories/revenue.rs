//! Repositories for imported revenue records.
//!
//! VAS and parking rows are upserted on their natural keys; the returned
//! `xmax = 0` flag tells an insert from an update.

use chrono::NaiveDate;
use domain::models::{
    BulkServiceRecord, ParkingTransaction, PeriodTotals, RevenueRow, VasServiceRecord,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::FilterBuilder;
use crate::entities::{PeriodTotalsEntity, RevenueRowEntity, UpsertOutcomeEntity};
use crate::metrics::QueryTimer;

/// Whether an upsert created a new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl From<UpsertOutcomeEntity> for UpsertOutcome {
    fn from(e: UpsertOutcomeEntity) -> Self {
        if e.inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        }
    }
}

/// Filters applied to the financial dashboard rows.
#[derive(Debug, Clone, Default)]
pub struct RevenueFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub service_type: Option<String>,
    pub provider_id: Option<Uuid>,
}

fn build_revenue_filter(filter: &RevenueFilter) -> FilterBuilder {
    let mut builder = FilterBuilder::new();
    if filter.start.is_some() {
        builder.push("v.mesec_pruzanja_usluge >= {}");
    }
    if filter.end.is_some() {
        builder.push("v.mesec_pruzanja_usluge <= {}");
    }
    if filter.service_type.is_some() {
        builder.push("UPPER(s.service_type) = UPPER({})");
    }
    if filter.provider_id.is_some() {
        builder.push("v.provider_id = {}");
    }
    builder
}

#[derive(Clone)]
pub struct VasServiceRepository {
    pool: PgPool,
}

impl VasServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes the row for `(proizvod, month, provider)`.
    pub async fn upsert(&self, record: &VasServiceRecord) -> Result<UpsertOutcome, sqlx::Error> {
        let timer = QueryTimer::new("upsert_vas_service");
        let result = sqlx::query_as::<_, UpsertOutcomeEntity>(
            r#"
            INSERT INTO vas_services (
                proizvod, mesec_pruzanja_usluge, jedinicna_cena, broj_transakcija,
                fakturisan_iznos, fakturisan_korigovan_iznos, naplacen_iznos,
                kumulativ_naplacenih_iznosa, nenaplacen_iznos, nenaplacen_korigovan_iznos,
                storniran_iznos, otkazan_iznos, kumulativ_otkazanih_iznosa,
                iznos_za_prenos_sredstava, provider_id, service_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (proizvod, mesec_pruzanja_usluge, provider_id) DO UPDATE SET
                jedinicna_cena = EXCLUDED.jedinicna_cena,
                broj_transakcija = EXCLUDED.broj_transakcija,
                fakturisan_iznos = EXCLUDED.fakturisan_iznos,
                fakturisan_korigovan_iznos = EXCLUDED.fakturisan_korigovan_iznos,
                naplacen_iznos = EXCLUDED.naplacen_iznos,
                kumulativ_naplacenih_iznosa = EXCLUDED.kumulativ_naplacenih_iznosa,
                nenaplacen_iznos = EXCLUDED.nenaplacen_iznos,
                nenaplacen_korigovan_iznos = EXCLUDED.nenaplacen_korigovan_iznos,
                storniran_iznos = EXCLUDED.storniran_iznos,
                otkazan_iznos = EXCLUDED.otkazan_iznos,
                kumulativ_otkazanih_iznosa = EXCLUDED.kumulativ_otkazanih_iznosa,
                iznos_za_prenos_sredstava = EXCLUDED.iznos_za_prenos_sredstava,
                service_id = EXCLUDED.service_id,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.proizvod)
        .bind(record.mesec_pruzanja_usluge)
        .bind(record.jedinicna_cena)
        .bind(record.broj_transakcija)
        .bind(record.fakturisan_iznos)
        .bind(record.fakturisan_korigovan_iznos)
        .bind(record.naplacen_iznos)
        .bind(record.kumulativ_naplacenih_iznosa)
        .bind(record.nenaplacen_iznos)
        .bind(record.nenaplacen_korigovan_iznos)
        .bind(record.storniran_iznos)
        .bind(record.otkazan_iznos)
        .bind(record.kumulativ_otkazanih_iznosa)
        .bind(record.iznos_za_prenos_sredstava)
        .bind(record.provider_id)
        .bind(record.service_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    /// Dashboard rows: billed, collected, uncollected and canceled amounts per
    /// VAS row, joined with the service type and provider name.
    pub async fn revenue_rows(&self, filter: &RevenueFilter) -> Result<Vec<RevenueRow>, sqlx::Error> {
        let timer = QueryTimer::new("vas_revenue_rows");
        let builder = build_revenue_filter(filter);
        let sql = format!(
            r#"
            SELECT
                v.mesec_pruzanja_usluge AS billing_month,
                s.service_type,
                v.provider_id,
                p.name AS provider_name,
                v.broj_transakcija AS transactions,
                v.fakturisan_iznos AS billed,
                v.naplacen_iznos AS collected,
                v.nenaplacen_iznos AS uncollected,
                v.otkazan_iznos AS canceled
            FROM vas_services v
            JOIN services s ON s.id = v.service_id
            JOIN providers p ON p.id = v.provider_id
            WHERE {}
            ORDER BY v.mesec_pruzanja_usluge
            "#,
            builder.where_clause()
        );

        let mut query = sqlx::query_as::<_, RevenueRowEntity>(&sql);
        if let Some(start) = filter.start {
            query = query.bind(start);
        }
        if let Some(end) = filter.end {
            query = query.bind(end);
        }
        if let Some(ref service_type) = filter.service_type {
            query = query.bind(service_type);
        }
        if let Some(provider_id) = filter.provider_id {
            query = query.bind(provider_id);
        }
        let result = query.fetch_all(&self.pool).await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Transaction count and billed revenue of the rows matching `filter`.
    pub async fn period_totals(&self, filter: &RevenueFilter) -> Result<PeriodTotals, sqlx::Error> {
        let timer = QueryTimer::new("vas_period_totals");
        let builder = build_revenue_filter(filter);
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(v.broj_transakcija), 0)::BIGINT AS transactions,
                COALESCE(SUM(v.fakturisan_iznos), 0)::DOUBLE PRECISION AS revenue
            FROM vas_services v
            JOIN services s ON s.id = v.service_id
            WHERE {}
            "#,
            builder.where_clause()
        );

        let mut query = sqlx::query_as::<_, PeriodTotalsEntity>(&sql);
        if let Some(start) = filter.start {
            query = query.bind(start);
        }
        if let Some(end) = filter.end {
            query = query.bind(end);
        }
        if let Some(ref service_type) = filter.service_type {
            query = query.bind(service_type);
        }
        if let Some(provider_id) = filter.provider_id {
            query = query.bind(provider_id);
        }
        let result = query.fetch_one(&self.pool).await;
        timer.record();
        Ok(result?.into())
    }
}

#[derive(Clone)]
pub struct BulkServiceRepository {
    pool: PgPool,
}

impl BulkServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a batch of resolved bulk rows in one transaction.
    pub async fn insert_batch(&self, records: &[BulkServiceRecord]) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }
        let timer = QueryTimer::new("insert_bulk_services");
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO bulk_services (
                    provider_name, agreement_name, service_name, step_name, sender_name,
                    requests, message_parts, provider_id, service_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(&record.provider_name)
            .bind(&record.agreement_name)
            .bind(&record.service_name)
            .bind(&record.step_name)
            .bind(&record.sender_name)
            .bind(record.requests)
            .bind(record.message_parts)
            .bind(record.provider_id)
            .bind(record.service_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        timer.record();
        Ok(inserted)
    }
}

#[derive(Clone)]
pub struct ParkingTransactionRepository {
    pool: PgPool,
}

impl ParkingTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes the cell keyed by service, date, name and group.
    pub async fn upsert(&self, tx: &ParkingTransaction) -> Result<UpsertOutcome, sqlx::Error> {
        let timer = QueryTimer::new("upsert_parking_transaction");
        let result = sqlx::query_as::<_, UpsertOutcomeEntity>(
            r#"
            INSERT INTO parking_transactions (
                parking_service_id, service_id, transaction_date, transaction_group,
                service_name, price, quantity, amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (parking_service_id, transaction_date, service_name, transaction_group)
            DO UPDATE SET
                service_id = COALESCE(EXCLUDED.service_id, parking_transactions.service_id),
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity,
                amount = EXCLUDED.amount,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(tx.parking_service_id)
        .bind(tx.service_id)
        .bind(tx.date)
        .bind(&tx.group)
        .bind(&tx.service_name)
        .bind(tx.price)
        .bind(tx.quantity)
        .bind(tx.amount)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_filter_order() {
        let filter = RevenueFilter {
            start: NaiveDate::from_ymd_opt(2025, 1, 1),
            end: None,
            service_type: Some("vas".into()),
            provider_id: Some(Uuid::new_v4()),
        };
        let builder = build_revenue_filter(&filter);
        assert_eq!(
            builder.where_clause(),
            "v.mesec_pruzanja_usluge >= $1 AND UPPER(s.service_type) = UPPER($2) AND v.provider_id = $3"
        );
    }

    #[test]
    fn test_upsert_outcome() {
        assert_eq!(
            UpsertOutcome::from(UpsertOutcomeEntity { inserted: true }),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            UpsertOutcome::from(UpsertOutcomeEntity { inserted: false }),
            UpsertOutcome::Updated
        );
    }
}
