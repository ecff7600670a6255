//! Revenue record entities.

use chrono::NaiveDate;
use domain::models::{PeriodTotals, RevenueRow};
use sqlx::FromRow;
use uuid::Uuid;

/// VAS row reduced to the aggregator's columns, joined with service type and
/// provider name.
#[derive(Debug, Clone, FromRow)]
pub struct RevenueRowEntity {
    pub billing_month: NaiveDate,
    pub service_type: String,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub transactions: i64,
    pub billed: f64,
    pub collected: f64,
    pub uncollected: f64,
    pub canceled: f64,
}

impl From<RevenueRowEntity> for RevenueRow {
    fn from(e: RevenueRowEntity) -> Self {
        Self {
            billing_month: e.billing_month,
            service_type: e.service_type,
            provider_id: e.provider_id,
            provider_name: e.provider_name,
            transactions: e.transactions,
            billed: e.billed,
            collected: e.collected,
            uncollected: e.uncollected,
            canceled: e.canceled,
        }
    }
}

/// Sums over a whole period.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct PeriodTotalsEntity {
    pub transactions: i64,
    pub revenue: f64,
}

impl From<PeriodTotalsEntity> for PeriodTotals {
    fn from(e: PeriodTotalsEntity) -> Self {
        Self {
            transactions: e.transactions,
            revenue: e.revenue,
        }
    }
}

/// Result of an upsert: `inserted` is `xmax = 0` on the returned row.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct UpsertOutcomeEntity {
    pub inserted: bool,
}
