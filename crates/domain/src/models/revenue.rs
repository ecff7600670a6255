//! Transactional revenue records and the financial dashboard shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One billing month of a VAS product for a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VasServiceRecord {
    pub proizvod: String,
    pub mesec_pruzanja_usluge: NaiveDate,
    pub jedinicna_cena: f64,
    pub broj_transakcija: i64,
    pub fakturisan_iznos: f64,
    pub fakturisan_korigovan_iznos: f64,
    pub naplacen_iznos: f64,
    pub kumulativ_naplacenih_iznosa: f64,
    pub nenaplacen_iznos: f64,
    pub nenaplacen_korigovan_iznos: f64,
    pub storniran_iznos: f64,
    pub otkazan_iznos: f64,
    pub kumulativ_otkazanih_iznosa: f64,
    pub iznos_za_prenos_sredstava: f64,
    pub provider_id: Uuid,
    pub service_id: Uuid,
}

/// One bulk messaging line keyed by provider/agreement/service/step/sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkServiceRecord {
    pub provider_name: String,
    pub agreement_name: String,
    pub service_name: String,
    pub step_name: String,
    pub sender_name: String,
    pub requests: i64,
    pub message_parts: i64,
    pub provider_id: Uuid,
    pub service_id: Uuid,
}

/// A VAS row reduced to what the aggregator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueRow {
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

/// Query of `GET /api/analytics/financials`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialQuery {
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "shared::validation::deserialize_optional_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    pub service_type: Option<String>,
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub collected: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeRevenue {
    pub service_type: String,
    pub revenue: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRevenue {
    pub provider_id: Uuid,
    pub provider_name: String,
    pub revenue: f64,
    pub percentage: f64,
}

/// Financial dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub total_revenue: f64,
    pub collected_revenue: f64,
    pub outstanding_revenue: f64,
    pub canceled_amount: f64,
    pub collection_rate: f64,
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub service_type_breakdown: Vec<ServiceTypeRevenue>,
    pub provider_breakdown: Vec<ProviderRevenue>,
}

/// Transaction count and billed revenue of a whole period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub transactions: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTransactions {
    pub month: String,
    pub transactions: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeTransactions {
    pub service_type: String,
    pub transactions: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTransactions {
    pub provider_id: Uuid,
    pub provider_name: String,
    pub transactions: i64,
    pub revenue: f64,
}

/// Change against the preceding period of equal length, in percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRate {
    pub transactions_growth: f64,
    pub revenue_growth: f64,
}

/// Sales dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesMetrics {
    pub total_transactions: i64,
    pub total_revenue: f64,
    pub average_transaction_value: f64,
    pub transactions_by_month: Vec<MonthlyTransactions>,
    pub transactions_by_service_type: Vec<ServiceTypeTransactions>,
    pub top_providers: Vec<ProviderTransactions>,
    pub growth_rate: GrowthRate,
}
