//! Financial and sales analytics handlers.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use domain::models::{FinancialMetrics, FinancialQuery, Permission, SalesMetrics};
use domain::services::{aggregate_financials, aggregate_sales, previous_window, resolve_window};
use persistence::repositories::{RevenueFilter, VasServiceRepository};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiQuery, UserAuth};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/financials", get(financials))
        .route("/sales", get(sales))
}

fn revenue_filter(
    query: &FinancialQuery,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> RevenueFilter {
    RevenueFilter {
        start: Some(start),
        end: Some(end),
        service_type: query.service_type.clone(),
        provider_id: query.provider_id,
    }
}

/// Revenue totals, monthly series and breakdowns over VAS billing data.
///
/// GET /api/analytics/financials?startDate&endDate&serviceType&providerId
async fn financials(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<FinancialQuery>,
) -> Result<Json<FinancialMetrics>, ApiError> {
    user.require(Permission::ViewFinancialAnalytics)?;

    let (start, end) = resolve_window(&query, Utc::now())?;
    let (start, end) = (start.date_naive(), end.date_naive());

    let rows = VasServiceRepository::new(state.pool.clone())
        .revenue_rows(&revenue_filter(&query, start, end))
        .await?;
    debug!(rows = rows.len(), %start, %end, "Aggregating financial data");

    Ok(Json(aggregate_financials(&rows, start, end)))
}

/// Transaction volumes with growth against the preceding period.
///
/// GET /api/analytics/sales?startDate&endDate&serviceType&providerId
async fn sales(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<FinancialQuery>,
) -> Result<Json<SalesMetrics>, ApiError> {
    user.require(Permission::ViewFinancialAnalytics)?;

    let (start, end) = resolve_window(&query, Utc::now())?;
    let (previous_start, previous_end) = previous_window(start, end);
    let (start, end) = (start.date_naive(), end.date_naive());

    let repo = VasServiceRepository::new(state.pool.clone());
    let rows = repo.revenue_rows(&revenue_filter(&query, start, end)).await?;
    let previous = repo
        .period_totals(&revenue_filter(
            &query,
            previous_start.date_naive(),
            previous_end.date_naive(),
        ))
        .await?;
    debug!(rows = rows.len(), %start, %end, "Aggregating sales data");

    Ok(Json(aggregate_sales(&rows, start, end, previous)))
}
