//! Financial dashboard aggregation over VAS revenue rows.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::{
    FinancialMetrics, FinancialQuery, GrowthRate, MonthlyRevenue, MonthlyTransactions,
    PeriodTotals, ProviderRevenue, ProviderTransactions, RevenueRow, SalesMetrics,
    ServiceTypeRevenue, ServiceTypeTransactions,
};

const TOP_PROVIDERS: usize = 10;

/// Effective `[start, end]` window of a financial query.
///
/// Defaults to one year back from `now` through `now`.
pub fn resolve_window(
    query: &FinancialQuery,
    now: DateTime<Utc>,
) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
    let end = query.end_date.unwrap_or(now);
    let start = query
        .start_date
        .unwrap_or_else(|| end.checked_sub_months(Months::new(12)).unwrap_or(end - Duration::days(365)));
    if start > end {
        return Err(DomainError::Validation(
            "startDate must not be after endDate".to_string(),
        ));
    }
    Ok((start, end))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of every calendar month between `start` and `end`, inclusive.
pub fn month_series(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut cursor = month_start(start);
    let last = month_start(end);
    while cursor <= last {
        months.push(cursor);
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    months
}

/// `MMM YY` label of a month, e.g. `Mar 25`.
pub fn month_label(month: NaiveDate) -> String {
    month.format("%b %y").to_string()
}

/// Unrounded share of `total`; zero when there is no total.
fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

/// Aggregates revenue rows that already passed the query filters.
pub fn aggregate_financials(
    rows: &[RevenueRow],
    start: NaiveDate,
    end: NaiveDate,
) -> FinancialMetrics {
    let months = month_series(start, end);
    let mut buckets: HashMap<NaiveDate, (f64, f64, f64)> =
        months.iter().map(|m| (*m, (0.0, 0.0, 0.0))).collect();

    let mut total_revenue = 0.0;
    let mut collected_revenue = 0.0;
    let mut outstanding_revenue = 0.0;
    let mut canceled_amount = 0.0;
    let mut by_type: HashMap<&str, f64> = HashMap::new();
    let mut by_provider: HashMap<Uuid, (&str, f64)> = HashMap::new();

    for row in rows {
        total_revenue += row.billed;
        collected_revenue += row.collected;
        outstanding_revenue += row.uncollected;
        canceled_amount += row.canceled;

        if let Some(bucket) = buckets.get_mut(&month_start(row.billing_month)) {
            bucket.0 += row.billed;
            bucket.1 += row.collected;
            bucket.2 += row.uncollected;
        }
        *by_type.entry(row.service_type.as_str()).or_insert(0.0) += row.billed;
        by_provider
            .entry(row.provider_id)
            .or_insert((row.provider_name.as_str(), 0.0))
            .1 += row.billed;
    }

    let revenue_by_month = months
        .iter()
        .map(|m| {
            let (revenue, collected, outstanding) = buckets.get(m).copied().unwrap_or_default();
            MonthlyRevenue {
                month: month_label(*m),
                revenue,
                collected,
                outstanding,
            }
        })
        .collect();

    let mut service_type_breakdown: Vec<ServiceTypeRevenue> = by_type
        .into_iter()
        .map(|(service_type, revenue)| ServiceTypeRevenue {
            service_type: service_type.to_string(),
            revenue,
            percentage: percentage(revenue, total_revenue),
        })
        .collect();
    service_type_breakdown.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.service_type.cmp(&b.service_type))
    });

    let mut provider_breakdown: Vec<ProviderRevenue> = by_provider
        .into_iter()
        .map(|(provider_id, (name, revenue))| ProviderRevenue {
            provider_id,
            provider_name: name.to_string(),
            revenue,
            percentage: percentage(revenue, total_revenue),
        })
        .collect();
    provider_breakdown.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.provider_name.cmp(&b.provider_name))
    });
    provider_breakdown.truncate(TOP_PROVIDERS);

    FinancialMetrics {
        total_revenue,
        collected_revenue,
        outstanding_revenue,
        canceled_amount,
        collection_rate: percentage(collected_revenue, total_revenue),
        revenue_by_month,
        service_type_breakdown,
        provider_breakdown,
    }
}

/// The period of equal length that ends the day before `start`.
pub fn previous_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let length = end - start;
    let previous_end = start - Duration::days(1);
    (previous_end - length, previous_end)
}

/// Percent change from `previous` to `current`.
///
/// Growth from nothing counts as 100 when anything happened, else 0.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Aggregates transaction counts for the sales dashboard.
pub fn aggregate_sales(
    rows: &[RevenueRow],
    start: NaiveDate,
    end: NaiveDate,
    previous: PeriodTotals,
) -> SalesMetrics {
    let months = month_series(start, end);
    let mut buckets: HashMap<NaiveDate, (i64, f64)> =
        months.iter().map(|m| (*m, (0, 0.0))).collect();
    let mut total_transactions = 0i64;
    let mut total_revenue = 0.0;
    let mut by_type: HashMap<&str, i64> = HashMap::new();
    let mut by_provider: HashMap<Uuid, (&str, i64, f64)> = HashMap::new();

    for row in rows {
        total_transactions += row.transactions;
        total_revenue += row.billed;
        if let Some(bucket) = buckets.get_mut(&month_start(row.billing_month)) {
            bucket.0 += row.transactions;
            bucket.1 += row.billed;
        }
        *by_type.entry(row.service_type.as_str()).or_insert(0) += row.transactions;
        let provider = by_provider
            .entry(row.provider_id)
            .or_insert((row.provider_name.as_str(), 0, 0.0));
        provider.1 += row.transactions;
        provider.2 += row.billed;
    }

    let transactions_by_month = months
        .iter()
        .map(|m| {
            let (transactions, revenue) = buckets.get(m).copied().unwrap_or_default();
            MonthlyTransactions {
                month: month_label(*m),
                transactions,
                revenue,
            }
        })
        .collect();

    let mut transactions_by_service_type: Vec<ServiceTypeTransactions> = by_type
        .into_iter()
        .map(|(service_type, transactions)| ServiceTypeTransactions {
            service_type: service_type.to_string(),
            transactions,
            percentage: percentage(transactions as f64, total_transactions as f64),
        })
        .collect();
    transactions_by_service_type.sort_by(|a, b| {
        b.transactions
            .cmp(&a.transactions)
            .then_with(|| a.service_type.cmp(&b.service_type))
    });

    let mut top_providers: Vec<ProviderTransactions> = by_provider
        .into_iter()
        .map(|(provider_id, (name, transactions, revenue))| ProviderTransactions {
            provider_id,
            provider_name: name.to_string(),
            transactions,
            revenue,
        })
        .collect();
    top_providers.sort_by(|a, b| {
        b.transactions
            .cmp(&a.transactions)
            .then_with(|| a.provider_name.cmp(&b.provider_name))
    });
    top_providers.truncate(TOP_PROVIDERS);

    let average_transaction_value = if total_transactions > 0 {
        total_revenue / total_transactions as f64
    } else {
        0.0
    };

    SalesMetrics {
        total_transactions,
        total_revenue,
        average_transaction_value,
        transactions_by_month,
        transactions_by_service_type,
        top_providers,
        growth_rate: GrowthRate {
            transactions_growth: growth(total_transactions as f64, previous.transactions as f64),
            revenue_growth: growth(total_revenue, previous.revenue),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(month: NaiveDate, service_type: &str, provider: Uuid, billed: f64) -> RevenueRow {
        RevenueRow {
            billing_month: month,
            service_type: service_type.to_string(),
            provider_id: provider,
            provider_name: format!("Provider {}", &provider.to_string()[..4]),
            transactions: (billed / 10.0) as i64,
            billed,
            collected: billed * 0.8,
            uncollected: billed * 0.2,
            canceled: 0.0,
        }
    }

    #[test]
    fn test_default_window_is_one_year() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let (start, end) = resolve_window(&FinancialQuery::default(), now).unwrap();
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let now = Utc::now();
        let query = FinancialQuery {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(
            resolve_window(&query, now),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_month_series_inclusive_and_zero_filled() {
        let metrics = aggregate_financials(
            &[row(date(2025, 2, 1), "SMS", Uuid::new_v4(), 100.0)],
            date(2024, 11, 20),
            date(2025, 3, 2),
        );
        let labels: Vec<_> = metrics.revenue_by_month.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["Nov 24", "Dec 24", "Jan 25", "Feb 25", "Mar 25"]);
        assert_eq!(metrics.revenue_by_month[0].revenue, 0.0);
        assert_eq!(metrics.revenue_by_month[3].revenue, 100.0);
    }

    #[test]
    fn test_service_type_breakdown() {
        let p = Uuid::new_v4();
        let rows = vec![
            row(date(2025, 1, 1), "A", p, 400.0),
            row(date(2025, 1, 1), "B", p, 300.0),
            row(date(2025, 2, 1), "A", p, 300.0),
        ];
        let metrics = aggregate_financials(&rows, date(2025, 1, 1), date(2025, 2, 28));
        assert_eq!(metrics.total_revenue, 1000.0);
        assert_eq!(metrics.service_type_breakdown.len(), 2);
        assert_eq!(metrics.service_type_breakdown[0].service_type, "A");
        assert_eq!(metrics.service_type_breakdown[0].revenue, 700.0);
        assert!((metrics.service_type_breakdown[0].percentage - 70.0).abs() < 1e-9);
        assert!((metrics.service_type_breakdown[1].percentage - 30.0).abs() < 1e-9);
        assert!((metrics.collection_rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_gives_zero_percentages() {
        let rows = vec![row(date(2025, 1, 1), "A", Uuid::new_v4(), 0.0)];
        let metrics = aggregate_financials(&rows, date(2025, 1, 1), date(2025, 1, 31));
        assert_eq!(metrics.collection_rate, 0.0);
        assert!(metrics
            .service_type_breakdown
            .iter()
            .all(|s| s.percentage == 0.0));
        assert!(metrics.provider_breakdown.iter().all(|p| p.percentage == 0.0));
    }

    #[test]
    fn test_provider_breakdown_top_ten() {
        let rows: Vec<_> = (1..=12)
            .map(|i| row(date(2025, 1, 1), "SMS", Uuid::new_v4(), f64::from(i) * 10.0))
            .collect();
        let metrics = aggregate_financials(&rows, date(2025, 1, 1), date(2025, 1, 31));
        assert_eq!(metrics.provider_breakdown.len(), 10);
        assert_eq!(metrics.provider_breakdown[0].revenue, 120.0);
        assert!(metrics
            .provider_breakdown
            .windows(2)
            .all(|w| w[0].revenue >= w[1].revenue));
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let p = Uuid::new_v4();
        let rows = vec![
            row(date(2025, 1, 1), "A", p, 1.0),
            row(date(2025, 1, 1), "B", p, 1.0),
            row(date(2025, 1, 1), "C", p, 1.0),
        ];
        let metrics = aggregate_financials(&rows, date(2025, 1, 1), date(2025, 1, 31));
        let sum: f64 = metrics.service_type_breakdown.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((metrics.service_type_breakdown[0].percentage - 100.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_previous_window_ends_day_before_start() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap();
        let (prev_start, prev_end) = previous_window(start, end);
        assert_eq!(prev_end, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(prev_end - prev_start, end - start);
    }

    #[test]
    fn test_growth_from_zero() {
        assert_eq!(growth(50.0, 0.0), 100.0);
        assert_eq!(growth(0.0, 0.0), 0.0);
        assert!((growth(150.0, 100.0) - 50.0).abs() < 1e-9);
        assert!((growth(50.0, 100.0) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_sales_aggregation() {
        let big = Uuid::new_v4();
        let small = Uuid::new_v4();
        let rows = vec![
            row(date(2025, 1, 1), "SMS", big, 300.0),
            row(date(2025, 2, 1), "SMS", big, 300.0),
            row(date(2025, 2, 1), "VOICE", small, 200.0),
        ];
        let previous = PeriodTotals {
            transactions: 40,
            revenue: 1000.0,
        };
        let sales = aggregate_sales(&rows, date(2025, 1, 1), date(2025, 3, 31), previous);

        assert_eq!(sales.total_transactions, 80);
        assert_eq!(sales.total_revenue, 800.0);
        assert!((sales.average_transaction_value - 10.0).abs() < 1e-9);
        assert_eq!(sales.transactions_by_month.len(), 3);
        assert_eq!(sales.transactions_by_month[1].transactions, 50);
        assert_eq!(sales.transactions_by_month[2].transactions, 0);
        assert_eq!(sales.transactions_by_service_type[0].service_type, "SMS");
        assert!((sales.transactions_by_service_type[0].percentage - 75.0).abs() < 1e-9);
        assert_eq!(sales.top_providers[0].provider_id, big);
        assert_eq!(sales.top_providers[0].revenue, 600.0);
        assert!((sales.growth_rate.transactions_growth - 100.0).abs() < 1e-9);
        assert!((sales.growth_rate.revenue_growth + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sales_without_transactions() {
        let sales = aggregate_sales(&[], date(2025, 1, 1), date(2025, 1, 31), PeriodTotals::default());
        assert_eq!(sales.average_transaction_value, 0.0);
        assert_eq!(sales.growth_rate, GrowthRate::default());
        assert!(sales.top_providers.is_empty());
    }
}
