//! Complaint dashboard statistics.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::{
    ComplaintSnapshot, ComplaintStatistics, ComplaintStatisticsQuery, ComplaintStatus,
    ComplaintStatusCount, DailyCount, FinancialImpactSummary, NamedCount, PriorityCount,
    StatisticsPeriod,
};

/// Days covered by the trend series.
pub const TREND_DAYS: i64 = 30;

const UNKNOWN: &str = "Unknown";

/// Creation-time range the statistics cover; `None` means unbounded.
pub fn statistics_range(
    query: &ComplaintStatisticsQuery,
    now: DateTime<Utc>,
) -> DomainResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(DomainError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }
        return Ok(Some((start, end)));
    }

    let period = match query.period.as_deref() {
        None => StatisticsPeriod::Month,
        Some(raw) => raw.parse().map_err(DomainError::Validation)?,
    };
    let start = match period {
        StatisticsPeriod::Day => now - Duration::days(1),
        StatisticsPeriod::Week => now - Duration::days(7),
        StatisticsPeriod::Month => now
            .checked_sub_months(Months::new(1))
            .unwrap_or(now - Duration::days(30)),
        StatisticsPeriod::Year => now
            .checked_sub_months(Months::new(12))
            .unwrap_or(now - Duration::days(365)),
        StatisticsPeriod::All => return Ok(None),
    };
    Ok(Some((start, now)))
}

fn named_counts<'a>(
    entries: impl Iterator<Item = (Option<Uuid>, Option<&'a str>)>,
) -> Vec<NamedCount> {
    let mut counts: HashMap<Option<Uuid>, (&str, i64)> = HashMap::new();
    for (id, name) in entries {
        counts.entry(id).or_insert((name.unwrap_or(UNKNOWN), 0)).1 += 1;
    }
    let mut result: Vec<NamedCount> = counts
        .into_iter()
        .map(|(id, (name, count))| NamedCount {
            id,
            name: name.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Zero-filled daily counts for the `TREND_DAYS` days ending `today`, oldest first.
pub fn trend_series(daily: &[DailyCount], today: NaiveDate) -> Vec<DailyCount> {
    let counts: HashMap<NaiveDate, i64> = daily.iter().map(|d| (d.date, d.count)).collect();
    (0..TREND_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Aggregates complaints created in the requested range.
///
/// `daily` holds per-day creation counts for the trend window, which does
/// not depend on the range.
pub fn compute_complaint_statistics(
    rows: &[ComplaintSnapshot],
    daily: &[DailyCount],
    today: NaiveDate,
) -> ComplaintStatistics {
    let by_status = ComplaintStatus::ALL
        .iter()
        .map(|status| ComplaintStatusCount {
            status: *status,
            count: rows.iter().filter(|r| r.status == *status).count() as i64,
        })
        .collect();

    let mut priorities: BTreeMap<i16, i64> = BTreeMap::new();
    for row in rows {
        *priorities.entry(row.priority).or_insert(0) += 1;
    }
    let by_priority = priorities
        .into_iter()
        .map(|(priority, count)| PriorityCount { priority, count })
        .collect();

    let by_service = named_counts(rows.iter().map(|r| (r.service_id, r.service_name.as_deref())));
    let by_provider = named_counts(rows.iter().map(|r| (r.provider_id, r.provider_name.as_deref())));

    let resolution_hours: Vec<f64> = rows
        .iter()
        .filter(|r| r.status == ComplaintStatus::Resolved)
        .filter_map(|r| r.resolved_at.map(|at| (at - r.created_at).num_seconds() as f64 / 3600.0))
        .collect();
    let avg_resolution_time = if resolution_hours.is_empty() {
        0.0
    } else {
        resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64
    };

    let impacts: Vec<f64> = rows.iter().filter_map(|r| r.financial_impact).collect();
    let financial_impact = if impacts.is_empty() {
        FinancialImpactSummary::default()
    } else {
        let total: f64 = impacts.iter().sum();
        FinancialImpactSummary {
            total,
            average: total / impacts.len() as f64,
            max: impacts.iter().copied().fold(f64::MIN, f64::max),
        }
    };

    ComplaintStatistics {
        total_complaints: rows.len() as i64,
        by_status,
        by_priority,
        by_service,
        by_provider,
        avg_resolution_time,
        financial_impact,
        trend_data: trend_series(daily, today),
    }
}
