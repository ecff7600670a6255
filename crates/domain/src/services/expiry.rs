//! Contract expiry window.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::errors::{DomainError, DomainResult};
use crate::models::{
    ContractStatus, ContractType, ContractTypeCount, ExpiringContract, ExpiryCandidate,
    ExpiryStatistics, ExpiryTimelineMonth, ExpiryTimelineQuery, RenewalCoverage,
    TimelineContract,
};

pub const DEFAULT_THRESHOLD_DAYS: i64 = 60;
pub const MAX_THRESHOLD_DAYS: i64 = 365;
/// Contracts ending within this many days feed the expiry statistics.
pub const STATISTICS_HORIZON_DAYS: i64 = 60;
pub const DEFAULT_TIMELINE_MONTHS: u32 = 12;
pub const MAX_TIMELINE_MONTHS: u32 = 60;
const TIMELINE_LOOKBACK_MONTHS: u32 = 3;

/// Window of `days` around `today` used by the expiry scan.
///
/// - ACTIVE contracts ending in `[today, today + days]`
/// - EXPIRED contracts that ended in `[today - days, today)`
/// - every RENEWAL_IN_PROGRESS contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    pub today: NaiveDate,
    pub days: i64,
}

impl ExpiryWindow {
    pub fn new(today: NaiveDate, days: Option<i64>) -> DomainResult<Self> {
        let days = days.unwrap_or(DEFAULT_THRESHOLD_DAYS);
        if !(1..=MAX_THRESHOLD_DAYS).contains(&days) {
            return Err(DomainError::Validation(format!(
                "days must be between 1 and {}",
                MAX_THRESHOLD_DAYS
            )));
        }
        Ok(Self { today, days })
    }

    pub fn horizon(&self) -> NaiveDate {
        self.today + Duration::days(self.days)
    }

    pub fn lookback(&self) -> NaiveDate {
        self.today - Duration::days(self.days)
    }

    pub fn matches(&self, status: ContractStatus, end_date: NaiveDate) -> bool {
        match status {
            ContractStatus::Active => end_date >= self.today && end_date <= self.horizon(),
            ContractStatus::Expired => end_date >= self.lookback() && end_date < self.today,
            ContractStatus::RenewalInProgress => true,
            _ => false,
        }
    }
}

/// Sort key: renewals in progress first, then expired, then active.
pub fn status_rank(status: ContractStatus) -> u8 {
    match status {
        ContractStatus::RenewalInProgress => 0,
        ContractStatus::Expired => 1,
        ContractStatus::Active => 2,
        _ => 3,
    }
}

/// Orders scan results by status rank, then end date ascending.
pub fn sort_expiring(rows: &mut [ExpiringContract]) {
    rows.sort_by(|a, b| {
        status_rank(a.status)
            .cmp(&status_rank(b.status))
            .then(a.end_date.cmp(&b.end_date))
    });
}

/// Summarises contracts ending on or before `today + 60 days`.
pub fn compute_expiry_statistics(rows: &[ExpiryCandidate], today: NaiveDate) -> ExpiryStatistics {
    let days: Vec<i64> = rows.iter().map(|r| (r.end_date - today).num_days()).collect();
    let upcoming: Vec<i64> = days.iter().copied().filter(|d| *d >= 0).collect();
    let average_days_to_expiry = if upcoming.is_empty() {
        0
    } else {
        (upcoming.iter().sum::<i64>() as f64 / upcoming.len() as f64).round() as i64
    };

    let contracts_by_type = ContractType::ALL
        .iter()
        .filter_map(|t| {
            let count = rows.iter().filter(|r| r.contract_type == *t).count() as i64;
            (count > 0).then(|| ContractTypeCount {
                contract_type: *t,
                count,
                label: t.label().to_string(),
            })
        })
        .collect();

    let with_renewal = rows.iter().filter(|r| r.has_renewal).count() as i64;
    ExpiryStatistics {
        total_expiring: rows.len() as i64,
        expired_count: days.iter().filter(|d| **d < 0).count() as i64,
        expiring_in_30_days: upcoming.iter().filter(|d| **d <= 30).count() as i64,
        expiring_in_60_days: upcoming.iter().filter(|d| **d <= 60).count() as i64,
        average_days_to_expiry,
        contracts_by_type,
        renewal_stats: RenewalCoverage {
            with_renewal,
            without_renewal: rows.len() as i64 - with_renewal,
        },
    }
}

/// Date range `[first, last]` covered by the expiry timeline.
pub fn timeline_range(
    query: &ExpiryTimelineQuery,
    today: NaiveDate,
) -> DomainResult<(NaiveDate, NaiveDate)> {
    let months_ahead = query.months_ahead.unwrap_or(DEFAULT_TIMELINE_MONTHS);
    if !(1..=MAX_TIMELINE_MONTHS).contains(&months_ahead) {
        return Err(DomainError::Validation(format!(
            "monthsAhead must be between 1 and {}",
            MAX_TIMELINE_MONTHS
        )));
    }
    let this_month = today.with_day(1).unwrap_or(today);
    let first = if query.include_expired {
        this_month
            .checked_sub_months(Months::new(TIMELINE_LOOKBACK_MONTHS))
            .unwrap_or(this_month)
    } else {
        this_month
    };
    let last = this_month
        .checked_add_months(Months::new(months_ahead + 1))
        .map(|next| next - Duration::days(1))
        .ok_or_else(|| DomainError::Validation("monthsAhead is out of range".to_string()))?;
    Ok((first, last))
}

/// Groups contracts by the month they end in, skipping empty months.
pub fn build_expiry_timeline(rows: &[ExpiryCandidate]) -> Vec<ExpiryTimelineMonth> {
    let mut months: BTreeMap<NaiveDate, Vec<&ExpiryCandidate>> = BTreeMap::new();
    for row in rows {
        let month = row.end_date.with_day(1).unwrap_or(row.end_date);
        months.entry(month).or_default().push(row);
    }

    months
        .into_iter()
        .map(|(date, mut contracts)| {
            contracts.sort_by_key(|c| c.end_date);
            let count = |t: ContractType| {
                contracts.iter().filter(|c| c.contract_type == t).count() as i64
            };
            ExpiryTimelineMonth {
                month: date.format("%b %Y").to_string(),
                date,
                provider: count(ContractType::Provider),
                humanitarian: count(ContractType::Humanitarian),
                parking: count(ContractType::Parking),
                bulk: count(ContractType::Bulk),
                total: contracts.len() as i64,
                contracts: contracts
                    .into_iter()
                    .map(|c| TimelineContract {
                        id: c.id,
                        contract_number: c.contract_number.clone(),
                        organization_name: c
                            .partner_name
                            .clone()
                            .unwrap_or_else(|| c.name.clone()),
                        contract_type: c.contract_type,
                        end_date: c.end_date,
                        status: c.status,
                        has_renewal: c.has_renewal,
                    })
                    .collect(),
            }
        })
        .collect()
}
