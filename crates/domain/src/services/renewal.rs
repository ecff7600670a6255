//! Renewal dashboard statistics.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::renewal::{MonthlyCount, OrganizationCount, StatusCount};
use crate::models::{RenewalGates, RenewalStatistics, RenewalSubStatus};

/// Days ahead in which a contract under renewal counts as expiring.
pub const EXPIRING_SOON_DAYS: i64 = 30;
const TOP_ORGANIZATIONS: usize = 5;
const UNKNOWN_ORGANIZATION: &str = "Nepoznato";

/// What the statistics need from one renewal row.
#[derive(Debug, Clone)]
pub struct RenewalSnapshot {
    pub gates: RenewalGates,
    pub created_at: DateTime<Utc>,
    pub organization_id: Option<Uuid>,
    pub organization_name: Option<String>,
    pub contract_end_date: NaiveDate,
}

/// `YYYY-MM` keys of the 12 months ending with the month of `now`, oldest first.
pub fn last_twelve_months(now: DateTime<Utc>) -> Vec<String> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    (0..12u32)
        .rev()
        .filter_map(|back| first.checked_sub_months(Months::new(back)))
        .map(|m| m.format("%Y-%m").to_string())
        .collect()
}

pub fn compute_statistics(rows: &[RenewalSnapshot], now: DateTime<Utc>) -> RenewalStatistics {
    let today = now.date_naive();
    let soon = today + Duration::days(EXPIRING_SOON_DAYS);

    let mut by_status: HashMap<RenewalSubStatus, i64> = HashMap::new();
    let mut by_month: HashMap<String, i64> = HashMap::new();
    let mut by_org: HashMap<Option<Uuid>, (Option<&str>, i64)> = HashMap::new();
    let mut progress_sum = 0u64;
    let mut expiring_contracts = 0;

    for row in rows {
        let stage = row.gates.sub_status();
        *by_status.entry(stage).or_insert(0) += 1;
        *by_month
            .entry(row.created_at.format("%Y-%m").to_string())
            .or_insert(0) += 1;
        let org = by_org
            .entry(row.organization_id)
            .or_insert((row.organization_name.as_deref(), 0));
        org.1 += 1;
        progress_sum += u64::from(row.gates.progress());

        if stage != RenewalSubStatus::FinalProcessing
            && row.contract_end_date >= today
            && row.contract_end_date <= soon
        {
            expiring_contracts += 1;
        }
    }

    let total = rows.len() as i64;
    let completed = by_status
        .get(&RenewalSubStatus::FinalProcessing)
        .copied()
        .unwrap_or(0);
    let average_progress = if rows.is_empty() {
        0
    } else {
        (progress_sum as f64 / rows.len() as f64).round() as i64
    };

    let renewals_by_status = RenewalSubStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            label: status.label().to_string(),
            count: by_status.get(status).copied().unwrap_or(0),
        })
        .collect();

    let monthly_renewals = last_twelve_months(now)
        .into_iter()
        .map(|month| {
            let count = by_month.get(&month).copied().unwrap_or(0);
            MonthlyCount { month, count }
        })
        .collect();

    let mut top_organizations: Vec<OrganizationCount> = by_org
        .into_iter()
        .map(|(organization_id, (name, count))| OrganizationCount {
            organization_id,
            name: name.unwrap_or(UNKNOWN_ORGANIZATION).to_string(),
            count,
        })
        .collect();
    top_organizations.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    top_organizations.truncate(TOP_ORGANIZATIONS);

    RenewalStatistics {
        total_renewals: total,
        in_progress: total - completed,
        awaiting_signature: by_status
            .get(&RenewalSubStatus::AwaitingSignature)
            .copied()
            .unwrap_or(0),
        completed,
        expiring_contracts,
        average_progress,
        renewals_by_status,
        monthly_renewals,
        top_organizations,
    }
}
