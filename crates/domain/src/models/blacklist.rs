//! Bulk messaging sender blacklist.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A sender name blocked for one provider, or for all when `provider_id` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderBlacklistEntry {
    pub id: Uuid,
    pub sender_name: String,
    pub provider_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub effective_date: NaiveDate,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SenderBlacklistEntry {
    /// Whether the entry blocks `sender` for `provider_id` on `on`.
    ///
    /// An entry without a provider applies to every provider.
    pub fn blocks(&self, sender: &str, provider_id: Option<Uuid>, on: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= on
            && self.sender_name.eq_ignore_ascii_case(sender.trim())
            && (self.provider_id.is_none() || self.provider_id == provider_id)
    }
}

/// Request to blacklist a sender.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlacklistEntryRequest {
    #[validate(length(min = 1, max = 100, message = "Sender name is required"))]
    pub sender_name: String,
    pub provider_id: Option<Uuid>,
    pub effective_date: NaiveDate,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update of a blacklist entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlacklistEntryRequest {
    #[validate(length(min = 1, max = 100, message = "Sender name is required"))]
    pub sender_name: Option<String>,
    pub provider_id: Option<Uuid>,
    pub effective_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Blacklist list filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistQuery {
    pub sender_name: Option<String>,
    pub provider_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub effective_from: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(provider_id: Option<Uuid>) -> SenderBlacklistEntry {
        let now = Utc::now();
        SenderBlacklistEntry {
            id: Uuid::new_v4(),
            sender_name: "PROMO".into(),
            provider_id,
            provider_name: None,
            effective_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            description: None,
            is_active: true,
            created_by_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_blocks_matching_sender_after_effective_date() {
        let provider = Uuid::new_v4();
        let e = entry(Some(provider));
        let day = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert!(e.blocks("promo", Some(provider), day));
        assert!(!e.blocks("promo", Some(Uuid::new_v4()), day));
        assert!(!e.blocks("promo", Some(provider), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
    }

    #[test]
    fn test_entry_without_provider_blocks_everyone() {
        let e = entry(None);
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert!(e.blocks("PROMO", Some(Uuid::new_v4()), day));
    }

    #[test]
    fn test_inactive_entry_never_blocks() {
        let mut e = entry(None);
        e.is_active = false;
        assert!(!e.blocks("PROMO", None, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
    }
}
