//! Common validation utilities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// Validates that a string is not empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a percentage is within 0..=100.
pub fn validate_percentage(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("percentage_range");
        err.message = Some("Percentage must be between 0 and 100".into());
        Err(err)
    }
}

/// Validates that `end` is not before `start`. With `strict`, equal dates are rejected too.
pub fn validate_date_order(
    start: NaiveDate,
    end: NaiveDate,
    strict: bool,
) -> Result<(), ValidationError> {
    let ok = if strict { end > start } else { end >= start };
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_order");
        err.message = Some(if strict {
            "End date must be after start date".into()
        } else {
            "End date must not be before start date".into()
        });
        Err(err)
    }
}

/// Parses a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Returns `None` for anything else; callers reject such input instead of
/// storing a placeholder.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Parses an instant from an RFC 3339 timestamp or a bare `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Serde adapter for optional query timestamps accepted in either
/// [`parse_timestamp`] form. Empty values read as `None`.
pub fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid date: {}", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Telekom").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }

    #[test]
    fn test_validate_percentage_bounds() {
        assert!(validate_percentage(0.0).is_ok());
        assert!(validate_percentage(100.0).is_ok());
        assert!(validate_percentage(12.5).is_ok());
        assert!(validate_percentage(-0.1).is_err());
        assert!(validate_percentage(100.1).is_err());
        assert!(validate_percentage(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_date_order() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(validate_date_order(a, b, true).is_ok());
        assert!(validate_date_order(a, a, false).is_ok());
        assert!(validate_date_order(a, a, true).is_err());
        assert!(validate_date_order(b, a, false).is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2025-03-01"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(
            parse_date("2025-03-01T10:15:00Z"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2025-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let midnight = parse_timestamp("2024-06-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        let offset = parse_timestamp("2024-06-01T02:00:00+02:00").unwrap();
        assert_eq!(offset, midnight);
        assert!(parse_timestamp("01.06.2024").is_none());
    }

    #[test]
    fn test_deserialize_optional_timestamp() {
        #[derive(Deserialize)]
        struct Q {
            #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
            from: Option<DateTime<Utc>>,
        }
        let q: Q = serde_json::from_str(r#"{"from":"2024-01-31"}"#).unwrap();
        assert!(q.from.is_some());
        let q: Q = serde_json::from_str(r#"{"from":""}"#).unwrap();
        assert!(q.from.is_none());
        let q: Q = serde_json::from_str("{}").unwrap();
        assert!(q.from.is_none());
        assert!(serde_json::from_str::<Q>(r#"{"from":"yesterday"}"#).is_err());
    }
}
