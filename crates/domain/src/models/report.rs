//! Scheduled report definitions.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

text_enum! {
    pub enum ReportType {
        Financial => "FINANCIAL",
        Sales => "SALES",
        Complaints => "COMPLAINTS",
        Contracts => "CONTRACTS",
        Providers => "PROVIDERS",
    }
}

text_enum! {
    /// How often a scheduled report runs.
    pub enum ReportFrequency {
        Daily => "DAILY",
        Weekly => "WEEKLY",
        Monthly => "MONTHLY",
        Quarterly => "QUARTERLY",
        Yearly => "YEARLY",
        Once => "ONCE",
    }
}

impl ReportFrequency {
    /// The run following `from`. A one-off report runs at `from` itself.
    pub fn next_run(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = |n: u32| from.checked_add_months(Months::new(n)).unwrap_or(from);
        match self {
            ReportFrequency::Daily => from + Duration::days(1),
            ReportFrequency::Weekly => from + Duration::days(7),
            ReportFrequency::Monthly => months(1),
            ReportFrequency::Quarterly => months(3),
            ReportFrequency::Yearly => months(12),
            ReportFrequency::Once => from,
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, ReportFrequency::Once)
    }
}

/// A stored report schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReport {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub report_type: ReportType,
    pub frequency: ReportFrequency,
    pub parameters: Value,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of both the create and the update endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReportRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub report_type: ReportType,
    pub frequency: ReportFrequency,
    #[serde(default = "empty_parameters")]
    #[validate(custom(function = "validate_parameters"))]
    pub parameters: Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn empty_parameters() -> Value {
    Value::Object(Default::default())
}

fn default_active() -> bool {
    true
}

fn validate_parameters(parameters: &Value) -> Result<(), ValidationError> {
    if parameters.is_object() {
        Ok(())
    } else {
        let mut error = ValidationError::new("parameters_object");
        error.message = Some("Parameters must be a JSON object".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReportQuery {
    pub is_active: Option<bool>,
}
