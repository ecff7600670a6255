//! Bulk messaging CSV rows.

use std::collections::HashMap;

use uuid::Uuid;

use super::RawRow;
use crate::models::BulkServiceRecord;

pub const REQUIRED_FIELDS: [&str; 7] = [
    "provider_name",
    "agreement_name",
    "service_name",
    "step_name",
    "sender_name",
    "requests",
    "message_parts",
];

/// A bulk row that passed field validation but is not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRow {
    pub provider_name: String,
    pub agreement_name: String,
    pub service_name: String,
    pub step_name: String,
    pub sender_name: String,
    pub requests: i64,
    pub message_parts: i64,
}

impl BulkRow {
    /// `provider-agreement-service-step-sender`, as stored in the service catalogue.
    pub fn composite_name(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.provider_name,
            self.agreement_name,
            self.service_name,
            self.step_name,
            self.sender_name
        )
    }
}

fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(|v| v.trim()).unwrap_or("")
}

/// Validates required fields and numeric columns.
pub fn parse_row(row: &RawRow) -> Result<BulkRow, Vec<String>> {
    let mut errors = Vec::new();
    for name in REQUIRED_FIELDS {
        if field(row, name).is_empty() {
            errors.push(format!("Missing required field: {}", name));
        }
    }

    let requests = field(row, "requests");
    let parsed_requests = requests.parse::<i64>().ok();
    if !requests.is_empty() && parsed_requests.is_none() {
        errors.push("Requests must be a valid number".to_string());
    }

    let parts = field(row, "message_parts");
    let parsed_parts = parts.parse::<i64>().ok();
    if !parts.is_empty() && parsed_parts.is_none() {
        errors.push("Message parts must be a valid number".to_string());
    }

    match (errors.is_empty(), parsed_requests, parsed_parts) {
        (true, Some(requests), Some(message_parts)) => Ok(BulkRow {
            provider_name: field(row, "provider_name").to_string(),
            agreement_name: field(row, "agreement_name").to_string(),
            service_name: field(row, "service_name").to_string(),
            step_name: field(row, "step_name").to_string(),
            sender_name: field(row, "sender_name").to_string(),
            requests,
            message_parts,
        }),
        _ => Err(errors),
    }
}

/// Lowercased name lookups built from one catalogue query per run.
#[derive(Debug, Clone, Default)]
pub struct BulkLookup {
    providers: HashMap<String, Uuid>,
    services: HashMap<String, Uuid>,
}

/// Which lookups failed for a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveFailure {
    pub provider_missing: bool,
    pub service_missing: bool,
    pub errors: Vec<String>,
}

impl BulkLookup {
    pub fn new(
        providers: impl IntoIterator<Item = (String, Uuid)>,
        services: impl IntoIterator<Item = (String, Uuid)>,
    ) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|(name, id)| (name.to_lowercase(), id))
                .collect(),
            services: services
                .into_iter()
                .map(|(name, id)| (name.to_lowercase(), id))
                .collect(),
        }
    }

    pub fn resolve(&self, row: &BulkRow) -> Result<BulkServiceRecord, ResolveFailure> {
        let provider_id = self.providers.get(&row.provider_name.to_lowercase()).copied();
        let composite = row.composite_name();
        let service_id = self.services.get(&composite.to_lowercase()).copied();

        match (provider_id, service_id) {
            (Some(provider_id), Some(service_id)) => Ok(BulkServiceRecord {
                provider_name: row.provider_name.clone(),
                agreement_name: row.agreement_name.clone(),
                service_name: row.service_name.clone(),
                step_name: row.step_name.clone(),
                sender_name: row.sender_name.clone(),
                requests: row.requests,
                message_parts: row.message_parts,
                provider_id,
                service_id,
            }),
            _ => {
                let mut failure = ResolveFailure::default();
                if provider_id.is_none() {
                    failure.provider_missing = true;
                    failure
                        .errors
                        .push(format!("Provider \"{}\" not found in system.", row.provider_name));
                }
                if service_id.is_none() {
                    failure.service_missing = true;
                    failure.errors.push(format!(
                        "Service with composite name \"{}\" not found in system.",
                        composite
                    ));
                }
                Err(failure)
            }
        }
    }
}

/// Summary warning for a run with unresolved names, if any.
pub fn mapping_summary(provider_failures: usize, service_failures: usize) -> Option<String> {
    if provider_failures == 0 && service_failures == 0 {
        return None;
    }
    Some(format!(
        "Provider mapping failures: {}, Service mapping failures: {}",
        provider_failures, service_failures
    ))
}

pub fn blacklisted_warning(sender: &str, provider: &str) -> String {
    format!("Sender \"{}\" is blacklisted for provider \"{}\"", sender, provider)
}
