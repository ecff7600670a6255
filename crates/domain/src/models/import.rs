//! Import run shapes shared by the VAS, bulk and parking pipelines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    pub enum ImportKind {
        Vas => "VAS",
        Bulk => "BULK",
        Parking => "PARKING",
    }
}

impl ImportKind {
    /// Lowercase label used in metrics and log fields.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ImportKind::Vas => "vas",
            ImportKind::Bulk => "bulk",
            ImportKind::Parking => "parking",
        }
    }
}

/// Level of a progress log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportLogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Per-file status reported while an import runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Success,
    Error,
}

/// A row that failed validation or name resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRow {
    pub row_index: usize,
    pub errors: Vec<String>,
    pub original_row: BTreeMap<String, String>,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub records_processed: usize,
    pub imported: usize,
    pub updated: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub invalid_rows: Vec<InvalidRow>,
}

impl ImportReport {
    pub fn failed(&self) -> usize {
        self.invalid_rows.len()
    }

    /// Whether anything was written.
    pub fn wrote_anything(&self) -> bool {
        self.imported + self.updated > 0
    }

    pub fn reject(&mut self, row_index: usize, errors: Vec<String>, original_row: BTreeMap<String, String>) {
        for e in &errors {
            self.errors.push(format!("Row {}: {}", row_index + 1, e));
        }
        self.invalid_rows.push(InvalidRow {
            row_index,
            errors,
            original_row,
        });
    }
}

/// Body of the file-driven import endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[validate(email)]
    pub user_email: Option<String>,
    #[validate(length(min = 1, message = "uploadedFilePath is required"))]
    pub uploaded_file_path: String,
    pub provider_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_records_row_errors() {
        let mut report = ImportReport::default();
        let mut row = BTreeMap::new();
        row.insert("provider_name".to_string(), String::new());
        report.reject(4, vec!["Missing required field: provider_name".into()], row);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.errors[0], "Row 5: Missing required field: provider_name");
        assert!(!report.wrote_anything());
    }

    #[test]
    fn test_levels_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ImportLogLevel::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&FileStatus::Processing).unwrap(), "\"processing\"");
    }
}
