//! Row-level parsing and validation for the import pipelines.
//!
//! File reading and database access live in the api crate; everything here
//! is pure and works on rows of trimmed string cells.

pub mod bulk;
pub mod parking;
pub mod vas;

use std::collections::BTreeMap;

use crate::models::{FileStatus, ImportLogLevel};

/// A header-keyed row as read from a CSV or spreadsheet.
pub type RawRow = BTreeMap<String, String>;

/// Receives progress while an import runs.
///
/// Implementations must not block: the SSE endpoint forwards events to a
/// channel and the plain JSON endpoints ignore them.
pub trait ImportProgress: Send + Sync {
    fn on_log(&self, message: &str, level: ImportLogLevel, file: Option<&str>);
    fn on_progress(&self, file: &str, percent: u8);
    fn on_file_status(&self, file: &str, status: FileStatus);
}

/// Progress sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ImportProgress for NoopProgress {
    fn on_log(&self, _message: &str, _level: ImportLogLevel, _file: Option<&str>) {}
    fn on_progress(&self, _file: &str, _percent: u8) {}
    fn on_file_status(&self, _file: &str, _status: FileStatus) {}
}

/// Percentage of `done` over `total`, clamped to 100.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as f64 / total as f64) * 100.0).round() as u8
}

/// Parses a decimal that may use `,` as the decimal separator.
///
/// When both `.` and `,` appear, dots are treated as thousands separators
/// (`1.234,50`). Empty input is `Some(0.0)`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Some(0.0);
    }
    let normalized = if compact.contains(',') && compact.contains('.') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal("1.234,50"), Some(1234.5));
        assert_eq!(parse_decimal(" 3 "), Some(3.0));
        assert_eq!(parse_decimal(""), Some(0.0));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(12, 10), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
