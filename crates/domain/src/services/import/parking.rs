//! Parking micropayment reports.
//!
//! A report sheet looks like:
//!
//! ```text
//! Servis     | Cena | ... | 01.03.25 | 02.03.25 | ... | TOTAL
//! prepaid    |      |     |          |          |     |
//! 9111 Zona1 | 60   |     | 12       | 7        |     | 19      <- quantities
//!            |      |     | 720      | 420      |     | 1140    <- amounts
//! postpaid   | ...
//! ```
//!
//! Only prepaid rows with a positive quantity become transactions.

use chrono::NaiveDate;
use regex::Regex;

lazy_static::lazy_static! {
    static ref PROVIDER_PATTERNS: [Regex; 3] = [
        Regex::new(r"_mParking_(.+?)_\d+__\d+_").unwrap(),
        Regex::new(r"Servis__MicropaymentMerchantReport_(.+?)__\d+_").unwrap(),
        Regex::new(r"Parking_(.+?)_\d{8}").unwrap(),
    ];
    static ref LONG_DIGITS: Regex = Regex::new(r"\d{4,}").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
}

/// Sheet index of the daily report inside the workbook.
pub const REPORT_SHEET_INDEX: usize = 3;
/// First column holding per-day values.
const FIRST_DATE_COLUMN: usize = 3;

/// Title-cases like Python's `str.title`: a letter is upper-cased when the
/// previous character is not a letter.
fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_letter = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Provider name derived from a report filename.
///
/// Falls back to `Unknown_<first 10 chars of the basename>`.
pub fn extract_provider(filename: &str) -> String {
    for pattern in PROVIDER_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(filename) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let titled = title_case(&raw.replace('_', " "));
            return LONG_DIGITS.replace_all(&titled, "").trim().to_string();
        }
    }
    let base = basename(filename);
    format!("Unknown_{}", base.chars().take(10).collect::<String>())
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// First standalone four-digit code in a service name.
pub fn extract_service_code(service_name: &str) -> Option<String> {
    DIGIT_RUN
        .find_iter(service_name)
        .find(|m| m.as_str().len() == 4)
        .map(|m| m.as_str().to_string())
}

/// Numeric cell with `,` thousands separators removed.
pub fn convert_to_float(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strips whitespace and a trailing dot from a header date cell.
pub fn clean_date(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_end_matches('.').to_string()
}

/// `dd.mm.yy` or `dd.mm.yyyy` to a date; two-digit years are 20yy.
pub fn convert_date_format(raw: &str) -> Option<NaiveDate> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let parts: Vec<&str> = kept.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let day = parts[0].parse::<u32>().ok()?;
    let month = parts[1].parse::<u32>().ok()?;
    let year = match parts[2].len() {
        2 => 2000 + parts[2].parse::<i32>().ok()?,
        _ => parts[2].parse::<i32>().ok()?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First four-digit year in `2000..=current_year + 1`, else `current_year`.
pub fn extract_year_from_filename(filename: &str, current_year: i32) -> i32 {
    DIGIT_RUN
        .find_iter(filename)
        .filter_map(|m| m.as_str().get(..4).and_then(|s| s.parse::<i32>().ok()))
        .next()
        .filter(|y| (2000..=current_year + 1).contains(y))
        .unwrap_or(current_year)
}

/// One prepaid parking transaction read from a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingRecord {
    pub date: NaiveDate,
    pub group: String,
    pub service_name: String,
    pub service_code: Option<String>,
    pub price: Option<f64>,
    pub quantity: f64,
    pub amount: Option<f64>,
}

/// Parsed content of one report sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParkingSheet {
    pub records: Vec<ParkingRecord>,
    /// Header date cells that could not be parsed.
    pub invalid_dates: Vec<String>,
    pub service_count: usize,
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|c| c.trim()).unwrap_or("")
}

fn value_columns(row: &[String], ends_with_total: bool, width: usize) -> Vec<&str> {
    let end = if ends_with_total { width.saturating_sub(1) } else { width };
    (FIRST_DATE_COLUMN..end.max(FIRST_DATE_COLUMN))
        .map(|i| cell(row, i))
        .collect()
}

/// Walks a report grid and collects prepaid transactions.
pub fn parse_sheet(grid: &[Vec<String>]) -> ParkingSheet {
    let mut sheet = ParkingSheet::default();
    let Some(header) = grid.first() else {
        return sheet;
    };

    let width = header.len();
    let ends_with_total = header
        .last()
        .map(|h| h.trim().eq_ignore_ascii_case("TOTAL"))
        .unwrap_or(false);
    let dates: Vec<Option<NaiveDate>> = value_columns(header, ends_with_total, width)
        .into_iter()
        .map(|raw| {
            let cleaned = clean_date(raw);
            let parsed = convert_date_format(&cleaned);
            if parsed.is_none() && !cleaned.is_empty() {
                sheet.invalid_dates.push(cleaned);
            }
            parsed
        })
        .collect();

    let mut group = "prepaid".to_string();
    let mut i = 1;
    while i < grid.len() {
        let row = &grid[i];
        let first = cell(row, 0);
        let first_lower = first.to_lowercase();

        if row.iter().all(|c| c.trim().is_empty()) || cell(row, 1).to_lowercase().contains("total") {
            i += 1;
            continue;
        }
        if i == 1 && (first_lower.contains("servis") || first_lower.contains("izveštaj")) {
            i += 1;
            continue;
        }
        if let Some(kw) = ["prepaid", "postpaid", "total"]
            .into_iter()
            .find(|kw| first_lower.contains(kw))
        {
            group = kw.to_string();
            i += 1;
            continue;
        }
        if first.is_empty() {
            i += 1;
            continue;
        }

        sheet.service_count += 1;
        let price = convert_to_float(cell(row, 1));
        let quantities = value_columns(row, ends_with_total, width);
        let amounts = grid
            .get(i + 1)
            .map(|next| value_columns(next, ends_with_total, width))
            .unwrap_or_default();

        if group == "prepaid" {
            for (j, date) in dates.iter().enumerate() {
                let Some(date) = date else { continue };
                let quantity = quantities.get(j).and_then(|q| convert_to_float(q));
                if let Some(quantity) = quantity.filter(|q| *q > 0.0) {
                    sheet.records.push(ParkingRecord {
                        date: *date,
                        group: group.clone(),
                        service_name: first.to_string(),
                        service_code: extract_service_code(first),
                        price,
                        quantity,
                        amount: amounts.get(j).and_then(|a| convert_to_float(a)),
                    });
                }
            }
        }
        i += 2;
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_provider_from_mparking_name() {
        assert_eq!(
            extract_provider("Servis_mParking_JKP_PARKING_SERVIS_NOVI_SAD_2024__06_report.xlsx"),
            "Jkp Parking Servis Novi Sad"
        );
    }

    #[test]
    fn test_provider_from_micropayment_name() {
        assert_eq!(
            extract_provider("Servis__MicropaymentMerchantReport_parking_kragujevac__202503_.xlsx"),
            "Parking Kragujevac"
        );
    }

    #[test]
    fn test_provider_from_plain_parking_name() {
        assert_eq!(extract_provider("Parking_Nis_20250301.xlsx"), "Nis");
    }

    #[test]
    fn test_provider_strips_long_digit_runs() {
        assert_eq!(
            extract_provider("Parking_Zona_12345_Beograd_20250301.xlsx"),
            "Zona  Beograd"
        );
    }

    #[test]
    fn test_provider_fallback() {
        assert_eq!(
            extract_provider("/uploads/izvestaj_mart.xlsx"),
            "Unknown_izvestaj_m"
        );
    }

    #[test]
    fn test_title_case_matches_python() {
        assert_eq!(title_case("jkp parking"), "Jkp Parking");
        assert_eq!(title_case("abc1def"), "Abc1Def");
        assert_eq!(title_case("ČAČAK"), "Čačak");
    }

    #[test]
    fn test_service_code() {
        assert_eq!(extract_service_code("9111 Zona 1").as_deref(), Some("9111"));
        assert_eq!(extract_service_code("SMS 12345 / 8555").as_deref(), Some("8555"));
        assert_eq!(extract_service_code("Zona 1"), None);
    }

    #[test]
    fn test_dates() {
        assert_eq!(clean_date(" 01.03.25. "), "01.03.25");
        assert_eq!(convert_date_format("1.3.25"), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(convert_date_format("01.03.2025"), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(convert_date_format("2025-03-01"), None);
        assert_eq!(convert_date_format("31.02.25"), None);
    }

    #[test]
    fn test_year_from_filename() {
        assert_eq!(extract_year_from_filename("Parking_Nis_20250301.xlsx", 2025), 2025);
        assert_eq!(extract_year_from_filename("report_1999.xlsx", 2025), 2025);
        assert_eq!(extract_year_from_filename("report.xlsx", 2024), 2024);
        assert_eq!(extract_year_from_filename("report_2026.xlsx", 2025), 2026);
    }

    #[test]
    fn test_convert_to_float() {
        assert_eq!(convert_to_float("1,140"), Some(1140.0));
        assert_eq!(convert_to_float("60"), Some(60.0));
        assert_eq!(convert_to_float(""), None);
        assert_eq!(convert_to_float("-"), None);
    }

    #[test]
    fn test_parse_sheet_prepaid_only() {
        let g = grid(&[
            &["Servis", "Cena", "", "01.03.25", "02.03.25", "TOTAL"],
            &["Servis izveštaj", "", "", "", "", ""],
            &["prepaid", "", "", "", "", ""],
            &["9111 Zona 1", "60", "", "12", "0", "12"],
            &["", "", "", "720", "0", "720"],
            &["Ukupno", "total", "", "12", "0", "12"],
            &["postpaid", "", "", "", "", ""],
            &["9112 Zona 2", "80", "", "3", "4", "7"],
            &["", "", "", "240", "320", "560"],
        ]);
        let sheet = parse_sheet(&g);
        assert_eq!(sheet.service_count, 2);
        assert_eq!(sheet.records.len(), 1);
        let r = &sheet.records[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(r.service_code.as_deref(), Some("9111"));
        assert_eq!(r.price, Some(60.0));
        assert_eq!(r.quantity, 12.0);
        assert_eq!(r.amount, Some(720.0));
        assert_eq!(r.group, "prepaid");
    }

    #[test]
    fn test_parse_sheet_without_total_column() {
        let g = grid(&[
            &["Servis", "Cena", "", "01.03.25", "02.03.25"],
            &["9111 Zona 1", "60", "", "1", "2"],
            &["", "", "", "60", "120"],
        ]);
        let sheet = parse_sheet(&g);
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.records[1].amount, Some(120.0));
    }

    #[test]
    fn test_parse_sheet_reports_bad_dates() {
        let g = grid(&[
            &["Servis", "Cena", "", "mart", "02.03.25"],
            &["9111 Zona 1", "60", "", "5", "2"],
            &["", "", "", "300", "120"],
        ]);
        let sheet = parse_sheet(&g);
        assert_eq!(sheet.invalid_dates, vec!["mart".to_string()]);
        assert_eq!(sheet.records.len(), 1);
    }

    #[test]
    fn test_empty_grid() {
        assert_eq!(parse_sheet(&[]), ParkingSheet::default());
    }
}
