//! VAS billing rows (CSV with `;` separator or XLSX).

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use super::{parse_decimal, RawRow};
use crate::models::VasServiceRecord;

/// Cell that marks the header row.
pub const HEADER_MARKER: &str = "Proizvod";
/// Rows searched for the header.
pub const HEADER_SEARCH_ROWS: usize = 10;

/// Normalised column keys with the display name used in messages.
const NUMERIC_COLUMNS: [(&str, &str); 12] = [
    ("jedinicna_cena", "Jedinicna_cena"),
    ("broj_transakcija", "Broj_transakcija"),
    ("fakturisan_iznos", "Fakturisan_iznos"),
    ("fakturisan_korigovan_iznos", "Fakturisan_korigovan_iznos"),
    ("naplacen_iznos", "Naplacen_iznos"),
    ("kumulativ_naplacenih_iznosa", "Kumulativ_naplacenih_iznosa"),
    ("nenaplacen_iznos", "Nenaplacen_iznos"),
    ("nenaplacen_korigovan_iznos", "Nenaplacen_korigovan_iznos"),
    ("storniran_iznos", "Storniran_iznos_u_tekucem_mesecu_iz_perioda_pracenja"),
    ("otkazan_iznos", "Otkazan_iznos"),
    ("kumulativ_otkazanih_iznosa", "Kumulativ_otkazanih_iznosa"),
    ("iznos_za_prenos_sredstava", "Iznos_za_prenos_sredstava_"),
];

fn fold_diacritics(c: char) -> Option<&'static str> {
    Some(match c {
        'č' | 'ć' => "c",
        'š' => "s",
        'ž' => "z",
        'đ' => "dj",
        _ => return None,
    })
}

/// Normalises a header cell: lowercase, diacritics folded, spaces to `_`,
/// trailing `*` and `_` dropped. Long-form names map to their short keys.
pub fn normalize_header(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for c in lower.chars() {
        if let Some(folded) = fold_diacritics(c) {
            out.push_str(folded);
        } else if c.is_whitespace() || c == '-' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    let key = out.trim_end_matches(['*', '_']).to_string();

    if key.starts_with("storniran_iznos") {
        "storniran_iznos".to_string()
    } else if key.starts_with("iznos_za_prenos_sredstava") {
        "iznos_za_prenos_sredstava".to_string()
    } else {
        key
    }
}

/// Index of the header row among the first [`HEADER_SEARCH_ROWS`] rows.
pub fn find_header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .take(HEADER_SEARCH_ROWS)
        .position(|r| r.iter().any(|c| c.trim().eq_ignore_ascii_case(HEADER_MARKER)))
}

/// Explanatory rows under the header (`1`, `2`, ... `12`).
pub fn is_formula_row(first_cell: &str) -> bool {
    let t = first_cell.trim();
    !t.is_empty() && t.len() < 3 && t.chars().all(|c| c.is_ascii_digit())
}

/// Builds header-keyed rows from a raw grid, skipping empty and formula rows.
pub fn rows_from_grid(grid: &[Vec<String>]) -> Option<Vec<(usize, RawRow)>> {
    let header_idx = find_header_row(grid)?;
    let headers: Vec<String> = grid[header_idx].iter().map(|h| normalize_header(h)).collect();

    let rows = grid
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .filter(|(_, r)| r.first().map(|c| !c.trim().is_empty()).unwrap_or(false))
        .filter(|(_, r)| !r.first().map(|c| is_formula_row(c)).unwrap_or(false))
        .map(|(idx, r)| {
            let row: RawRow = headers
                .iter()
                .zip(r.iter())
                .filter(|(h, v)| !h.is_empty() && !v.trim().is_empty())
                .map(|(h, v)| (h.clone(), v.trim().to_string()))
                .collect();
            (idx, row)
        })
        .collect();
    Some(rows)
}

/// Parses a billing month: `MM.YYYY`, `DD.MM.YYYY` or `YYYY-MM-DD`.
///
/// Returns the first day of the month.
pub fn parse_billing_month(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim().trim_end_matches('.');
    let parts: Vec<&str> = t.split('.').map(str::trim).collect();
    let (year, month) = match parts.as_slice() {
        [m, y] => (y.parse::<i32>().ok()?, m.parse::<u32>().ok()?),
        [_, m, y] => (y.parse::<i32>().ok()?, m.parse::<u32>().ok()?),
        _ => {
            let d = NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .ok()
                .or_else(|| shared::validation::parse_date(t))?;
            (d.year(), d.month())
        }
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// A validated VAS row waiting for provider/service resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct VasRow {
    pub proizvod: String,
    pub provider_name: Option<String>,
    pub billing_month: NaiveDate,
    pub amounts: [f64; 12],
}

impl VasRow {
    pub fn into_record(self, provider_id: Uuid, service_id: Uuid) -> VasServiceRecord {
        let a = self.amounts;
        VasServiceRecord {
            proizvod: self.proizvod,
            mesec_pruzanja_usluge: self.billing_month,
            jedinicna_cena: a[0],
            broj_transakcija: a[1].trunc() as i64,
            fakturisan_iznos: a[2],
            fakturisan_korigovan_iznos: a[3],
            naplacen_iznos: a[4],
            kumulativ_naplacenih_iznosa: a[5],
            nenaplacen_iznos: a[6],
            nenaplacen_korigovan_iznos: a[7],
            storniran_iznos: a[8],
            otkazan_iznos: a[9],
            kumulativ_otkazanih_iznosa: a[10],
            iznos_za_prenos_sredstava: a[11],
            provider_id,
            service_id,
        }
    }
}

/// Validates one normalised row. `has_default_provider` is true when the
/// request names a provider for the whole file.
pub fn parse_row(row: &RawRow, has_default_provider: bool) -> Result<VasRow, Vec<String>> {
    let mut errors = Vec::new();
    let get = |k: &str| row.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());

    let proizvod = get("proizvod");
    if proizvod.is_none() {
        errors.push("Missing or empty 'Proizvod'".to_string());
    }

    let provider_name = get("provajder").map(str::to_string);
    if provider_name.is_none() && !has_default_provider {
        errors.push("Missing or empty 'Provajder'".to_string());
    }

    let billing_month = match get("mesec_pruzanja_usluge") {
        None => {
            errors.push("Missing or empty 'Mesec_pruzanja_usluge'".to_string());
            None
        }
        Some(raw) => match parse_billing_month(raw) {
            None => {
                errors.push(format!(
                    "Invalid date format for 'Mesec_pruzanja_usluge': \"{}\"",
                    raw
                ));
                None
            }
            Some(d) if !(2000..=2100).contains(&d.year()) => {
                errors.push(format!(
                    "Unrealistic year in date for 'Mesec_pruzanja_usluge': \"{}\"",
                    raw
                ));
                None
            }
            Some(d) => Some(d),
        },
    };

    let mut amounts = [0.0; 12];
    for (slot, (key, display)) in amounts.iter_mut().zip(NUMERIC_COLUMNS) {
        let raw = get(key).unwrap_or("");
        match parse_decimal(raw) {
            Some(v) => *slot = v,
            None => errors.push(format!("Invalid number format for '{}': \"{}\"", display, raw)),
        }
    }

    match (proizvod, billing_month) {
        (Some(p), Some(m)) if errors.is_empty() => Ok(VasRow {
            proizvod: p.to_string(),
            provider_name,
            billing_month: m,
            amounts,
        }),
        _ => Err(errors),
    }
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
    fn test_normalize_header() {
        assert_eq!(normalize_header("Mesec pružanja usluge"), "mesec_pruzanja_usluge");
        assert_eq!(normalize_header("Jedinična cena"), "jedinicna_cena");
        assert_eq!(normalize_header("Naplaćen iznos"), "naplacen_iznos");
        assert_eq!(
            normalize_header("Storniran_iznos_u_tekucem_mesecu_iz_perioda_pracenja"),
            "storniran_iznos"
        );
        assert_eq!(normalize_header("Iznos_za_prenos_sredstava_"), "iznos_za_prenos_sredstava");
        assert_eq!(normalize_header("Iznos za prenos sredstava*"), "iznos_za_prenos_sredstava");
    }

    #[test]
    fn test_header_found_below_title_rows() {
        let g = grid(&[
            &["Izveštaj o VAS uslugama"],
            &[""],
            &["Proizvod", "Mesec_pruzanja_usluge", "Provajder", "Fakturisan_iznos"],
            &["1", "2", "3", "4"],
            &["Horoskop", "03.2025", "Mobi Media", "1.200,50"],
        ]);
        assert_eq!(find_header_row(&g), Some(2));
        let rows = rows_from_grid(&g).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 4);
        assert_eq!(rows[0].1.get("fakturisan_iznos").map(String::as_str), Some("1.200,50"));
    }

    #[test]
    fn test_no_header() {
        assert!(rows_from_grid(&grid(&[&["a", "b"]])).is_none());
    }

    #[test]
    fn test_billing_month_formats() {
        let march = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(parse_billing_month("03.2025"), march);
        assert_eq!(parse_billing_month("3.2025."), march);
        assert_eq!(parse_billing_month("15.03.2025"), march);
        assert_eq!(parse_billing_month("2025-03-15"), march);
        assert_eq!(parse_billing_month("13.2025"), None);
        assert_eq!(parse_billing_month("mart"), None);
    }

    #[test]
    fn test_parse_row_ok() {
        let row: RawRow = [
            ("proizvod", "Horoskop"),
            ("mesec_pruzanja_usluge", "03.2025"),
            ("provajder", "Mobi Media"),
            ("fakturisan_iznos", "1200,50"),
            ("broj_transakcija", "42"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let parsed = parse_row(&row, false).unwrap();
        assert_eq!(parsed.provider_name.as_deref(), Some("Mobi Media"));
        let record = parsed.into_record(Uuid::nil(), Uuid::nil());
        assert_eq!(record.fakturisan_iznos, 1200.5);
        assert_eq!(record.broj_transakcija, 42);
        assert_eq!(record.naplacen_iznos, 0.0);
    }

    #[test]
    fn test_parse_row_errors_name_fields() {
        let row: RawRow = [
            ("mesec_pruzanja_usluge", "01.1999"),
            ("naplacen_iznos", "n/a"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let errors = parse_row(&row, true).unwrap_err();
        assert!(errors.contains(&"Missing or empty 'Proizvod'".to_string()));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("Unrealistic year in date for 'Mesec_pruzanja_usluge'")));
        assert!(errors.contains(&"Invalid number format for 'Naplacen_iznos': \"n/a\"".to_string()));
        assert!(!errors.iter().any(|e| e.contains("Provajder")));
    }

    #[test]
    fn test_formula_rows() {
        assert!(is_formula_row("1"));
        assert!(is_formula_row("12"));
        assert!(!is_formula_row("123"));
        assert!(!is_formula_row("SMS 1"));
    }
}
