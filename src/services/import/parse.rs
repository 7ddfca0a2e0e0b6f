//! Field parsers for exported CSV values
//!
//! Exports come from spreadsheets with Swiss/German conventions: dates as
//! `MM/DD/YYYY` or `DD.MM.YYYY`, decimal commas, currency prefixes (`CHF 16.00`)
//! and thousand separators (`1'250.50`, `1.250,50`).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d[\d.,]*").unwrap());

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%d.%m.%Y"];

/// Values that spreadsheet exports write for an empty cell
const MISSING_MARKERS: &[&str] = &["nan", "null", "none", "n/a"];

/// Returns true for blank cells and the textual missing markers
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Parse a date, trying `MM/DD/YYYY` first and `DD.MM.YYYY` second
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Extract the numeric part of a value (`CHF 16.00`, `12,5 kWh`, `1.250,50`).
///
/// When both `.` and `,` occur, the last one is the decimal separator.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned = value.replace(['\'', '’'], "");
    let number = NUMBER_RE.find(&cleaned)?.as_str().trim_end_matches(['.', ',']);
    let normalized = match (number.rfind('.'), number.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => number.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => number.replace(',', ""),
        _ => number.replace(',', "."),
    };
    normalized.parse().ok()
}

/// Map the device category vocabulary of legacy exports.
///
/// Unmapped categories fall back to `dehumidifier`, the bulk of the fleet.
pub fn map_legacy_category(category: Option<&str>) -> &'static str {
    match category.map(str::trim) {
        Some("Entfeuchter") => "dehumidifier",
        Some("Ventilator") => "fan",
        Some("Heizung") => "heater",
        Some("Dämmschichttrocknung") => "insulation_dryer",
        Some("Sensor") => "sensor",
        _ => "dehumidifier",
    }
}

/// Join the present parts with a separator; `None` when nothing is present
pub fn join_present(parts: &[Option<&str>], separator: &str) -> Option<String> {
    let present: Vec<&str> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(separator))
    }
}

/// Render a number for free-text logs, falling back to the raw cell
pub fn display_number(raw: &str) -> String {
    match raw.trim().replace(',', ".").parse::<f64>() {
        Ok(value) => value.to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_us_format() {
        assert_eq!(parse_date("04/10/2025"), NaiveDate::from_ymd_opt(2025, 4, 10));
    }

    #[test]
    fn test_parse_date_swiss_format() {
        assert_eq!(parse_date("10.04.2025"), NaiveDate::from_ymd_opt(2025, 4, 10));
        assert_eq!(parse_date(" 1.2.2024 "), NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("31.02.2025"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_decimal_strips_currency_and_units() {
        assert_eq!(parse_decimal("CHF 16.00"), Some(16.0));
        assert_eq!(parse_decimal("12,5 kWh"), Some(12.5));
        assert_eq!(parse_decimal("1'250.50"), Some(1250.5));
        assert_eq!(parse_decimal("42"), Some(42.0));
    }

    #[test]
    fn test_parse_decimal_thousand_separators() {
        assert_eq!(parse_decimal("1.250,50"), Some(1250.5));
        assert_eq!(parse_decimal("CHF 1,250.50"), Some(1250.5));
        assert_eq!(parse_decimal("16."), Some(16.0));
    }

    #[test]
    fn test_parse_decimal_without_digits() {
        assert_eq!(parse_decimal("gratis"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("nan"));
        assert!(is_missing("NaN"));
        assert!(is_missing("NULL"));
        assert!(!is_missing("0"));
        assert!(!is_missing("D-1"));
    }

    #[test]
    fn test_map_legacy_category() {
        assert_eq!(map_legacy_category(Some("Ventilator")), "fan");
        assert_eq!(map_legacy_category(Some("Dämmschichttrocknung")), "insulation_dryer");
        assert_eq!(map_legacy_category(Some("Unbekannt")), "dehumidifier");
        assert_eq!(map_legacy_category(None), "dehumidifier");
    }

    #[test]
    fn test_join_present() {
        assert_eq!(
            join_present(&[Some("Firma AG"), None, Some("Hans Muster")], " - "),
            Some("Firma AG - Hans Muster".to_string())
        );
        assert_eq!(join_present(&[None, None], ", "), None);
    }

    #[test]
    fn test_display_number() {
        assert_eq!(display_number("12,5"), "12.5");
        assert_eq!(display_number("trocken"), "trocken");
    }
}
