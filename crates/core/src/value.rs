//! Shared value-parsing primitives.
//!
//! Every analyzer goes through these helpers so that emptiness, number
//! and date semantics stay identical across checks.

use chrono::{NaiveDate, NaiveDateTime};

/// Date and datetime formats accepted across the project, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

/// Datetime formats accepted across the project, tried in order.
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Whether a raw value counts as empty (missing or whitespace-only).
pub fn is_empty(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty(),
    }
}

/// Parse a number, tolerating a comma decimal separator.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parse a date or datetime string against the known format list.
///
/// Datetime formats are tried first so `2024-01-15 14:30` does not lose
/// its time component; a bare date parses to midnight.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a value as an integer (no decimal point allowed).
pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty() {
        assert!(is_empty(None));
        assert!(is_empty(Some("")));
        assert!(is_empty(Some("   ")));
        assert!(!is_empty(Some("0")));
        assert!(!is_empty(Some(" x ")));
    }

    #[test]
    fn test_parse_number_comma_decimal() {
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number(" 80 "), Some(80.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = parse_date("2024-01-15").unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let d = parse_date("15/01/2024").unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let dt = parse_date("2024-01-15 14:30").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "14:30");

        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer(" -3 "), Some(-3));
        assert_eq!(parse_integer("3.5"), None);
    }
}
