//! Event date labels
//!
//! Formats a start and optional end date as an uppercase English label:
//!
//! | start | end | label |
//! |---|---|---|
//! | 2025-03-05 | none | `MARCH 5, 2025` |
//! | 2025-03-05 | 2025-03-05 | `MARCH 5, 2025` |
//! | 2025-03-05 | 2025-04-07 | `MARCH 5 - APRIL 7, 2025` |
//! | 2024-12-30 | 2025-01-02 | `DECEMBER 30, 2024 - JANUARY 2, 2025` |
//!
//! Dates are compared by calendar day in UTC. The end is not reordered if
//! it precedes the start; callers validate that.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Date parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("Invalid date '{0}': expected ISO-8601 (e.g. 2025-03-05 or 2025-03-05T09:00:00Z)")]
    InvalidDate(String),
}

/// Format a date range label
pub fn format_date_range(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> String {
    let start_day = start.date_naive();
    let end_day = match end.map(|e| e.date_naive()) {
        Some(day) if day != start_day => day,
        _ => return full_date(start_day),
    };

    if start_day.year() == end_day.year() {
        format!("{} - {}", month_day(start_day), full_date(end_day))
    } else {
        format!("{} - {}", full_date(start_day), full_date(end_day))
    }
}

/// Parse ISO-8601 strings and format them with [`format_date_range`]
pub fn format_date_range_iso(start: &str, end: Option<&str>) -> Result<String, DateRangeError> {
    let start = parse_iso_datetime(start)?;
    let end = end
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_iso_datetime)
        .transpose()?;
    Ok(format_date_range(start, end))
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// (taken as UTC) or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_iso_datetime(input: &str) -> Result<DateTime<Utc>, DateRangeError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    Err(DateRangeError::InvalidDate(input.to_string()))
}

fn month_day(date: NaiveDate) -> String {
    date.format("%B %-d").to_string().to_uppercase()
}

fn full_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_single_date() {
        assert_eq!(format_date_range(utc(2025, 3, 5, 9), None), "MARCH 5, 2025");
    }

    #[test]
    fn test_same_day_collapses() {
        assert_eq!(
            format_date_range(utc(2025, 3, 5, 9), Some(utc(2025, 3, 5, 18))),
            "MARCH 5, 2025"
        );
    }

    #[test]
    fn test_same_year() {
        assert_eq!(
            format_date_range(utc(2025, 3, 5, 9), Some(utc(2025, 4, 7, 9))),
            "MARCH 5 - APRIL 7, 2025"
        );
        assert_eq!(
            format_date_range(utc(2025, 11, 10, 0), Some(utc(2025, 11, 12, 0))),
            "NOVEMBER 10 - NOVEMBER 12, 2025"
        );
    }

    #[test]
    fn test_different_years() {
        assert_eq!(
            format_date_range(utc(2024, 12, 30, 9), Some(utc(2025, 1, 2, 9))),
            "DECEMBER 30, 2024 - JANUARY 2, 2025"
        );
    }

    #[test]
    fn test_iso_inputs() {
        assert_eq!(
            format_date_range_iso("2025-03-05", Some("2025-04-07T10:00:00Z")).unwrap(),
            "MARCH 5 - APRIL 7, 2025"
        );
        assert_eq!(
            format_date_range_iso("2025-03-05T09:30:00", Some("")).unwrap(),
            "MARCH 5, 2025"
        );
        assert_eq!(
            format_date_range_iso("2025-03-05T23:30:00-02:00", None).unwrap(),
            "MARCH 6, 2025"
        );
        assert!(matches!(
            format_date_range_iso("5 March 2025", None),
            Err(DateRangeError::InvalidDate(_))
        ));
        assert!(format_date_range_iso("2025-03-05", Some("2025-02-30")).is_err());
    }

    fn day() -> impl Strategy<Value = DateTime<Utc>> {
        (1990i32..2100, 1u32..=12, 1u32..=28, 0u32..24).prop_map(|(y, m, d, h)| utc(y, m, d, h))
    }

    proptest! {
        #[test]
        fn equal_dates_never_form_a_range(start in day(), hour in 0u32..24) {
            let end = utc(start.year(), start.month(), start.day(), hour);
            let label = format_date_range(start, Some(end));
            prop_assert!(!label.contains(" - "));
            prop_assert_eq!(label, format_date_range(start, None));
        }

        #[test]
        fn same_year_appends_year_once(start in day(), days in 1i64..300) {
            let end = start + chrono::Duration::days(days);
            prop_assume!(end.year() == start.year());
            let label = format_date_range(start, Some(end));
            let year = start.year().to_string();
            prop_assert_eq!(label.matches(&year).count(), 1);
            let suffix = format!(", {}", year);
            prop_assert!(label.ends_with(&suffix));
            let first = label.split(" - ").next().unwrap_or_default();
            prop_assert!(!first.contains(','));
        }

        #[test]
        fn labels_are_uppercase(start in day(), end in day()) {
            let label = format_date_range(start, Some(end));
            prop_assert_eq!(label.to_uppercase(), label);
        }
    }
}
