//! Calendar collaborator: day-offset to calendar-date conversion.
//!
//! The engine schedules in whole-day offsets; the presentation layer turns
//! those into `dd/mm` strings through this module. Dates are accepted as
//! `dd/mm/yyyy`, or `dd/mm` with the current year assumed.

use chrono::{Datelike, Duration, Local, NaiveDate};
use thiserror::Error;

/// Error types for calendar-date handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("no date given")]
    Empty,
    #[error("date must match dd/mm/yyyy")]
    BadFormat,
    #[error("year must lie between 1900 and 2100")]
    YearOutOfRange,
    #[error("month must lie between 1 and 12")]
    MonthOutOfRange,
    #[error("day {day} does not exist in month {month}")]
    DayOutOfRange { day: u32, month: u32 },
    #[error("unrecognized date format: {0}")]
    UnrecognizedFormat(String),
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `s` has the exact shape `dd/mm/yyyy` (digits only; no range
/// checks).
pub(crate) fn matches_full_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 3
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[2].len() == 4
        && parts.iter().all(|p| is_digits(p))
}

fn matches_short_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 2
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts.iter().all(|p| is_digits(p))
}

/// Add `delta_days` (possibly negative) to a `dd/mm/yyyy` or `dd/mm` date
/// and render the result as `dd/mm`.
///
/// A `dd/mm` input is interpreted in the current year.
pub fn add_days(date: &str, delta_days: i64) -> Result<String, DateError> {
    let full;
    let text = if matches_full_date(date) {
        date
    } else if matches_short_date(date) {
        full = format!("{}/{}", date, Local::now().date_naive().year());
        &full
    } else {
        return Err(DateError::UnrecognizedFormat(date.to_string()));
    };

    let parsed =
        NaiveDate::parse_from_str(text, "%d/%m/%Y").map_err(|_| DateError::BadFormat)?;
    let shifted = parsed + Duration::days(delta_days);
    Ok(shifted.format("%d/%m").to_string())
}

/// Validate a `dd/mm/yyyy` date: strict shape, year in [1900, 2100],
/// month in [1, 12], day within the month's leap-aware bounds.
pub fn validate_date(date: &str) -> Result<(), DateError> {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return Err(DateError::Empty);
    }
    if !matches_full_date(trimmed) {
        return Err(DateError::BadFormat);
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    let day: u32 = parts[0].parse().map_err(|_| DateError::BadFormat)?;
    let month: u32 = parts[1].parse().map_err(|_| DateError::BadFormat)?;
    let year: i32 = parts[2].parse().map_err(|_| DateError::BadFormat)?;

    if !(1900..=2100).contains(&year) {
        return Err(DateError::YearOutOfRange);
    }
    if !(1..=12).contains(&month) {
        return Err(DateError::MonthOutOfRange);
    }
    if day < 1 || NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return Err(DateError::DayOutOfRange { day, month });
    }

    Ok(())
}

/// Boolean form of [`validate_date`], for callers that only branch.
pub fn is_valid_date(date: &str) -> bool {
    validate_date(date).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_days_full_format() {
        assert_eq!(add_days("15/03/2025", 10).unwrap(), "25/03");
        assert_eq!(add_days("15/03/2025", -14).unwrap(), "01/03");
        // Month rollover.
        assert_eq!(add_days("28/02/2025", 2).unwrap(), "02/03");
        // Leap year keeps the 29th.
        assert_eq!(add_days("28/02/2024", 1).unwrap(), "29/02");
    }

    #[test]
    fn test_add_days_short_format_uses_current_year() {
        // Whatever the year, day arithmetic within March is stable.
        assert_eq!(add_days("10/03", 5).unwrap(), "15/03");
    }

    #[test]
    fn test_add_days_rejects_garbage() {
        assert!(matches!(
            add_days("3/2025", 1),
            Err(DateError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            add_days("tomorrow", 1),
            Err(DateError::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_validate_date() {
        assert!(is_valid_date("01/01/2000"));
        assert!(is_valid_date("31/12/2100"));

        assert_eq!(validate_date(""), Err(DateError::Empty));
        assert_eq!(validate_date("1/1/2000"), Err(DateError::BadFormat));
        assert_eq!(validate_date("01/01/1899"), Err(DateError::YearOutOfRange));
        assert_eq!(validate_date("01/01/2101"), Err(DateError::YearOutOfRange));
        assert_eq!(validate_date("01/13/2000"), Err(DateError::MonthOutOfRange));
        assert_eq!(
            validate_date("31/04/2000"),
            Err(DateError::DayOutOfRange { day: 31, month: 4 })
        );
    }

    #[test]
    fn test_validate_date_leap_years() {
        assert!(is_valid_date("29/02/2024"));
        assert!(is_valid_date("29/02/2000"));
        assert!(!is_valid_date("29/02/2023"));
        // 1900 is not a leap year (divisible by 100, not by 400).
        assert!(!is_valid_date("29/02/1900"));
    }
}
