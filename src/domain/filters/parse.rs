use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;

use crate::domain::filters::base::FilterError;

pub const MSG_REQUIRED: &str = "Please enter a value";
pub const MSG_INTEGER: &str = "Please enter an integer value";
pub const MSG_NUMBER: &str = "Please enter a number";
pub const MSG_INVALID_DATE: &str = "invalid date";
pub const MSG_INVALID_TIME: &str = "invalid time";
pub const MSG_OUT_OF_RANGE: &str = "date filter given is out of range";

pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 9999;

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub fn required(value: Option<&str>) -> Result<&str, FilterError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FilterError::invalid(MSG_REQUIRED)),
    }
}

pub fn parse_int(value: &str) -> Result<i64, FilterError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| FilterError::invalid(MSG_INTEGER))
}

pub fn int_in_range(value: i64, min: Option<i64>, max: Option<i64>) -> Result<i64, FilterError> {
    if let Some(min) = min {
        if value < min {
            return Err(FilterError::invalid(format!(
                "Please enter a number that is {min} or greater"
            )));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(FilterError::invalid(format!(
                "Please enter a number that is {max} or smaller"
            )));
        }
    }
    Ok(value)
}

/// Optional integer: blank gives `None`, garbage is an error.
pub fn optional_int(
    value: Option<&str>,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<Option<i64>, FilterError> {
    if is_blank(value) {
        return Ok(None);
    }
    let parsed = parse_int(value.unwrap_or_default())?;
    int_in_range(parsed, min, max).map(Some)
}

/// Decimal straight from the submitted text, after checking it looks numeric.
pub fn parse_decimal(value: &str) -> Result<Decimal, FilterError> {
    let value = value.trim();
    let numeric_shaped = value.parse::<f64>().is_ok_and(f64::is_finite);
    if !numeric_shaped {
        return Err(FilterError::invalid(MSG_NUMBER));
    }
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| FilterError::invalid(MSG_NUMBER))
}

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%m.%d.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M",
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%I:%M %p",
    "%I:%M%p",
    "%I:%M:%S %p",
];

const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses the loose date/datetime shapes users type into filter boxes.
///
/// A bare four digit year keeps `today`'s month and day.
pub fn parse_datetime(value: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 4 && value.chars().all(|ch| ch.is_ascii_digit()) {
        let year = value.parse::<i32>().ok()?;
        return same_day_in_year(today, year).and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    if value.len() == 8 && value.chars().all(|ch| ch.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    for format in ISO_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    for date_format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, date_format) {
            return date.and_hms_opt(0, 0, 0);
        }
        for time_format in TIME_FORMATS {
            let format = format!("{date_format} {time_format}");
            if let Ok(parsed) = NaiveDateTime::parse_from_str(value, &format) {
                return Some(parsed);
            }
        }
    }

    None
}

pub fn parse_date(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_datetime(value, today).map(|parsed| parsed.date())
}

/// Year guard against parsers reading two-digit or junk years literally.
pub fn check_year(year: i32) -> Result<(), FilterError> {
    int_in_range(i64::from(year), Some(MIN_YEAR), None).map(|_| ())
}

pub fn parse_time(value: &str, format: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), format).ok()
}

fn same_day_in_year(today: NaiveDate, year: i32) -> Option<NaiveDate> {
    (0..4).find_map(|back| NaiveDate::from_ymd_opt(year, today.month(), today.day() - back))
}

pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, FilterError> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .filter(|shifted| (1..=MAX_YEAR).contains(&i64::from(shifted.year())))
        .ok_or_else(|| FilterError::invalid(MSG_OUT_OF_RANGE))
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN))
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_common_date_shapes() {
        let today = ymd(2012, 1, 1);
        assert_eq!(parse_date("12/31/2010", today), Some(ymd(2010, 12, 31)));
        assert_eq!(parse_date("1/5/10", today), Some(ymd(2010, 1, 5)));
        assert_eq!(parse_date("2010-12-31", today), Some(ymd(2010, 12, 31)));
        assert_eq!(parse_date("Dec 31, 2010", today), Some(ymd(2010, 12, 31)));
        assert_eq!(parse_date("31 Dec 2010", today), Some(ymd(2010, 12, 31)));
        assert_eq!(parse_date("foo", today), None);
        assert_eq!(parse_date("", today), None);
    }

    #[test]
    fn bare_year_keeps_reference_month_and_day() {
        assert_eq!(parse_date("2010", ymd(2012, 3, 15)), Some(ymd(2010, 3, 15)));
        assert_eq!(parse_date("2011", ymd(2012, 2, 29)), Some(ymd(2011, 2, 28)));
    }

    #[test]
    fn parses_times_alongside_dates() {
        let today = ymd(2012, 1, 1);
        let parsed = parse_datetime("12/31/2010 10:26 PM", today).expect("should parse");
        assert_eq!(
            parsed,
            ymd(2010, 12, 31).and_hms_opt(22, 26, 0).expect("valid time")
        );
        let iso = parse_datetime("2010-12-31T00:00:00", today).expect("should parse");
        assert_eq!(iso, start_of_day(ymd(2010, 12, 31)));
    }

    #[test]
    fn year_and_integer_messages() {
        assert_eq!(
            check_year(1899).expect_err("1899 is too early").to_string(),
            "Please enter a number that is 1900 or greater"
        );
        assert_eq!(
            optional_int(Some("10000"), Some(1900), Some(9999))
                .expect_err("too late")
                .to_string(),
            "Please enter a number that is 9999 or smaller"
        );
        assert_eq!(optional_int(Some(""), None, None), Ok(None));
        assert_eq!(
            parse_int("ab").expect_err("not an int").to_string(),
            MSG_INTEGER
        );
    }

    #[test]
    fn decimals_keep_their_digits() {
        let parsed = parse_decimal("1.10").expect("should parse");
        assert_eq!(parsed.to_string(), "1.10");
        assert!(parse_decimal("1.1.1").is_err());
        assert!(parse_decimal("nan").is_err());
    }

    #[test]
    fn day_shift_overflow_is_invalid() {
        let today = ymd(2012, 1, 1);
        assert_eq!(shift_days(today, -10), Ok(ymd(2011, 12, 22)));
        assert_eq!(
            shift_days(today, 10_000_000_000).expect_err("overflows"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert_eq!(
            shift_days(today, -10_000_000).expect_err("before year 1"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert_eq!(shift_days(ymd(9999, 12, 30), 1), Ok(ymd(9999, 12, 31)));
        assert!(shift_days(ymd(9999, 12, 31), 1).is_err());
    }
}
