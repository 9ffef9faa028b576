//! Date ranges shared by the date and datetime filters.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};

use crate::domain::entities::operator::Op;
use crate::domain::entities::query::Dialect;
use crate::domain::filters::parse::{end_of_day, start_of_day};

const DISPLAY_FORMAT: &str = "%m/%d/%Y";

/// A processed date filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum DateArg {
    Day(NaiveDate),
    Instant(NaiveDateTime),
    Count(i64),
}

impl DateArg {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            DateArg::Day(day) => Some(day),
            DateArg::Instant(instant) => Some(instant.date()),
            DateArg::Count(_) => None,
        }
    }

    pub fn count(self) -> Option<i64> {
        match self {
            DateArg::Count(count) => Some(count),
            _ => None,
        }
    }
}

pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Sunday through Saturday around `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = u64::from(today.weekday().num_days_from_sunday());
    let sunday = today.checked_sub_days(Days::new(back)).unwrap_or(today);
    let saturday = sunday.checked_add_days(Days::new(6)).unwrap_or(sunday);
    (sunday, saturday)
}

pub fn last_month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (first_this_month, _) = month_bounds(today);
    let previous = first_this_month.pred_opt().unwrap_or(first_this_month);
    month_bounds(previous)
}

pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Month `-1` stands for the whole year; anything else outside 1..=12 selects nothing.
pub fn select_month_bounds(month: Option<i64>, year: Option<i64>) -> Option<(NaiveDate, NaiveDate)> {
    let year = i32::try_from(year?).ok()?;
    match month? {
        -1 => year_bounds(year),
        month @ 1..=12 => {
            let first = NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, 1)?;
            Some(month_bounds(first))
        }
        _ => None,
    }
}

/// Ranges for the operators that need no input value.
pub fn bucket_range(op: Op, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match op {
        Op::Today => Some((today, today)),
        Op::ThisWeek => Some(week_bounds(today)),
        Op::ThisMonth => Some(month_bounds(today)),
        Op::LastMonth => Some(last_month_bounds(today)),
        Op::ThisYear => year_bounds(today.year()),
        _ => None,
    }
}

fn ordered(a: NaiveDate, b: NaiveDate) -> (NaiveDate, NaiveDate) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn offset(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    chrono::TimeDelta::try_days(days).and_then(|delta| today.checked_add_signed(delta))
}

/// First and last day covered by the filter, for callers that report on them.
pub fn first_last_day(
    op: Op,
    today: NaiveDate,
    value1: Option<DateArg>,
    value2: Option<DateArg>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    if let Some((first, last)) = bucket_range(op, today) {
        return (Some(first), Some(last));
    }
    let day1 = value1.and_then(DateArg::date);
    let day2 = value2.and_then(DateArg::date);
    let count = value1.and_then(DateArg::count);
    match op {
        Op::SelectMonth => select_month_bounds(count, value2.and_then(DateArg::count))
            .map_or((None, None), |(first, last)| (Some(first), Some(last))),
        Op::Between | Op::NotBetween => match (day1, day2) {
            (Some(a), Some(b)) => {
                let (first, last) = ordered(a, b);
                (Some(first), Some(last))
            }
            _ => (None, None),
        },
        Op::DaysAgo => {
            let target = count.and_then(|n| offset(today, -n));
            (target, target)
        }
        Op::LessThanDaysAgo => (count.and_then(|n| offset(today, -n)), Some(today)),
        Op::MoreThanDaysAgo => (None, count.and_then(|n| offset(today, -n))),
        Op::InDays => {
            let target = count.and_then(|n| offset(today, n));
            (target, target)
        }
        Op::InLessThanDays => (Some(today), count.and_then(|n| offset(today, n))),
        Op::InMoreThanDays => (count.and_then(|n| offset(today, n)), None),
        Op::Eq => (day1, day1),
        _ => (None, None),
    }
}

fn show(day: NaiveDate) -> String {
    day.format(DISPLAY_FORMAT).to_string()
}

/// Natural-language description of a date filter's state.
pub fn describe(
    op: Option<Op>,
    error: bool,
    op_is_default: bool,
    today: NaiveDate,
    value1: Option<DateArg>,
    value2: Option<DateArg>,
) -> String {
    if error {
        return "invalid".to_string();
    }
    let bucket = op.and_then(|op| bucket_range(op, today));
    let Some(op) = op else {
        return "all".to_string();
    };
    if bucket.is_none() && op != Op::SelectMonth && op_is_default && value1.is_none() && value2.is_none() {
        return "all".to_string();
    }

    if op == Op::Today {
        return show(today);
    }
    if let Some((first, last)) = bucket {
        return format!("{} - {}", show(first), show(last));
    }

    let count = value1.and_then(DateArg::count);
    let day1 = value1.and_then(DateArg::date);
    match op {
        Op::SelectMonth => {
            let (Some(month), Some(year)) = (count, value2.and_then(DateArg::count)) else {
                return "All".to_string();
            };
            if !(1..=12).contains(&month) {
                return year.to_string();
            }
            i32::try_from(year)
                .ok()
                .zip(u32::try_from(month).ok())
                .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
                .map(|first| first.format("%b %Y").to_string())
                .unwrap_or_else(|| "All".to_string())
        }
        Op::Between | Op::NotBetween => {
            let prefix = if op == Op::NotBetween { "excluding " } else { "" };
            match (day1, value2.and_then(DateArg::date)) {
                (Some(a), Some(b)) => {
                    let (first, last) = ordered(a, b);
                    format!("{prefix}{} - {}", show(first), show(last))
                }
                _ => "all".to_string(),
            }
        }
        Op::LessThanDaysAgo | Op::InLessThanDays => {
            match first_last_day(op, today, value1, value2) {
                (Some(first), Some(last)) => format!("{} - {}", show(first), show(last)),
                _ => "all".to_string(),
            }
        }
        Op::DaysAgo | Op::MoreThanDaysAgo | Op::InDays | Op::InMoreThanDays => {
            let sign = if matches!(op, Op::DaysAgo | Op::MoreThanDaysAgo) {
                -1
            } else {
                1
            };
            let prefix = match op {
                Op::MoreThanDaysAgo => "before ",
                Op::InMoreThanDays => "after ",
                _ => "",
            };
            count
                .and_then(|n| offset(today, sign * n))
                .map(|target| format!("{prefix}{}", show(target)))
                .unwrap_or_else(|| "all".to_string())
        }
        Op::Empty => "date not specified".to_string(),
        Op::NotEmpty => "any date".to_string(),
        Op::Eq | Op::NotEq | Op::LessThanEqual | Op::GreaterThanEqual => {
            let prefix = match op {
                Op::NotEq => "excluding ",
                Op::LessThanEqual => "up to ",
                Op::GreaterThanEqual => "beginning ",
                _ => "",
            };
            day1.map(|day| format!("{prefix}{}", show(day)))
                .unwrap_or_else(|| "all".to_string())
        }
        _ => "all".to_string(),
    }
}

/// Whether a comparison value fits the storage range of the given backend.
///
/// Unknown or missing dialects accept everything.
pub fn valid_date_for_backend(value: NaiveDateTime, dialect: Option<&Dialect>) -> bool {
    let bounds = match dialect {
        Some(Dialect::Mssql) => NaiveDate::from_ymd_opt(1753, 1, 1).zip(
            NaiveDate::from_ymd_opt(9999, 12, 31).and_then(|d| d.and_hms_opt(23, 59, 59)),
        ),
        Some(Dialect::Sqlite) => NaiveDate::from_ymd_opt(0, 1, 1)
            .zip(NaiveDate::from_ymd_opt(9999, 12, 31).map(end_of_day)),
        Some(Dialect::Postgresql) => {
            NaiveDate::from_ymd_opt(-4712, 1, 1).zip(Some(NaiveDateTime::MAX))
        }
        _ => None,
    };
    match bounds {
        Some((min, max)) => start_of_day(min) <= value && value <= max,
        None => true,
    }
}
