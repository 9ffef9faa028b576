use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::entities::query::Literal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericStyle {
    #[default]
    General,
    Percent,
    Accounting,
}

/// Number rendering options: separators, currency symbol and sign decorations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericFormat {
    pub style: NumericStyle,
    pub places: u32,
    pub curr: String,
    pub sep: String,
    pub dp: String,
    pub pos: String,
    pub neg: String,
    pub trailneg: String,
    pub xls_neg_red: bool,
}

impl Default for NumericFormat {
    fn default() -> Self {
        Self {
            style: NumericStyle::General,
            places: 2,
            curr: String::new(),
            sep: ",".to_string(),
            dp: ".".to_string(),
            pos: String::new(),
            neg: "-".to_string(),
            trailneg: String::new(),
            xls_neg_red: true,
        }
    }
}

impl NumericFormat {
    pub fn percent() -> Self {
        Self {
            style: NumericStyle::Percent,
            ..Self::default()
        }
    }

    pub fn accounting() -> Self {
        Self {
            style: NumericStyle::Accounting,
            ..Self::default()
        }
    }

    pub fn places(mut self, places: u32) -> Self {
        self.places = places;
        self
    }

    pub fn currency(mut self, curr: impl Into<String>) -> Self {
        self.curr = curr.into();
        self
    }

    /// Text rendering used for html and csv output.
    pub fn format(&self, value: Decimal) -> String {
        match self.style {
            NumericStyle::General => group_digits(
                value,
                self.places,
                &self.curr,
                &self.sep,
                &self.dp,
                &self.pos,
                &self.neg,
                &self.trailneg,
            ),
            NumericStyle::Percent => {
                let mut text = group_digits(
                    value * Decimal::ONE_HUNDRED,
                    self.places,
                    &self.curr,
                    &self.sep,
                    &self.dp,
                    &self.pos,
                    &self.neg,
                    &self.trailneg,
                );
                text.push('%');
                text
            }
            NumericStyle::Accounting => {
                group_digits(value, 2, "$", &self.sep, &self.dp, &self.pos, "(", ")")
            }
        }
    }

    /// Spreadsheet number format equivalent to [`NumericFormat::format`].
    pub fn xls_num_format(&self) -> String {
        let neg_prefix = if self.xls_neg_red { "[RED]" } else { "" };
        let dec = if self.places > 0 {
            format!(".{}", "0".repeat(self.places as usize))
        } else {
            String::new()
        };
        match self.style {
            NumericStyle::General => format!("#,##0{dec};{neg_prefix}-#,##0{dec}"),
            NumericStyle::Percent => format!("0{dec}%;{neg_prefix}-0{dec}%"),
            NumericStyle::Accounting => format!(
                "_($* #,##0{dec}_);{neg_prefix}_($* (#,##0{dec});_($* \"-\"??_);_(@_)"
            ),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn group_digits(
    value: Decimal,
    places: u32,
    curr: &str,
    sep: &str,
    dp: &str,
    pos: &str,
    neg: &str,
    trailneg: &str,
) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.*}", places as usize, rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

    let mut grouped = String::new();
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push_str(sep);
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    out.push_str(if negative { neg } else { pos });
    out.push_str(curr);
    out.push_str(&grouped);
    if places > 0 {
        out.push_str(dp);
        out.push_str(fraction);
    }
    if negative {
        out.push_str(trailneg);
    }
    out
}

pub fn to_decimal(value: &Literal) -> Option<Decimal> {
    match value {
        Literal::Int(v) => Some(Decimal::from(*v)),
        Literal::Real(v) => Decimal::try_from(*v).ok(),
        Literal::Decimal(v) => Some(*v),
        Literal::Bool(v) => Some(Decimal::from(i64::from(*v))),
        Literal::Text(v) => Decimal::from_str(v.trim()).ok(),
        _ => None,
    }
}

pub fn to_f64(value: &Literal) -> Option<f64> {
    match value {
        Literal::Real(v) => Some(*v),
        other => to_decimal(other).and_then(|d| d.to_f64()),
    }
}

const STORED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Reads a stored date, datetime or time value; times land on 1900-01-01.
pub fn to_datetime(value: &Literal) -> Option<NaiveDateTime> {
    match value {
        Literal::Date(d) => d.and_hms_opt(0, 0, 0),
        Literal::DateTime(dt) => Some(*dt),
        Literal::Time(t) => NaiveDate::from_ymd_opt(1900, 1, 1).map(|d| d.and_time(*t)),
        Literal::Text(text) => {
            let text = text.trim();
            STORED_DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .or_else(|| {
                    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
                        .iter()
                        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
                        .and_then(|t| NaiveDate::from_ymd_opt(1900, 1, 1).map(|d| d.and_time(t)))
                })
        }
        _ => None,
    }
}

/// Plain text for a value with no column-specific formatting.
pub fn display_text(value: &Literal) -> String {
    match value {
        Literal::Null => String::new(),
        Literal::Bool(flag) => flag.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::Real(v) => v.to_string(),
        Literal::Decimal(v) => v.to_string(),
        Literal::Text(v) => v.clone(),
        Literal::Date(v) => v.to_string(),
        Literal::DateTime(v) => v.to_string(),
        Literal::Time(v) => v.to_string(),
    }
}

pub fn is_truthy(value: &Literal) -> bool {
    match value {
        Literal::Null => false,
        Literal::Bool(flag) => *flag,
        Literal::Int(v) => *v != 0,
        Literal::Real(v) => *v != 0.0,
        Literal::Decimal(v) => !v.is_zero(),
        Literal::Text(v) => !v.is_empty(),
        Literal::Date(_) | Literal::DateTime(_) | Literal::Time(_) => true,
    }
}
