use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};

use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{lit, Dialect, Expr, Predicate, Query};
use crate::domain::filters::base::{
    begin_set, cast_contains_predicate, fail, unrecognized, Filter, FilterConfig, FilterError,
    FilterState, RawInput, SearchExpr,
};
use crate::domain::filters::calendar::{
    bucket_range, describe, first_last_day, select_month_bounds, valid_date_for_backend, DateArg,
};
use crate::domain::filters::date::{process_counts, target_day, DATE_OPERATORS};
use crate::domain::filters::parse::{
    check_year, end_of_day, is_blank, parse_datetime, required, start_of_day, MSG_INVALID_DATE,
};

const DISPLAY_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// A parsed instant and whether the user typed only a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Typed {
    instant: NaiveDateTime,
    date_only: bool,
}

fn parse_typed(value: &str, today: NaiveDate) -> Result<Typed, FilterError> {
    let instant =
        parse_datetime(value, today).ok_or_else(|| FilterError::invalid(MSG_INVALID_DATE))?;
    check_year(instant.year())?;
    let midnight = instant.hour() == 0 && instant.minute() == 0 && instant.second() == 0;
    Ok(Typed {
        instant,
        date_only: midnight && !value.contains("00:00"),
    })
}

fn day_window(column: &Expr, day: NaiveDate) -> Predicate {
    column
        .clone()
        .between(lit(start_of_day(day)), lit(end_of_day(day)))
}

/// Date filter over timestamp columns; dates without a time cover the whole day.
#[derive(Debug, Clone)]
pub struct DateTimeFilter {
    config: FilterConfig,
    now: Option<NaiveDateTime>,
    state: FilterState,
    value1: Option<DateArg>,
    value2: Option<DateArg>,
    date_only1: bool,
    date_only2: bool,
    first_day: Option<NaiveDate>,
    last_day: Option<NaiveDate>,
}

impl DateTimeFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            now: None,
            state: FilterState::default(),
            value1: None,
            value2: None,
            date_only1: false,
            date_only2: false,
            first_day: None,
            last_day: None,
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Local::now().naive_local())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn value1(&self) -> Option<DateArg> {
        self.value1
    }

    pub fn value2(&self) -> Option<DateArg> {
        self.value2
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.first_day
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.last_day
    }

    pub fn valid_date_for_backend(&self, value: NaiveDateTime) -> bool {
        valid_date_for_backend(value, self.config.dialect.as_ref())
    }

    fn process(&self, input: &RawInput) -> Result<(Option<Typed>, Option<Typed>), FilterError> {
        let today = self.today();
        let first = parse_typed(required(input.value1())?, today)?;
        let second = match input.op {
            Op::Between | Op::NotBetween if is_blank(input.value2()) => Some(Typed {
                instant: self.now(),
                date_only: false,
            }),
            Op::Between | Op::NotBetween => Some(parse_typed(
                input.value2().unwrap_or_default(),
                today,
            )?),
            _ => None,
        };
        match second {
            Some(second) if second.instant < first.instant => Ok((Some(second), Some(first))),
            second => Ok((Some(first), second)),
        }
    }

    fn format_display_values(&mut self) {
        let single = matches!(
            self.state.op,
            Some(Op::Eq | Op::NotEq | Op::LessThanEqual | Op::GreaterThanEqual)
        );
        let double = matches!(self.state.op, Some(Op::Between | Op::NotBetween));
        if let (true, Some(DateArg::Instant(instant))) = (single || double, self.value1) {
            let format = if single && self.date_only1 {
                "%m/%d/%Y"
            } else {
                DISPLAY_FORMAT
            };
            self.state.value1_set_with = Some(instant.format(format).to_string());
        }
        if let (true, Some(DateArg::Instant(instant))) = (double, self.value2) {
            let format = if self.date_only2 {
                "%m/%d/%Y 11:59 PM"
            } else {
                DISPLAY_FORMAT
            };
            self.state.value2_set_with = Some(instant.format(format).to_string());
        }
    }

    fn instant1(&self) -> Option<NaiveDateTime> {
        match self.value1 {
            Some(DateArg::Instant(instant)) => Some(instant),
            _ => None,
        }
    }
}

impl Filter for DateTimeFilter {
    fn kind(&self) -> &'static str {
        "DateTimeFilter"
    }

    fn operators(&self) -> &'static [Op] {
        DATE_OPERATORS
    }

    fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn set_list(
        &mut self,
        op: Option<&str>,
        values1: &[String],
        value2: Option<&str>,
    ) -> Result<(), FilterError> {
        self.value1 = None;
        self.value2 = None;
        self.date_only1 = false;
        self.date_only2 = false;
        self.first_day = None;
        self.last_day = None;
        let Some(input) = begin_set(
            &self.config,
            &mut self.state,
            DATE_OPERATORS,
            op,
            values1,
            value2,
        )?
        else {
            return Ok(());
        };

        let today = self.today();
        let skip = input.is_unfilled_default(input.value1()) || input.op.takes_no_value();
        let counts = if skip {
            Ok(Some((None, None)))
        } else {
            process_counts(&input, today)
        };
        match fail(&mut self.state, counts)? {
            Some((value1, value2)) => {
                self.value1 = value1;
                self.value2 = value2;
            }
            None => {
                let processed = self.process(&input);
                let (first, second) = fail(&mut self.state, processed)?;
                self.value1 = first.map(|typed| DateArg::Instant(typed.instant));
                self.value2 = second.map(|typed| DateArg::Instant(typed.instant));
                self.date_only1 = first.is_some_and(|typed| typed.date_only);
                self.date_only2 = second.is_some_and(|typed| typed.date_only);
                self.format_display_values();
            }
        }

        let (first_day, last_day) = first_last_day(input.op, today, self.value1, self.value2);
        self.first_day = first_day;
        self.last_day = last_day;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        if !self.is_active() {
            return Ok(query);
        }
        let Some(op) = self.state.op else {
            return Ok(query);
        };
        let today = self.today();
        let column = self.config.column.clone();

        if let Some((first, last)) = bucket_range(op, today) {
            let range = column.between(lit(start_of_day(first)), lit(end_of_day(last)));
            return Ok(query.filter(range));
        }
        if op == Op::SelectMonth {
            let month = self.value1.and_then(DateArg::count);
            let year = self.value2.and_then(DateArg::count);
            return Ok(match select_month_bounds(month, year) {
                Some((first, last)) => query.filter(
                    column.between(lit(start_of_day(first)), lit(end_of_day(last))),
                ),
                None => query,
            });
        }
        if self.state.op_is_default && self.value1.is_none() {
            return Ok(query);
        }

        let count = self.value1.and_then(DateArg::count);
        let instant = self.instant1();
        let predicate = match (op, instant, count) {
            (Op::DaysAgo | Op::InDays, _, Some(days)) => {
                day_window(&column, target_day(op, today, days)?)
            }
            (Op::LessThanDaysAgo, _, Some(days)) => {
                let target = target_day(op, today, days)?;
                return Ok(query
                    .filter(column.clone().gt(lit(end_of_day(target))))
                    .filter(column.lt(lit(start_of_day(today)))));
            }
            (Op::MoreThanDaysAgo, _, Some(days)) => {
                column.lt(lit(start_of_day(target_day(op, today, days)?)))
            }
            (Op::InLessThanDays, _, Some(days)) => {
                let target = target_day(op, today, days)?;
                return Ok(query
                    .filter(column.clone().gte(lit(self.now())))
                    .filter(column.lt(lit(start_of_day(target)))));
            }
            (Op::InMoreThanDays, _, Some(days)) => {
                column.gt(lit(end_of_day(target_day(op, today, days)?)))
            }
            (Op::Eq, Some(value), _) if self.date_only1 => day_window(&column, value.date()),
            (Op::NotEq, Some(value), _) if self.date_only1 => {
                day_window(&column, value.date()).negate()
            }
            (Op::LessThanEqual, Some(value), _) if self.date_only1 => {
                column.lte(lit(end_of_day(value.date())))
            }
            (Op::Between | Op::NotBetween, Some(low), _) => {
                let high = match self.value2 {
                    Some(DateArg::Instant(high)) if self.date_only2 => end_of_day(high.date()),
                    Some(DateArg::Instant(high)) => high,
                    _ => self.now(),
                };
                let range = column.between(lit(low), lit(high));
                if op == Op::NotBetween {
                    range.negate()
                } else {
                    range
                }
            }
            (Op::Eq, Some(value), _) => column.equals(lit(value)),
            (Op::NotEq, Some(value), _) => column.not_equals(lit(value)),
            (Op::LessThanEqual, Some(value), _) => column.lte(lit(value)),
            (Op::GreaterThanEqual, Some(value), _) => column.gte(lit(value)),
            (Op::Empty, _, _) => column.is_null(),
            (Op::NotEmpty, _, _) => column.is_not_null(),
            _ => return Err(unrecognized(Some(op))),
        };
        Ok(query.filter(predicate))
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        let column = self.config.column.clone();
        let dialect = self.config.dialect.clone();
        let today = self.today();
        Some(Box::new(move |term: &str| {
            let text_match = cast_contains_predicate(&column, term);
            match parse_datetime(term, today) {
                Some(parsed) if valid_date_for_backend(parsed, dialect.as_ref()) => {
                    Some(text_match.or(day_window(&column, parsed.date())))
                }
                _ => Some(text_match),
            }
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        let mut instance = DateTimeFilter::new(self.config.for_instance(dialect));
        instance.now = self.now;
        Ok(Box::new(instance))
    }

    fn description(&self) -> Option<String> {
        Some(describe(
            self.state.op,
            self.state.error,
            self.state.op_is_default,
            self.today(),
            self.value1,
            self.value2,
        ))
    }
}
