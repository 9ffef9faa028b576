use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{lit, Dialect, Expr, Query};
use crate::domain::filters::base::{
    begin_set, cast_contains_predicate, fail, unrecognized, Filter, FilterConfig, FilterError,
    FilterState, RawInput, SearchExpr,
};
use crate::domain::filters::calendar::{
    bucket_range, describe, first_last_day, select_month_bounds, valid_date_for_backend, DateArg,
};
use crate::domain::filters::parse::{
    check_year, is_blank, optional_int, parse_date, parse_datetime, parse_int, required,
    shift_days, MAX_YEAR, MIN_YEAR, MSG_INVALID_DATE,
};

pub(crate) const DATE_OPERATORS: &[Op] = &[
    Op::Eq,
    Op::NotEq,
    Op::LessThanEqual,
    Op::GreaterThanEqual,
    Op::Between,
    Op::NotBetween,
    Op::DaysAgo,
    Op::LessThanDaysAgo,
    Op::MoreThanDaysAgo,
    Op::Today,
    Op::ThisWeek,
    Op::InDays,
    Op::InLessThanDays,
    Op::InMoreThanDays,
    Op::Empty,
    Op::NotEmpty,
    Op::ThisMonth,
    Op::LastMonth,
    Op::SelectMonth,
    Op::ThisYear,
];

/// Month choices offered next to the year box for `selmonth`.
pub const MONTH_OPTIONS: [(i64, &str); 12] = [
    (1, "01-Jan"),
    (2, "02-Feb"),
    (3, "03-Mar"),
    (4, "04-Apr"),
    (5, "05-May"),
    (6, "06-Jun"),
    (7, "07-Jul"),
    (8, "08-Aug"),
    (9, "09-Sep"),
    (10, "10-Oct"),
    (11, "11-Nov"),
    (12, "12-Dec"),
];

pub(crate) fn days_back(op: Op) -> bool {
    matches!(
        op,
        Op::DaysAgo | Op::LessThanDaysAgo | Op::MoreThanDaysAgo
    )
}

/// Values for `selmonth` and the day-count operators, or `None` for other operators.
pub(crate) fn process_counts(
    input: &RawInput,
    today: NaiveDate,
) -> Result<Option<(Option<DateArg>, Option<DateArg>)>, FilterError> {
    if input.op == Op::SelectMonth {
        let month = optional_int(input.value1(), None, None)?;
        let year = optional_int(input.value2(), Some(MIN_YEAR), Some(MAX_YEAR))?;
        return Ok(Some((month.map(DateArg::Count), year.map(DateArg::Count))));
    }
    if input.op.is_day_count() {
        let days = parse_int(required(input.value1())?)?;
        target_day(input.op, today, days)?;
        return Ok(Some((Some(DateArg::Count(days)), None)));
    }
    Ok(None)
}

/// Target day for a day-count operator.
pub(crate) fn target_day(op: Op, today: NaiveDate, days: i64) -> Result<NaiveDate, FilterError> {
    let shift = if days_back(op) { days.checked_neg() } else { Some(days) };
    shift_days(today, shift.unwrap_or(i64::MAX))
}

fn parse_day(value: &str, today: NaiveDate) -> Result<NaiveDate, FilterError> {
    let day = parse_date(value, today).ok_or_else(|| FilterError::invalid(MSG_INVALID_DATE))?;
    check_year(chrono::Datelike::year(&day))?;
    Ok(day)
}

#[derive(Debug, Clone)]
pub struct DateFilter {
    config: FilterConfig,
    now: Option<NaiveDateTime>,
    state: FilterState,
    value1: Option<DateArg>,
    value2: Option<DateArg>,
    first_day: Option<NaiveDate>,
    last_day: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            now: None,
            state: FilterState::default(),
            value1: None,
            value2: None,
            first_day: None,
            last_day: None,
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }

    /// Pins the reference "now" used for every relative computation.
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

    fn process(
        &self,
        input: &RawInput,
    ) -> Result<(Option<DateArg>, Option<DateArg>), FilterError> {
        let today = self.today();
        if input.is_unfilled_default(input.value1()) || input.op.takes_no_value() {
            return Ok((None, None));
        }
        if let Some(values) = process_counts(input, today)? {
            return Ok(values);
        }

        let day1 = parse_day(required(input.value1())?, today)?;
        let day2 = match input.op {
            Op::Between | Op::NotBetween if is_blank(input.value2()) => Some(today),
            Op::Between | Op::NotBetween => {
                Some(parse_day(input.value2().unwrap_or_default(), today)?)
            }
            _ => None,
        };
        Ok((Some(DateArg::Day(day1)), day2.map(DateArg::Day)))
    }

    fn format_display_values(&mut self) {
        let shows_value1 = matches!(
            self.state.op,
            Some(
                Op::Eq
                    | Op::NotEq
                    | Op::LessThanEqual
                    | Op::GreaterThanEqual
                    | Op::Between
                    | Op::NotBetween
            )
        );
        if let (true, Some(DateArg::Day(day))) = (shows_value1, self.value1) {
            self.state.value1_set_with = Some(day.format("%m/%d/%Y").to_string());
        }
        let shows_value2 = matches!(self.state.op, Some(Op::Between | Op::NotBetween));
        if let (true, Some(DateArg::Day(day))) = (shows_value2, self.value2) {
            self.state.value2_set_with = Some(day.format("%m/%d/%Y").to_string());
        }
    }

    fn day_expr(day: NaiveDate) -> Expr {
        lit(day)
    }
}

impl Filter for DateFilter {
    fn kind(&self) -> &'static str {
        "DateFilter"
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

        let processed = self.process(&input);
        let (value1, value2) = fail(&mut self.state, processed)?;
        self.value1 = value1;
        self.value2 = value2;
        self.format_display_values();

        let (first_day, last_day) = first_last_day(input.op, self.today(), value1, value2);
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

        if op == Op::Today {
            return Ok(query.filter(column.equals(Self::day_expr(today))));
        }
        if let Some((first, last)) = bucket_range(op, today) {
            return Ok(query.filter(column.between(Self::day_expr(first), Self::day_expr(last))));
        }
        if op == Op::SelectMonth {
            let month = self.value1.and_then(DateArg::count);
            let year = self.value2.and_then(DateArg::count);
            return Ok(match select_month_bounds(month, year) {
                Some((first, last)) => {
                    query.filter(column.between(Self::day_expr(first), Self::day_expr(last)))
                }
                None => query,
            });
        }
        if self.state.op_is_default && self.value1.is_none() {
            return Ok(query);
        }

        let day1 = self.value1.and_then(DateArg::date);
        let count = self.value1.and_then(DateArg::count);
        let predicate = match (op, day1, count) {
            (Op::Between | Op::NotBetween, Some(a), _) => {
                let b = self.value2.and_then(DateArg::date).unwrap_or(today);
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let range = column.between(Self::day_expr(low), Self::day_expr(high));
                if op == Op::NotBetween {
                    range.negate()
                } else {
                    range
                }
            }
            (Op::DaysAgo | Op::InDays, _, Some(days)) => {
                column.equals(Self::day_expr(target_day(op, today, days)?))
            }
            (Op::LessThanDaysAgo, _, Some(days)) => {
                let target = target_day(op, today, days)?;
                return Ok(query
                    .filter(column.clone().gt(Self::day_expr(target)))
                    .filter(column.lt(Self::day_expr(today))));
            }
            (Op::MoreThanDaysAgo, _, Some(days)) => {
                column.lt(Self::day_expr(target_day(op, today, days)?))
            }
            (Op::InLessThanDays, _, Some(days)) => {
                let target = target_day(op, today, days)?;
                return Ok(query
                    .filter(column.clone().gte(Self::day_expr(today)))
                    .filter(column.lt(Self::day_expr(target))));
            }
            (Op::InMoreThanDays, _, Some(days)) => {
                column.gt(Self::day_expr(target_day(op, today, days)?))
            }
            (Op::Eq, Some(day), _) => column.equals(Self::day_expr(day)),
            (Op::NotEq, Some(day), _) => column.not_equals(Self::day_expr(day)),
            (Op::LessThanEqual, Some(day), _) => column.lte(Self::day_expr(day)),
            (Op::GreaterThanEqual, Some(day), _) => column.gte(Self::day_expr(day)),
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
                Some(parsed) if valid_date_for_backend(parsed, dialect.as_ref()) => Some(
                    text_match.or(column.clone().equals(lit(parsed.date()))),
                ),
                _ => Some(text_match),
            }
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        let mut instance = DateFilter::new(self.config.for_instance(dialect));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::query::col;
    use crate::domain::filters::parse::{MSG_INTEGER, MSG_OUT_OF_RANGE, MSG_REQUIRED};
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    fn due_date() -> DateFilter {
        DateFilter::on(col("persons.due_date"))
    }

    fn due_date_at(y: i32, m: u32, d: u32) -> DateFilter {
        due_date().with_now(at(y, m, d))
    }

    fn where_clause(filter: &DateFilter) -> String {
        let sql = filter
            .apply(Query::select("persons"))
            .expect("apply should succeed")
            .to_string();
        sql.split_once(" WHERE ")
            .map(|(_, clause)| format!("WHERE {clause}"))
            .unwrap_or_default()
    }

    fn description(filter: &DateFilter) -> String {
        filter.description().unwrap_or_default()
    }

    #[test]
    fn eq_and_prefixes() {
        let mut filter = due_date();
        filter.set(Some("eq"), Some("12/31/2010"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date = '2010-12-31'");
        assert_eq!(description(&filter), "12/31/2010");

        filter.set(Some("!eq"), Some("12/31/2010"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date != '2010-12-31'");
        assert_eq!(description(&filter), "excluding 12/31/2010");

        filter.set(Some("lte"), Some("12/31/2010"), None).expect("set");
        assert_eq!(description(&filter), "up to 12/31/2010");

        filter.set(Some("gte"), Some("12/31/2010"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date >= '2010-12-31'");
        assert_eq!(description(&filter), "beginning 12/31/2010");
    }

    #[test]
    fn point_ops_need_a_value() {
        let mut filter = due_date();
        for op in ["eq", "!eq", "lte", "gte"] {
            let err = filter.set(Some(op), None, None).expect_err("missing value");
            assert_eq!(err, FilterError::invalid(MSG_REQUIRED), "op {op}");
        }
    }

    #[test]
    fn default_op_without_value_describes_all() {
        let mut filter = DateFilter::new(FilterConfig::new(col("persons.due_date")).default_op("eq"));
        filter.set(None, None, None).expect("set");
        assert_eq!(description(&filter), "all");
        assert_eq!(where_clause(&filter), "");
    }

    #[test]
    fn empty_ops() {
        let mut filter = due_date();
        filter.set(Some("empty"), Some(""), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date IS NULL");
        assert_eq!(description(&filter), "date not specified");

        filter.set(Some("!empty"), None, None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date IS NOT NULL");
        assert_eq!(description(&filter), "any date");
    }

    #[test]
    fn between_is_order_independent() {
        let mut forward = due_date();
        forward
            .set(Some("between"), Some("1/31/2010"), Some("12/31/2010"))
            .expect("set");
        let mut backward = due_date();
        backward
            .set(Some("between"), Some("12/31/2010"), Some("1/31/2010"))
            .expect("set");

        let expected = "WHERE persons.due_date BETWEEN '2010-01-31' AND '2010-12-31'";
        assert_eq!(where_clause(&forward), expected);
        assert_eq!(where_clause(&backward), expected);
        assert_eq!(description(&backward), "01/31/2010 - 12/31/2010");
        assert_eq!(forward.value1_set_with(), Some("01/31/2010"));

        backward
            .set(Some("!between"), Some("12/31/2010"), Some("1/31/2010"))
            .expect("set");
        assert_eq!(
            where_clause(&backward),
            "WHERE persons.due_date NOT BETWEEN '2010-01-31' AND '2010-12-31'"
        );
        assert_eq!(description(&backward), "excluding 01/31/2010 - 12/31/2010");
    }

    #[test]
    fn between_missing_end_uses_today() {
        let mut filter = due_date_at(2012, 1, 1);
        filter
            .set(Some("between"), Some("12/31/2010"), Some(""))
            .expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2010-12-31' AND '2012-01-01'"
        );

        filter
            .set(Some("between"), Some("12/31/2010"), None)
            .expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2010-12-31' AND '2012-01-01'"
        );
    }

    #[test]
    fn between_blank_is_invalid() {
        let mut filter = due_date();
        filter
            .set(Some("between"), Some(""), Some(""))
            .expect_err("blank range");
        assert!(filter.error());
        assert_eq!(description(&filter), "invalid");
    }

    #[test]
    fn relative_days() {
        let mut filter = due_date_at(2012, 1, 1);
        filter.set(Some("da"), Some("10"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date = '2011-12-22'");
        assert_eq!(description(&filter), "12/22/2011");

        filter.set(Some("ltda"), Some("10"), None).expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date > '2011-12-22' AND persons.due_date < '2012-01-01'"
        );
        assert_eq!(description(&filter), "12/22/2011 - 01/01/2012");

        filter.set(Some("mtda"), Some("10"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date < '2011-12-22'");
        assert_eq!(description(&filter), "before 12/22/2011");

        filter.set(Some("iltd"), Some("10"), None).expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date >= '2012-01-01' AND persons.due_date < '2012-01-11'"
        );
        assert_eq!(description(&filter), "01/01/2012 - 01/11/2012");

        filter.set(Some("imtd"), Some("10"), None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date > '2012-01-11'");
        assert_eq!(description(&filter), "after 01/11/2012");

        filter.set(Some("ind"), Some("10"), Some("")).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date = '2012-01-11'");
        assert_eq!(description(&filter), "01/11/2012");
    }

    #[test]
    fn relative_day_errors() {
        let mut filter = due_date_at(2012, 1, 1);
        assert_eq!(
            filter.set(Some("ind"), Some(""), None).expect_err("blank"),
            FilterError::invalid(MSG_REQUIRED)
        );
        assert_eq!(
            filter.set(Some("ind"), Some("a"), None).expect_err("letters"),
            FilterError::invalid(MSG_INTEGER)
        );
        assert_eq!(
            filter
                .set(Some("da"), Some("10142015000"), None)
                .expect_err("overflow"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert_eq!(
            filter
                .set(Some("ind"), Some("100000000"), None)
                .expect_err("overflow"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert_eq!(
            filter
                .set(Some("da"), Some("10000000"), None)
                .expect_err("before year 1"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert_eq!(
            filter
                .set(Some("ind"), Some("3000000"), None)
                .expect_err("past year 9999"),
            FilterError::invalid(MSG_OUT_OF_RANGE)
        );
        assert!(!filter.is_active());
    }

    #[test]
    fn calendar_buckets() {
        let between_sql = "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-01-31'";

        let mut filter = due_date_at(2012, 1, 1);
        filter.set(Some("today"), None, None).expect("set");
        assert_eq!(where_clause(&filter), "WHERE persons.due_date = '2012-01-01'");
        assert_eq!(description(&filter), "01/01/2012");

        for day in [1, 4, 7] {
            let mut filter = due_date_at(2012, 1, day);
            filter.set(Some("thisweek"), None, None).expect("set");
            assert_eq!(
                where_clause(&filter),
                "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-01-07'"
            );
            assert_eq!(description(&filter), "01/01/2012 - 01/07/2012");
        }

        let mut filter = due_date_at(2012, 1, 4);
        filter.set(Some("thismonth"), None, None).expect("set");
        assert_eq!(where_clause(&filter), between_sql);
        assert_eq!(description(&filter), "01/01/2012 - 01/31/2012");

        let mut filter = due_date_at(2012, 2, 4);
        filter.set(Some("lastmonth"), None, None).expect("set");
        assert_eq!(where_clause(&filter), between_sql);

        filter.set(Some("thisyear"), None, None).expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-12-31'"
        );
        assert_eq!(description(&filter), "01/01/2012 - 12/31/2012");
        assert_eq!(filter.first_day(), NaiveDate::from_ymd_opt(2012, 1, 1));
        assert_eq!(filter.last_day(), NaiveDate::from_ymd_opt(2012, 12, 31));
    }

    #[test]
    fn default_bucket_applies() {
        let mut filter = DateFilter::new(
            FilterConfig::new(col("persons.due_date")).default_op("thismonth"),
        )
        .with_now(at(2012, 1, 4));
        filter.set(None, None, None).expect("set");
        assert_eq!(description(&filter), "01/01/2012 - 01/31/2012");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-01-31'"
        );
    }

    #[test]
    fn select_month() {
        let mut filter = due_date_at(2012, 2, 4);
        filter
            .set(Some("selmonth"), Some("1"), Some("2012"))
            .expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-01-31'"
        );
        assert_eq!(description(&filter), "Jan 2012");

        filter
            .set(Some("selmonth"), Some("-1"), Some("2012"))
            .expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2012-01-01' AND '2012-12-31'"
        );
        assert_eq!(description(&filter), "2012");

        filter
            .set(Some("selmonth"), None, Some("2012"))
            .expect("partial input is not an error");
        assert_eq!(where_clause(&filter), "");
        assert_eq!(description(&filter), "All");

        let err = filter
            .set(Some("selmonth"), Some("1"), Some("1800"))
            .expect_err("year too early");
        assert_eq!(err.to_string(), "Please enter a number that is 1900 or greater");
    }

    #[test]
    fn bad_dates() {
        let mut filter = due_date();
        filter
            .set(Some("eq"), Some("1/1/2015 - 8/31/2015"), None)
            .expect_err("not a date");
        assert!(filter.error());
        assert_eq!(description(&filter), "invalid");

        let err = filter
            .set(Some("eq"), Some("7/45/2007"), None)
            .expect_err("not a date");
        assert_eq!(err.to_string(), MSG_INVALID_DATE);

        let err = filter
            .set(Some("eq"), Some("1/1/1850"), None)
            .expect_err("too early");
        assert_eq!(err.to_string(), "Please enter a number that is 1900 or greater");
    }

    #[test]
    fn defaults_fill_range() {
        let mut filter = DateFilter::new(
            FilterConfig::new(col("persons.due_date"))
                .default_op("between")
                .default_value1("1/31/2010")
                .default_value2("12/31/2010"),
        );
        filter.set(None, None, None).expect("set");
        assert_eq!(
            where_clause(&filter),
            "WHERE persons.due_date BETWEEN '2010-01-31' AND '2010-12-31'"
        );
    }

    #[test]
    fn search_adds_equality_for_backend_valid_dates() {
        let prototype = due_date_at(2012, 1, 1);
        let filter = prototype
            .new_instance(Some(Dialect::Mssql))
            .expect("instance");
        let search = filter.search_expr().expect("date search");

        assert_eq!(
            search("1753").expect("predicate").to_string(),
            "CAST(persons.due_date AS VARCHAR) LIKE '%1753%' OR persons.due_date = '1753-01-01'"
        );
        assert_eq!(
            search("1752").expect("predicate").to_string(),
            "CAST(persons.due_date AS VARCHAR) LIKE '%1752%'"
        );
        assert_eq!(
            search("foo").expect("predicate").to_string(),
            "CAST(persons.due_date AS VARCHAR) LIKE '%foo%'"
        );
    }

    #[test]
    fn new_instance_keeps_now_and_resets_state() {
        let mut prototype = due_date_at(2012, 1, 1);
        prototype.set(Some("today"), None, None).expect("set");
        let first = prototype.new_instance(None).expect("instance");
        let second = prototype.new_instance(None).expect("instance");

        assert_eq!(first.op(), None);
        assert_eq!(second.op(), None);
        assert!(!first.error());
        assert_eq!(first.description().as_deref(), Some("all"));
    }
}
