use chrono::NaiveTime;

use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{lit, Dialect, Expr, Query};
use crate::domain::filters::base::{
    begin_set, cast_contains_predicate, fail, unrecognized, Filter, FilterConfig, FilterError,
    FilterState, RawInput, SearchExpr,
};
use crate::domain::filters::parse::{is_blank, parse_time, MSG_INVALID_TIME, MSG_REQUIRED};

const OPERATORS: &[Op] = &[
    Op::Eq,
    Op::NotEq,
    Op::LessThanEqual,
    Op::GreaterThanEqual,
    Op::Between,
    Op::NotBetween,
    Op::Empty,
    Op::NotEmpty,
];

pub const TIME_FORMAT: &str = "%I:%M %p";

fn process_time(value: Option<&str>) -> Result<Option<NaiveTime>, FilterError> {
    if is_blank(value) {
        return Ok(None);
    }
    parse_time(value.unwrap_or_default(), TIME_FORMAT)
        .map(Some)
        .ok_or_else(|| FilterError::invalid(MSG_INVALID_TIME))
}

#[derive(Debug, Clone)]
pub struct TimeFilter {
    config: FilterConfig,
    state: FilterState,
    value1: Option<NaiveTime>,
    value2: Option<NaiveTime>,
}

impl TimeFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
            value1: None,
            value2: None,
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }

    pub fn value1(&self) -> Option<NaiveTime> {
        self.value1
    }

    pub fn value2(&self) -> Option<NaiveTime> {
        self.value2
    }

    /// Some backends bind bare time strings as datetimes, so those get an explicit cast.
    fn time_expr(&self, value: NaiveTime) -> Expr {
        match self.config.dialect {
            Some(Dialect::Mssql) => lit(value).cast("TIME"),
            _ => lit(value),
        }
    }

    fn process(
        &self,
        input: &RawInput,
    ) -> Result<(Option<NaiveTime>, Option<NaiveTime>), FilterError> {
        if input.is_unfilled_default(input.value1()) {
            return Ok((None, None));
        }
        let value1 = process_time(input.value1())?;
        let value2 = match input.op {
            Op::Between | Op::NotBetween => {
                let value2 = process_time(input.value2())?;
                if value1.is_some() && value2.is_none() {
                    return Err(FilterError::invalid(MSG_REQUIRED));
                }
                value2
            }
            _ => None,
        };
        Ok((value1, value2))
    }
}

impl Filter for TimeFilter {
    fn kind(&self) -> &'static str {
        "TimeFilter"
    }

    fn operators(&self) -> &'static [Op] {
        OPERATORS
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
        let Some(input) =
            begin_set(&self.config, &mut self.state, OPERATORS, op, values1, value2)?
        else {
            return Ok(());
        };
        let processed = self.process(&input);
        let (value1, value2) = fail(&mut self.state, processed)?;
        self.value1 = value1;
        self.value2 = value2;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        if !self.is_active() {
            return Ok(query);
        }
        let column = self.config.column.clone();
        let predicate = match (self.state.op, self.value1, self.value2) {
            (Some(Op::Empty), _, _) => column.is_null(),
            (Some(Op::NotEmpty), _, _) => column.is_not_null(),
            (_, None, _) => return Ok(query),
            (Some(op @ (Op::Between | Op::NotBetween)), Some(a), Some(b)) => {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let range = column.between(self.time_expr(low), self.time_expr(high));
                if op == Op::NotBetween {
                    range.negate()
                } else {
                    range
                }
            }
            (Some(Op::Eq), Some(value), _) => column.equals(self.time_expr(value)),
            (Some(Op::NotEq), Some(value), _) => column.not_equals(self.time_expr(value)),
            (Some(Op::LessThanEqual), Some(value), _) => column.lte(self.time_expr(value)),
            (Some(Op::GreaterThanEqual), Some(value), _) => column.gte(self.time_expr(value)),
            (other, _, _) => return Err(unrecognized(other)),
        };
        Ok(query.filter(predicate))
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        let column = self.config.column.clone();
        Some(Box::new(move |term: &str| {
            Some(cast_contains_predicate(&column, term))
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        Ok(Box::new(TimeFilter::new(self.config.for_instance(dialect))))
    }
}
