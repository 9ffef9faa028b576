use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{Dialect, Expr, Literal, Query};
use crate::domain::filters::base::{
    begin_set, cast_contains_predicate, fail, unrecognized, Filter, FilterConfig, FilterError,
    FilterState, RawInput, SearchExpr,
};
use crate::domain::filters::parse::{is_blank, parse_decimal, parse_int, required};

const OPERATORS: &[Op] = &[
    Op::Eq,
    Op::NotEq,
    Op::LessThanEqual,
    Op::GreaterThanEqual,
    Op::Empty,
    Op::NotEmpty,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberKind {
    Integer,
    Decimal,
}

impl NumberKind {
    fn parse(self, value: &str) -> Result<Literal, FilterError> {
        match self {
            NumberKind::Integer => parse_int(value).map(Literal::Int),
            NumberKind::Decimal => parse_decimal(value).map(Literal::Decimal),
        }
    }
}

fn process(kind: NumberKind, input: &RawInput) -> Result<Option<Literal>, FilterError> {
    let value = input.value1();
    if input.is_unfilled_default(value) {
        return Ok(None);
    }
    match input.op {
        Op::Eq | Op::NotEq | Op::LessThanEqual | Op::GreaterThanEqual => {
            kind.parse(required(value)?).map(Some)
        }
        _ if is_blank(value) => Ok(None),
        _ => kind.parse(value.unwrap_or_default()).map(Some),
    }
}

fn apply_numeric(
    state: &FilterState,
    column: &Expr,
    value: Option<&Literal>,
    query: Query,
) -> Result<Query, FilterError> {
    if !state.is_active() || (state.op_is_default && value.is_none()) {
        return Ok(query);
    }
    let column = column.clone();
    let value = || Expr::Literal(value.cloned().unwrap_or(Literal::Null));
    let predicate = match state.op {
        Some(Op::Eq) => column.equals(value()),
        Some(Op::NotEq) => column.not_equals(value()),
        Some(Op::LessThanEqual) => column.lte(value()),
        Some(Op::GreaterThanEqual) => column.gte(value()),
        Some(Op::Empty) => column.is_null(),
        Some(Op::NotEmpty) => column.is_not_null(),
        other => return Err(unrecognized(other)),
    };
    Ok(query.filter(predicate))
}

fn numeric_search(column: &Expr) -> SearchExpr {
    let column = column.clone();
    Box::new(move |term: &str| Some(cast_contains_predicate(&column, term)))
}

#[derive(Debug, Clone)]
pub struct IntFilter {
    config: FilterConfig,
    state: FilterState,
    value1: Option<Literal>,
}

impl IntFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
            value1: None,
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }

    pub fn value1(&self) -> Option<i64> {
        match self.value1 {
            Some(Literal::Int(value)) => Some(value),
            _ => None,
        }
    }
}

impl Filter for IntFilter {
    fn kind(&self) -> &'static str {
        "IntFilter"
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
        let Some(input) = begin_set(
            &self.config,
            &mut self.state,
            OPERATORS,
            op,
            values1,
            value2,
        )?
        else {
            return Ok(());
        };
        self.value1 = fail(&mut self.state, process(NumberKind::Integer, &input))?;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        apply_numeric(
            &self.state,
            &self.config.column,
            self.value1.as_ref(),
            query,
        )
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        Some(numeric_search(&self.config.column))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        Ok(Box::new(IntFilter::new(self.config.for_instance(dialect))))
    }
}

/// Like [`IntFilter`] but for real numbers, held as exact decimals.
#[derive(Debug, Clone)]
pub struct NumberFilter {
    config: FilterConfig,
    state: FilterState,
    value1: Option<Literal>,
}

impl NumberFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
            value1: None,
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }

    pub fn value1(&self) -> Option<rust_decimal::Decimal> {
        match self.value1 {
            Some(Literal::Decimal(value)) => Some(value),
            _ => None,
        }
    }
}

impl Filter for NumberFilter {
    fn kind(&self) -> &'static str {
        "NumberFilter"
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
        let Some(input) = begin_set(
            &self.config,
            &mut self.state,
            OPERATORS,
            op,
            values1,
            value2,
        )?
        else {
            return Ok(());
        };
        self.value1 = fail(&mut self.state, process(NumberKind::Decimal, &input))?;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        apply_numeric(
            &self.state,
            &self.config.column,
            self.value1.as_ref(),
            query,
        )
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        Some(numeric_search(&self.config.column))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        Ok(Box::new(NumberFilter::new(self.config.for_instance(dialect))))
    }
}
