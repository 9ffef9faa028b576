use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{lit, Dialect, Expr, Query};
use crate::domain::filters::base::{
    begin_set, contains_predicate, unrecognized, Filter, FilterConfig, FilterError, FilterState,
    SearchExpr,
};

const OPERATORS: &[Op] = &[
    Op::Eq,
    Op::NotEq,
    Op::Contains,
    Op::NotContains,
    Op::Empty,
    Op::NotEmpty,
];

#[derive(Debug, Clone)]
pub struct TextFilter {
    config: FilterConfig,
    state: FilterState,
    value1: Option<String>,
}

impl TextFilter {
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

    pub fn value1(&self) -> Option<&str> {
        self.value1.as_deref()
    }
}

impl Filter for TextFilter {
    fn kind(&self) -> &'static str {
        "TextFilter"
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

        if input.is_unfilled_default(input.value1()) {
            return Ok(());
        }
        self.value1 = input.value1().map(str::to_string);
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        if !self.is_active() || (self.state.op_is_default && self.value1.is_none()) {
            return Ok(query);
        }

        let column = self.config.column.clone();
        let value = self.value1.clone().unwrap_or_default();
        let folds_case = self.config.folds_case();

        let predicate = match self.state.op {
            Some(Op::Empty) => column.clone().is_null().or(column.equals(lit(""))),
            Some(Op::NotEmpty) => column.clone().is_not_null().and(column.not_equals(lit(""))),
            Some(Op::Eq) if folds_case => column.upper().equals(lit(value).upper()),
            Some(Op::Eq) => column.equals(lit(value)),
            Some(Op::NotEq) if folds_case => column.upper().not_equals(lit(value).upper()),
            Some(Op::NotEq) => column.not_equals(lit(value)),
            Some(Op::Contains) => contains_predicate(&column, &value, folds_case),
            Some(Op::NotContains) => contains_predicate(&column, &value, folds_case).negate(),
            other => return Err(unrecognized(other)),
        };
        Ok(query.filter(predicate))
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        let column = self.config.column.clone();
        let folds_case = self.config.folds_case();
        Some(Box::new(move |term: &str| {
            Some(contains_predicate(&column, term, folds_case))
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        Ok(Box::new(TextFilter::new(self.config.for_instance(dialect))))
    }
}
