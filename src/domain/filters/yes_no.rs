use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{lit, Dialect, Expr, Query};
use crate::domain::filters::base::{
    begin_set, unrecognized, Filter, FilterConfig, FilterError, FilterState, SearchExpr,
};

const OPERATORS: &[Op] = &[Op::All, Op::Yes, Op::No];

/// Boolean column filter; `a` leaves the query alone.
#[derive(Debug, Clone)]
pub struct YesNoFilter {
    config: FilterConfig,
    state: FilterState,
}

impl YesNoFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
        }
    }

    pub fn on(column: Expr) -> Self {
        Self::new(FilterConfig::new(column))
    }
}

impl Filter for YesNoFilter {
    fn kind(&self) -> &'static str {
        "YesNoFilter"
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
        begin_set(&self.config, &mut self.state, OPERATORS, op, values1, value2)?;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        if !self.is_active() {
            return Ok(query);
        }
        let column = self.config.column.clone();
        match self.state.op {
            Some(Op::All) => Ok(query),
            Some(Op::Yes) => Ok(query.filter(column.equals(lit(true)))),
            Some(Op::No) => Ok(query.filter(column.equals(lit(false)))),
            other => Err(unrecognized(other)),
        }
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        let column = self.config.column.clone();
        Some(Box::new(move |term: &str| {
            match term.trim().to_lowercase().as_str() {
                "yes" => Some(column.clone().equals(lit(true))),
                "no" => Some(column.clone().equals(lit(false))),
                _ => None,
            }
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        Ok(Box::new(YesNoFilter::new(self.config.for_instance(dialect))))
    }
}
