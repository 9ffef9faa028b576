use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::entities::operator::{Op, UnknownOperator};
use crate::domain::entities::query::{lit, Dialect, Expr, Predicate, Query};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// User input that could not be turned into a filter value.
    #[error("{0}")]
    Invalid(String),
    #[error("unrecognized operator: {0}")]
    UnrecognizedOperator(String),
    #[error("{0}")]
    Config(String),
}

impl FilterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FilterError::Invalid(message.into())
    }
}

/// Maps a search term to a predicate, or `None` to sit that term out.
pub type SearchExpr = Box<dyn Fn(&str) -> Option<Predicate>>;

/// A configured value that is either fixed or computed each time it is read.
pub enum Deferred<T> {
    Value(T),
    Lazy(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Deferred<T> {
    pub fn lazy(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Deferred::Lazy(Arc::new(f))
    }

    pub fn resolve(&self) -> T {
        match self {
            Deferred::Value(value) => value.clone(),
            Deferred::Lazy(f) => f(),
        }
    }
}

impl<T: Clone> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        match self {
            Deferred::Value(value) => Deferred::Value(value.clone()),
            Deferred::Lazy(f) => Deferred::Lazy(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Deferred::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Construction arguments shared by every filter; cloned into each instance.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub column: Expr,
    pub default_op: Option<Deferred<String>>,
    pub default_value1: Option<Deferred<Vec<String>>>,
    pub default_value2: Option<Deferred<String>>,
    pub dialect: Option<Dialect>,
}

impl FilterConfig {
    pub fn new(column: Expr) -> Self {
        Self {
            column,
            default_op: None,
            default_value1: None,
            default_value2: None,
            dialect: None,
        }
    }

    pub fn default_op(mut self, op: impl Into<String>) -> Self {
        self.default_op = Some(Deferred::Value(op.into()));
        self
    }

    pub fn lazy_default_op(mut self, f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.default_op = Some(Deferred::lazy(f));
        self
    }

    pub fn default_value1(mut self, value: impl Into<String>) -> Self {
        self.default_value1 = Some(Deferred::Value(vec![value.into()]));
        self
    }

    pub fn default_values1(mut self, values: Vec<String>) -> Self {
        self.default_value1 = Some(Deferred::Value(values));
        self
    }

    pub fn lazy_default_value1(
        mut self,
        f: impl Fn() -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.default_value1 = Some(Deferred::lazy(f));
        self
    }

    pub fn default_value2(mut self, value: impl Into<String>) -> Self {
        self.default_value2 = Some(Deferred::Value(value.into()));
        self
    }

    pub fn lazy_default_value2(mut self, f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.default_value2 = Some(Deferred::lazy(f));
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn has_default_op(&self) -> bool {
        self.resolved_default_op().is_some()
    }

    pub fn resolved_default_op(&self) -> Option<String> {
        self.default_op
            .as_ref()
            .map(Deferred::resolve)
            .filter(|key| !key.trim().is_empty())
    }

    pub fn folds_case(&self) -> bool {
        self.dialect.as_ref().is_some_and(Dialect::folds_case)
    }

    /// Same configuration bound to the dialect of a new grid instance.
    pub fn for_instance(&self, dialect: Option<Dialect>) -> Self {
        let mut config = self.clone();
        config.dialect = dialect;
        config
    }
}

/// Per-request state; replaced wholesale by every `set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub op: Option<Op>,
    pub value1_set_with: Option<String>,
    pub value2_set_with: Option<String>,
    pub error: bool,
    pub op_is_default: bool,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        self.op.is_some() && !self.error
    }
}

/// Operator and raw values after default resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub op: Op,
    pub values1: Vec<String>,
    pub value2: Option<String>,
    pub op_is_default: bool,
}

impl RawInput {
    pub fn value1(&self) -> Option<&str> {
        self.values1.first().map(String::as_str)
    }

    pub fn value2(&self) -> Option<&str> {
        self.value2.as_deref()
    }

    /// Blank value submitted alongside the default operator.
    pub fn is_unfilled_default(&self, value: Option<&str>) -> bool {
        self.op_is_default && value.map_or(true, |v| v.trim().is_empty())
    }
}

/// Shared front half of `set`: resets state, resolves defaults and validates the operator.
///
/// Returns `Ok(None)` when neither an operator nor a default operator is present.
pub fn begin_set(
    config: &FilterConfig,
    state: &mut FilterState,
    operators: &[Op],
    op: Option<&str>,
    values1: &[String],
    value2: Option<&str>,
) -> Result<Option<RawInput>, FilterError> {
    *state = FilterState::default();
    let default_op = config.resolved_default_op();

    let (op_key, values1, value2) = match op.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => (
            key.to_string(),
            values1.to_vec(),
            value2.map(str::to_string),
        ),
        None => {
            let Some(default_op) = default_op.clone() else {
                return Ok(None);
            };
            let values1 = config
                .default_value1
                .as_ref()
                .map(Deferred::resolve)
                .unwrap_or_default();
            let value2 = config.default_value2.as_ref().map(Deferred::resolve);
            (default_op, values1, value2)
        }
    };

    let op = match op_key.parse::<Op>() {
        Ok(op) if operators.contains(&op) => op,
        _ => {
            state.error = true;
            return Err(FilterError::invalid(UnknownOperator(op_key).to_string()));
        }
    };

    state.op = Some(op);
    state.op_is_default = default_op.as_deref() == Some(op.key());
    state.value1_set_with = values1.first().cloned();
    state.value2_set_with = value2.clone();

    Ok(Some(RawInput {
        op,
        values1,
        value2,
        op_is_default: state.op_is_default,
    }))
}

/// Records a failed `process` step on the state before handing the error back.
pub fn fail<T>(state: &mut FilterState, result: Result<T, FilterError>) -> Result<T, FilterError> {
    if result.is_err() {
        state.error = true;
    }
    result
}

pub fn unrecognized(op: Option<Op>) -> FilterError {
    FilterError::UnrecognizedOperator(op.map(Op::key).unwrap_or("None").to_string())
}

/// `%term%` match, case-insensitive on dialects that fold case.
pub fn contains_predicate(column: &Expr, term: &str, folds_case: bool) -> Predicate {
    let pattern = lit(format!("%{term}%"));
    if folds_case {
        column.clone().lower().like(pattern.lower())
    } else {
        column.clone().like(pattern)
    }
}

/// Text-cast match used by numeric, date and time columns in search mode.
pub fn cast_contains_predicate(column: &Expr, term: &str) -> Predicate {
    column
        .clone()
        .cast("VARCHAR")
        .like(lit(format!("%{term}%")))
}

pub trait Filter: fmt::Debug + Send + Sync {
    /// Type name used in log summaries.
    fn kind(&self) -> &'static str;

    fn operators(&self) -> &'static [Op];

    fn config(&self) -> &FilterConfig;

    fn state(&self) -> &FilterState;

    fn receives_list(&self) -> bool {
        false
    }

    /// Sets operator and values from raw request input; scalar filters use the first value.
    fn set_list(
        &mut self,
        op: Option<&str>,
        values1: &[String],
        value2: Option<&str>,
    ) -> Result<(), FilterError>;

    fn set(
        &mut self,
        op: Option<&str>,
        value1: Option<&str>,
        value2: Option<&str>,
    ) -> Result<(), FilterError> {
        let values1: Vec<String> = value1.map(str::to_string).into_iter().collect();
        self.set_list(op, &values1, value2)
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError>;

    fn search_expr(&self) -> Option<SearchExpr> {
        None
    }

    /// Fresh instance with this prototype's configuration and zeroed state.
    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError>;

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn is_display_active(&self) -> bool {
        self.state().op.is_some()
    }

    fn op(&self) -> Option<Op> {
        self.state().op
    }

    fn error(&self) -> bool {
        self.state().error
    }

    fn value1_set_with(&self) -> Option<&str> {
        self.state().value1_set_with.as_deref()
    }

    fn value2_set_with(&self) -> Option<&str> {
        self.state().value2_set_with.as_deref()
    }

    /// Natural-language rendering of the active filter, for filters that have one.
    fn description(&self) -> Option<String> {
        None
    }

    fn format_invalid(&self, err: &FilterError, label: &str) -> String {
        format!("{label}: {err}")
    }

    fn summary(&self) -> String {
        format!(
            "class={}, op={}, value1={}, value2={}",
            self.kind(),
            self.op().map(Op::key).unwrap_or("None"),
            self.value1_set_with().unwrap_or("None"),
            self.value2_set_with().unwrap_or("None"),
        )
    }
}
