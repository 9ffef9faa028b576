use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rust_decimal::Decimal;

use crate::domain::entities::operator::Op;
use crate::domain::entities::query::{Dialect, Expr, Literal, Query};
use crate::domain::filters::base::{
    begin_set, unrecognized, Filter, FilterConfig, FilterError, FilterState, SearchExpr,
};

const OPERATORS: &[Op] = &[Op::Is, Op::NotIs, Op::Empty, Op::NotEmpty];

pub const ALL_OPTION_KEY: i64 = -1;
pub const ALL_OPTION_LABEL: &str = "-- All --";

#[derive(Debug, Clone, PartialEq)]
pub enum OptionKey {
    Str(String),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

impl OptionKey {
    pub fn to_literal(&self) -> Literal {
        match self {
            OptionKey::Str(value) => Literal::Text(value.clone()),
            OptionKey::Int(value) => Literal::Int(*value),
            OptionKey::Float(value) => Literal::Real(*value),
            OptionKey::Decimal(value) => Literal::Decimal(*value),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKey::Str(value) => f.write_str(value),
            OptionKey::Int(value) => write!(f, "{value}"),
            OptionKey::Float(value) => write!(f, "{value}"),
            OptionKey::Decimal(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for OptionKey {
    fn from(value: &str) -> Self {
        OptionKey::Str(value.to_string())
    }
}

impl From<i64> for OptionKey {
    fn from(value: i64) -> Self {
        OptionKey::Int(value)
    }
}

pub type OptionList = Vec<(OptionKey, String)>;

#[derive(Clone)]
pub enum OptionSource {
    Static(OptionList),
    Lazy(Arc<dyn Fn() -> OptionList + Send + Sync>),
}

impl OptionSource {
    pub fn lazy(f: impl Fn() -> OptionList + Send + Sync + 'static) -> Self {
        OptionSource::Lazy(Arc::new(f))
    }

    fn load(&self) -> OptionList {
        match self {
            OptionSource::Static(options) => options.clone(),
            OptionSource::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSource::Static(options) => f.debug_tuple("Static").field(options).finish(),
            OptionSource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Converts a submitted string into an option key.
#[derive(Clone)]
pub enum ValueModifier {
    /// Pick a conversion from the type of the first option key.
    Auto,
    Str,
    Int,
    Float,
    Decimal,
    Custom(Arc<dyn Fn(&str) -> Option<OptionKey> + Send + Sync>),
}

impl ValueModifier {
    pub fn custom(f: impl Fn(&str) -> Option<OptionKey> + Send + Sync + 'static) -> Self {
        ValueModifier::Custom(Arc::new(f))
    }

    fn for_key(key: &OptionKey) -> Self {
        match key {
            OptionKey::Str(_) => ValueModifier::Str,
            OptionKey::Int(_) => ValueModifier::Int,
            OptionKey::Float(_) => ValueModifier::Float,
            OptionKey::Decimal(_) => ValueModifier::Decimal,
        }
    }

    fn convert(&self, raw: &str) -> Option<OptionKey> {
        match self {
            ValueModifier::Auto | ValueModifier::Str => Some(OptionKey::Str(raw.to_string())),
            ValueModifier::Int => raw.trim().parse().ok().map(OptionKey::Int),
            ValueModifier::Float => raw.trim().parse().ok().map(OptionKey::Float),
            ValueModifier::Decimal => Decimal::from_str(raw.trim()).ok().map(OptionKey::Decimal),
            ValueModifier::Custom(f) => f(raw),
        }
    }
}

impl fmt::Debug for ValueModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueModifier::Auto => f.write_str("Auto"),
            ValueModifier::Str => f.write_str("Str"),
            ValueModifier::Int => f.write_str("Int"),
            ValueModifier::Float => f.write_str("Float"),
            ValueModifier::Decimal => f.write_str("Decimal"),
            ValueModifier::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Multi-select filter over a fixed or computed option list.
///
/// Submitted values that fail conversion or match no option are dropped
/// without an error, so links built against an older option list still load.
#[derive(Debug, Clone)]
pub struct OptionsFilter {
    config: FilterConfig,
    source: OptionSource,
    modifier: ValueModifier,
    options: OnceCell<OptionList>,
    state: FilterState,
    value1: Vec<OptionKey>,
}

impl OptionsFilter {
    pub fn new(config: FilterConfig, source: OptionSource) -> Self {
        Self {
            config,
            source,
            modifier: ValueModifier::Auto,
            options: OnceCell::new(),
            state: FilterState::default(),
            value1: Vec::new(),
        }
    }

    pub fn with_options(column: Expr, options: OptionList) -> Self {
        Self::new(FilterConfig::new(column), OptionSource::Static(options))
    }

    pub fn value_modifier(mut self, modifier: ValueModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Real options, loaded once per instance.
    pub fn options(&self) -> &OptionList {
        self.options.get_or_init(|| self.source.load())
    }

    /// Options as shown to a user, with the "all" entry when a default operator exists.
    pub fn options_seq(&self) -> OptionList {
        let mut seq = Vec::new();
        if self.config.has_default_op() {
            seq.push((OptionKey::Int(ALL_OPTION_KEY), ALL_OPTION_LABEL.to_string()));
        }
        seq.extend(self.options().iter().cloned());
        seq
    }

    pub fn values(&self) -> &[OptionKey] {
        &self.value1
    }

    fn resolve_modifier(&self) -> Result<ValueModifier, FilterError> {
        if !matches!(self.modifier, ValueModifier::Auto) {
            return Ok(self.modifier.clone());
        }
        self.options()
            .first()
            .map(|(key, _)| ValueModifier::for_key(key))
            .ok_or_else(|| {
                FilterError::Config(
                    "value_modifier argument set to \"auto\", but the options set is empty \
                     and the type can therefore not be determined"
                        .to_string(),
                )
            })
    }

    fn process(&self, raw: &str) -> Option<OptionKey> {
        let key = self.modifier.convert(raw)?;
        if self.config.has_default_op() && key == OptionKey::Int(ALL_OPTION_KEY) {
            return None;
        }
        self.options()
            .iter()
            .any(|(option, _)| *option == key)
            .then_some(key)
    }
}

impl Filter for OptionsFilter {
    fn kind(&self) -> &'static str {
        "OptionsFilter"
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

    fn receives_list(&self) -> bool {
        true
    }

    fn set_list(
        &mut self,
        op: Option<&str>,
        values1: &[String],
        value2: Option<&str>,
    ) -> Result<(), FilterError> {
        self.value1.clear();
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

        let values: Vec<OptionKey> = input
            .values1
            .iter()
            .filter_map(|raw| self.process(raw))
            .collect();

        if values.is_empty() && matches!(input.op, Op::Is | Op::NotIs) {
            self.state.op = None;
        }
        self.value1 = values;
        Ok(())
    }

    fn apply(&self, query: Query) -> Result<Query, FilterError> {
        if !self.is_active() {
            return Ok(query);
        }
        let column = self.config.column.clone();
        let mut items: Vec<Expr> = self
            .value1
            .iter()
            .map(|key| Expr::Literal(key.to_literal()))
            .collect();

        let predicate = match (self.state.op, items.len()) {
            (Some(Op::Is | Op::NotIs), 0) => return Ok(query),
            (Some(Op::Is), 1) => column.equals(items.remove(0)),
            (Some(Op::Is), _) => column.in_list(items),
            (Some(Op::NotIs), 1) => column.not_equals(items.remove(0)),
            (Some(Op::NotIs), _) => column.in_list(items).negate(),
            (Some(Op::Empty), _) => column.is_null(),
            (Some(Op::NotEmpty), _) => column.is_not_null(),
            (other, _) => return Err(unrecognized(other)),
        };
        Ok(query.filter(predicate))
    }

    fn search_expr(&self) -> Option<SearchExpr> {
        let column = self.config.column.clone();
        let options = self.options().clone();
        Some(Box::new(move |term: &str| {
            let needle = term.to_lowercase();
            let matches: Vec<Expr> = options
                .iter()
                .filter(|(_, label)| label.to_lowercase().contains(&needle))
                .map(|(key, _)| Expr::Literal(key.to_literal()))
                .collect();
            if matches.is_empty() {
                None
            } else {
                Some(column.clone().in_list(matches))
            }
        }))
    }

    fn new_instance(&self, dialect: Option<Dialect>) -> Result<Box<dyn Filter>, FilterError> {
        let mut instance = OptionsFilter::new(self.config.for_instance(dialect), self.source.clone());
        instance.modifier = self.modifier.clone();
        instance.modifier = instance.resolve_modifier()?;
        Ok(Box::new(instance))
    }
}
