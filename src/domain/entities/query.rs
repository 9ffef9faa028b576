use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::types::Value;
use rust_decimal::Decimal;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_FRACTION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIME_FRACTION_FORMAT: &str = "%H:%M:%S%.6f";

/// Backend identity, as far as predicate building cares about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgresql,
    Mssql,
    Other(String),
}

impl Dialect {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Dialect::Sqlite,
            "postgresql" | "postgres" => Dialect::Postgresql,
            "mssql" => Dialect::Mssql,
            other => Dialect::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Mssql => "mssql",
            Dialect::Other(name) => name,
        }
    }

    /// Text comparisons get wrapped in upper()/lower() on these backends.
    pub fn folds_case(&self) -> bool {
        matches!(self, Dialect::Sqlite | Dialect::Postgresql)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(flag) => Value::Integer(i64::from(*flag)),
            Literal::Int(value) => Value::Integer(*value),
            Literal::Real(value) => Value::Real(*value),
            // exact digits; numeric column affinity converts on comparison
            Literal::Decimal(value) => Value::Text(value.to_string()),
            Literal::Text(value) => Value::Text(value.clone()),
            Literal::Date(_) | Literal::DateTime(_) | Literal::Time(_) => {
                Value::Text(self.plain_text())
            }
        }
    }

    fn plain_text(&self) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
            Literal::Int(value) => value.to_string(),
            Literal::Real(value) => value.to_string(),
            Literal::Decimal(value) => value.to_string(),
            Literal::Text(value) => value.clone(),
            Literal::Date(value) => value.format(DATE_FORMAT).to_string(),
            Literal::DateTime(value) => {
                let format = if value.nanosecond() == 0 {
                    DATETIME_FORMAT
                } else {
                    DATETIME_FRACTION_FORMAT
                };
                value.format(format).to_string()
            }
            Literal::Time(value) => {
                let format = if value.nanosecond() == 0 {
                    TIME_FORMAT
                } else {
                    TIME_FRACTION_FORMAT
                };
                value.format(format).to_string()
            }
        }
    }

    fn write_inline(&self, out: &mut String) {
        match self {
            Literal::Text(_) | Literal::Date(_) | Literal::DateTime(_) | Literal::Time(_) => {
                out.push('\'');
                out.push_str(&self.plain_text().replace('\'', "''"));
                out.push('\'');
            }
            _ => out.push_str(&self.plain_text()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Real(value)
    }
}

impl From<Decimal> for Literal {
    fn from(value: Decimal) -> Self {
        Literal::Decimal(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Literal::Date(value)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(value: NaiveDateTime) -> Self {
        Literal::DateTime(value)
    }
}

impl From<NaiveTime> for Literal {
    fn from(value: NaiveTime) -> Self {
        Literal::Time(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference as written, optionally table qualified.
    Column(String),
    Raw(String),
    Literal(Literal),
    Func(String, Vec<Expr>),
    Cast(Box<Expr>, String),
    Binary(Box<Expr>, String, Box<Expr>),
}

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::Literal(value.into())
}

pub fn raw(text: impl Into<String>) -> Expr {
    Expr::Raw(text.into())
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Literal(value)
    }
}

impl Expr {
    /// Name the backend reports for this expression when selected unlabeled.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Expr::Column(name) => Some(name.rsplit('.').next().unwrap_or(name)),
            Expr::Raw(text) if is_identifier(text) => Some(text),
            _ => None,
        }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Func(name.into(), args)
    }

    pub fn upper(self) -> Expr {
        Expr::func("upper", vec![self])
    }

    pub fn lower(self) -> Expr {
        Expr::func("lower", vec![self])
    }

    pub fn cast(self, type_name: impl Into<String>) -> Expr {
        Expr::Cast(Box::new(self), type_name.into())
    }

    pub fn binary(self, op: impl Into<String>, other: Expr) -> Expr {
        Expr::Binary(Box::new(self), op.into(), Box::new(other))
    }

    pub fn label(self, name: impl Into<String>) -> ColumnExpr {
        ColumnExpr {
            expr: self,
            label: Some(name.into()),
        }
    }

    pub fn asc(self) -> OrderTerm {
        OrderTerm {
            expr: self,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(self) -> OrderTerm {
        OrderTerm {
            expr: self,
            direction: SortDirection::Desc,
        }
    }

    fn compare(self, op: CompareOp, other: Expr) -> Predicate {
        Predicate::Compare(self, op, other)
    }

    pub fn equals(self, other: Expr) -> Predicate {
        self.compare(CompareOp::Eq, other)
    }

    pub fn not_equals(self, other: Expr) -> Predicate {
        self.compare(CompareOp::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Predicate {
        self.compare(CompareOp::Lt, other)
    }

    pub fn lte(self, other: Expr) -> Predicate {
        self.compare(CompareOp::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Predicate {
        self.compare(CompareOp::Gt, other)
    }

    pub fn gte(self, other: Expr) -> Predicate {
        self.compare(CompareOp::GtEq, other)
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self)
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull(self)
    }

    pub fn like(self, pattern: Expr) -> Predicate {
        Predicate::Like {
            expr: self,
            pattern,
            negated: false,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Predicate {
        Predicate::Between {
            expr: self,
            low,
            high,
            negated: false,
        }
    }

    pub fn in_list(self, items: Vec<Expr>) -> Predicate {
        Predicate::InList {
            expr: self,
            items,
            negated: false,
        }
    }

    fn write(&self, w: &mut SqlWriter) {
        match self {
            Expr::Column(name) | Expr::Raw(name) => w.sql.push_str(name),
            Expr::Literal(value) => w.literal(value),
            Expr::Func(name, args) => {
                w.sql.push_str(name);
                w.sql.push('(');
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        w.sql.push_str(", ");
                    }
                    arg.write(w);
                }
                w.sql.push(')');
            }
            Expr::Cast(inner, type_name) => {
                w.sql.push_str("CAST(");
                inner.write(w);
                w.sql.push_str(" AS ");
                w.sql.push_str(type_name);
                w.sql.push(')');
            }
            Expr::Binary(left, op, right) => {
                left.write(w);
                w.sql.push(' ');
                w.sql.push_str(op);
                w.sql.push(' ');
                right.write(w);
            }
        }
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// A selectable expression with an optional `AS` label.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExpr {
    pub expr: Expr,
    pub label: Option<String>,
}

impl ColumnExpr {
    pub fn output_name(&self) -> Option<&str> {
        self.label.as_deref().or_else(|| self.expr.output_name())
    }

    fn write(&self, w: &mut SqlWriter) {
        self.expr.write(w);
        if let Some(label) = &self.label {
            w.sql.push_str(" AS ");
            w.sql.push_str(label);
        }
    }
}

impl From<Expr> for ColumnExpr {
    fn from(expr: Expr) -> Self {
        ColumnExpr { expr, label: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    fn inverse(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::LtEq => CompareOp::Gt,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::GtEq => CompareOp::Lt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare(Expr, CompareOp, Expr),
    IsNull(Expr),
    IsNotNull(Expr),
    Like {
        expr: Expr,
        pattern: Expr,
        negated: bool,
    },
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
        negated: bool,
    },
    InList {
        expr: Expr,
        items: Vec<Expr>,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut items) => {
                items.push(other);
                Predicate::And(items)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut items) => {
                items.push(other);
                Predicate::Or(items)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn any(items: Vec<Predicate>) -> Option<Predicate> {
        match items.len() {
            0 => None,
            1 => items.into_iter().next(),
            _ => Some(Predicate::Or(items)),
        }
    }

    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Compare(left, op, right) => Predicate::Compare(left, op.inverse(), right),
            Predicate::IsNull(expr) => Predicate::IsNotNull(expr),
            Predicate::IsNotNull(expr) => Predicate::IsNull(expr),
            Predicate::Like {
                expr,
                pattern,
                negated,
            } => Predicate::Like {
                expr,
                pattern,
                negated: !negated,
            },
            Predicate::Between {
                expr,
                low,
                high,
                negated,
            } => Predicate::Between {
                expr,
                low,
                high,
                negated: !negated,
            },
            Predicate::InList {
                expr,
                items,
                negated,
            } => Predicate::InList {
                expr,
                items,
                negated: !negated,
            },
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    fn needs_parens_in(&self, separator: &str) -> bool {
        match self {
            Predicate::Or(_) => separator != " OR ",
            Predicate::And(_) => separator != " AND ",
            _ => false,
        }
    }

    fn write(&self, w: &mut SqlWriter) {
        match self {
            Predicate::Compare(left, op, right) => {
                left.write(w);
                w.sql.push(' ');
                w.sql.push_str(op.symbol());
                w.sql.push(' ');
                right.write(w);
            }
            Predicate::IsNull(expr) => {
                expr.write(w);
                w.sql.push_str(" IS NULL");
            }
            Predicate::IsNotNull(expr) => {
                expr.write(w);
                w.sql.push_str(" IS NOT NULL");
            }
            Predicate::Like {
                expr,
                pattern,
                negated,
            } => {
                expr.write(w);
                w.sql.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                pattern.write(w);
            }
            Predicate::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.write(w);
                w.sql
                    .push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.write(w);
                w.sql.push_str(" AND ");
                high.write(w);
            }
            Predicate::InList {
                expr,
                items,
                negated,
            } => {
                expr.write(w);
                w.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        w.sql.push_str(", ");
                    }
                    item.write(w);
                }
                w.sql.push(')');
            }
            Predicate::And(items) => write_joined(w, items, " AND "),
            Predicate::Or(items) => write_joined(w, items, " OR "),
            Predicate::Not(inner) => {
                w.sql.push_str("NOT (");
                inner.write(w);
                w.sql.push(')');
            }
        }
    }
}

fn write_joined(w: &mut SqlWriter, items: &[Predicate], separator: &str) {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            w.sql.push_str(separator);
        }
        if item.needs_parens_in(separator) {
            w.sql.push('(');
            item.write(w);
            w.sql.push(')');
        } else {
            item.write(w);
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = SqlWriter::inline();
        self.write(&mut w);
        f.write_str(&w.sql)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// Parameterised SQL ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    inline: bool,
}

impl SqlWriter {
    fn bound() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            inline: false,
        }
    }

    fn inline() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            inline: true,
        }
    }

    fn literal(&mut self, value: &Literal) {
        if self.inline {
            value.write_inline(&mut self.sql);
        } else {
            self.sql.push('?');
            self.params.push(value.to_value());
        }
    }

    fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Select statement built by value: every builder call returns a new query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    from: String,
    columns: Vec<ColumnExpr>,
    predicates: Vec<Predicate>,
    order_by: Vec<OrderTerm>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    pub fn select(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn from_clause(&self) -> &str {
        &self.from
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn column(mut self, column: impl Into<ColumnExpr>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns(&self) -> &[ColumnExpr] {
        &self.columns
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    pub fn order_terms(&self) -> &[OrderTerm] {
        &self.order_by
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    pub fn to_statement(&self) -> SqlStatement {
        let mut w = SqlWriter::bound();
        self.write(&mut w);
        w.finish()
    }

    /// Wraps this query so only its row count is returned.
    pub fn count_statement(&self) -> SqlStatement {
        let mut w = SqlWriter::bound();
        w.sql.push_str("SELECT COUNT(*) FROM (");
        self.write(&mut w);
        w.sql.push_str(") AS counted");
        w.finish()
    }

    fn write(&self, w: &mut SqlWriter) {
        w.sql.push_str("SELECT ");
        if self.columns.is_empty() {
            w.sql.push('*');
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                w.sql.push_str(", ");
            }
            column.write(w);
        }
        w.sql.push_str(" FROM ");
        w.sql.push_str(&self.from);

        if !self.predicates.is_empty() {
            w.sql.push_str(" WHERE ");
            write_joined(w, &self.predicates, " AND ");
        }

        if !self.order_by.is_empty() {
            w.sql.push_str(" ORDER BY ");
            for (idx, term) in self.order_by.iter().enumerate() {
                if idx > 0 {
                    w.sql.push_str(", ");
                }
                term.expr.write(w);
                w.sql.push_str(match term.direction {
                    SortDirection::Asc => " ASC",
                    SortDirection::Desc => " DESC",
                });
            }
        }

        if self.limit.is_some() || self.offset.is_some() {
            w.sql.push_str(" LIMIT ");
            w.literal(&Literal::Int(self.limit.unwrap_or(-1)));
            if let Some(offset) = self.offset {
                w.sql.push_str(" OFFSET ");
                w.literal(&Literal::Int(offset));
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = SqlWriter::inline();
        self.write(&mut w);
        f.write_str(&w.sql)
    }
}

/// Aggregates computed over a filtered query used as a subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsQuery {
    pub inner: Query,
    pub aggregates: Vec<ColumnExpr>,
}

impl TotalsQuery {
    pub fn to_statement(&self) -> SqlStatement {
        let mut w = SqlWriter::bound();
        self.write(&mut w);
        w.finish()
    }

    fn write(&self, w: &mut SqlWriter) {
        w.sql.push_str("SELECT ");
        for (idx, aggregate) in self.aggregates.iter().enumerate() {
            if idx > 0 {
                w.sql.push_str(", ");
            }
            aggregate.write(w);
        }
        w.sql.push_str(" FROM (");
        self.inner.write(w);
        w.sql.push_str(") AS subtotals");
    }
}

impl fmt::Display for TotalsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = SqlWriter::inline();
        self.write(&mut w);
        f.write_str(&w.sql)
    }
}
