use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::entities::format::{
    display_text, is_truthy, to_datetime, to_decimal, to_f64, NumericFormat,
};
use crate::domain::entities::query::{raw, ColumnExpr, Dialect, Expr, Literal, Query};
use crate::domain::entities::record::Record;
use crate::domain::entities::settings::ExportFormat;
use crate::domain::filters::base::{Filter, FilterError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("key \"{0}\" not found in record")]
    Extraction(String),
    #[error("{0}")]
    Config(String),
}

/// Output a column can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    Html,
    Xls,
    Xlsx,
    Csv,
}

impl RenderTarget {
    pub const ALL: [RenderTarget; 4] = [
        RenderTarget::Html,
        RenderTarget::Xls,
        RenderTarget::Xlsx,
        RenderTarget::Csv,
    ];

    fn is_spreadsheet(self) -> bool {
        matches!(self, RenderTarget::Xls | RenderTarget::Xlsx)
    }
}

impl From<ExportFormat> for RenderTarget {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Xls => RenderTarget::Xls,
            ExportFormat::Xlsx => RenderTarget::Xlsx,
            ExportFormat::Csv => RenderTarget::Csv,
        }
    }
}

/// How a subtotal column is aggregated.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Sum,
    Avg,
    /// Literal SQL used as-is, e.g. `sum(a) / sum(b)`.
    Formula(String),
    Expr(Expr),
}

impl Aggregate {
    /// Aggregate over the subquery column named by `key`, labeled with that name.
    pub fn to_column(&self, key: &str) -> ColumnExpr {
        let name = key.rsplit('.').next().unwrap_or(key);
        let target = raw(name);
        match self {
            Aggregate::Sum => Expr::func("sum", vec![target]).label(name),
            Aggregate::Avg => Expr::func("avg", vec![target]).label(name),
            Aggregate::Formula(sql) => raw(sql.clone()).label(name),
            Aggregate::Expr(expr) => expr.clone().label(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnFormat {
    #[default]
    Plain,
    Bool {
        true_label: String,
        false_label: String,
        reverse: bool,
    },
    Date {
        html_format: String,
    },
    DateTime {
        html_format: String,
    },
    Time {
        html_format: String,
    },
    Numeric(NumericFormat),
}

impl ColumnFormat {
    pub fn yes_no() -> Self {
        ColumnFormat::Bool {
            true_label: "Yes".to_string(),
            false_label: "No".to_string(),
            reverse: false,
        }
    }

    pub fn true_false() -> Self {
        ColumnFormat::Bool {
            true_label: "True".to_string(),
            false_label: "False".to_string(),
            reverse: false,
        }
    }

    pub fn date() -> Self {
        ColumnFormat::Date {
            html_format: "%m/%d/%Y".to_string(),
        }
    }

    pub fn datetime() -> Self {
        ColumnFormat::DateTime {
            html_format: "%m/%d/%Y %I:%M %p".to_string(),
        }
    }

    pub fn time() -> Self {
        ColumnFormat::Time {
            html_format: "%I:%M %p".to_string(),
        }
    }

    fn html_format(&self) -> Option<&str> {
        match self {
            ColumnFormat::Date { html_format }
            | ColumnFormat::DateTime { html_format }
            | ColumnFormat::Time { html_format } => Some(html_format),
            _ => None,
        }
    }

    fn xls_num_format(&self) -> Option<String> {
        match self {
            ColumnFormat::Date { .. } => Some("m/dd/yyyy".to_string()),
            ColumnFormat::DateTime { .. } => Some("mm/dd/yyyy hh:mm am/pm".to_string()),
            ColumnFormat::Time { .. } => Some("hh:mm am/pm".to_string()),
            ColumnFormat::Numeric(numeric) => Some(numeric.xls_num_format()),
            _ => None,
        }
    }
}

/// A rendered cell, typed enough for spreadsheet output.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => number.to_string(),
            CellValue::DateTime(value) => value.to_string(),
        }
    }
}

/// Post-format hook run on every extracted value of one column.
#[derive(Clone)]
pub struct ValueHook(Arc<dyn Fn(Literal) -> Literal + Send + Sync>);

impl ValueHook {
    pub fn new(f: impl Fn(Literal) -> Literal + Send + Sync + 'static) -> Self {
        ValueHook(Arc::new(f))
    }

    fn call(&self, value: Literal) -> Literal {
        (self.0)(value)
    }
}

impl fmt::Debug for ValueHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueHook(..)")
    }
}

#[derive(Debug)]
pub struct Column {
    pub label: String,
    pub key: String,
    pub expr: Option<ColumnExpr>,
    pub filter: Option<Box<dyn Filter>>,
    pub can_sort: bool,
    pub render_in: Vec<RenderTarget>,
    pub has_subtotal: Option<Aggregate>,
    pub format: ColumnFormat,
    pub xls_width: Option<f64>,
    pub xls_num_format: Option<String>,
    hooks: Vec<ValueHook>,
}

impl Column {
    /// Column reading `key` straight from each record; nothing is added to the select list.
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            expr: None,
            filter: None,
            can_sort: true,
            render_in: RenderTarget::ALL.to_vec(),
            has_subtotal: None,
            format: ColumnFormat::Plain,
            xls_width: None,
            xls_num_format: None,
            hooks: Vec::new(),
        }
    }

    /// Column selecting an expression; the key is its output name.
    pub fn from_expr(
        label: impl Into<String>,
        expr: impl Into<ColumnExpr>,
    ) -> Result<Self, ColumnError> {
        let expr = expr.into();
        let key = expr.output_name().map(str::to_string).ok_or_else(|| {
            ColumnError::Config(
                "expected a column-like expression with a name or label".to_string(),
            )
        })?;
        let mut column = Column::new(label, key);
        column.expr = Some(expr);
        Ok(column)
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn boxed_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sortable(mut self, can_sort: bool) -> Self {
        self.can_sort = can_sort;
        self
    }

    pub fn render_in(mut self, targets: &[RenderTarget]) -> Self {
        self.render_in = targets.to_vec();
        self
    }

    pub fn subtotal(mut self, aggregate: Aggregate) -> Self {
        self.has_subtotal = Some(aggregate);
        self
    }

    pub fn format(mut self, format: ColumnFormat) -> Self {
        self.format = format;
        self
    }

    pub fn numeric(self, numeric: NumericFormat) -> Self {
        self.format(ColumnFormat::Numeric(numeric))
    }

    pub fn xls_width(mut self, width: f64) -> Self {
        self.xls_width = Some(width);
        self
    }

    pub fn xls_num_format(mut self, format: impl Into<String>) -> Self {
        self.xls_num_format = Some(format.into());
        self
    }

    pub fn add_hook(&mut self, hook: ValueHook) {
        self.hooks.push(hook);
    }

    /// Copy for one grid instance: the filter is re-instantiated for `dialect`.
    pub fn new_instance(&self, dialect: Option<Dialect>) -> Result<Column, FilterError> {
        let filter = match &self.filter {
            Some(filter) => Some(filter.new_instance(dialect)?),
            None => None,
        };
        Ok(Column {
            label: self.label.clone(),
            key: self.key.clone(),
            expr: self.expr.clone(),
            filter,
            can_sort: self.can_sort,
            render_in: self.render_in.clone(),
            has_subtotal: self.has_subtotal.clone(),
            format: self.format.clone(),
            xls_width: self.xls_width,
            xls_num_format: self.xls_num_format.clone(),
            hooks: self.hooks.clone(),
        })
    }

    pub fn renders_in(&self, target: RenderTarget) -> bool {
        self.render_in.contains(&target)
    }

    pub fn extract_data<'r>(&self, record: &'r Record) -> Result<&'r Literal, ColumnError> {
        let by_output = self
            .expr
            .as_ref()
            .and_then(ColumnExpr::output_name)
            .and_then(|name| record.get(name));
        let tail = self.key.rsplit('.').next().unwrap_or(&self.key);
        by_output
            .or_else(|| record.get(&self.key))
            .or_else(|| record.get(tail))
            .ok_or_else(|| ColumnError::Extraction(self.key.clone()))
    }

    pub fn format_data(&self, value: Literal) -> Literal {
        match &self.format {
            ColumnFormat::Bool {
                true_label,
                false_label,
                reverse,
            } => {
                if is_truthy(&value) != *reverse {
                    Literal::Text(true_label.clone())
                } else {
                    Literal::Text(false_label.clone())
                }
            }
            _ => value,
        }
    }

    pub fn extract_and_format_data(&self, record: &Record) -> Result<Literal, ColumnError> {
        let value = self.format_data(self.extract_data(record)?.clone());
        Ok(self.hooks.iter().fold(value, |value, hook| hook.call(value)))
    }

    pub fn render(&self, target: RenderTarget, record: &Record) -> Result<CellValue, ColumnError> {
        let value = self.extract_and_format_data(record)?;
        if value == Literal::Null {
            return Ok(CellValue::Empty);
        }
        let spreadsheet = target.is_spreadsheet();
        let cell = match &self.format {
            ColumnFormat::Numeric(numeric) if !spreadsheet => match to_decimal(&value) {
                Some(number) => CellValue::Text(numeric.format(number)),
                None => CellValue::Text(display_text(&value)),
            },
            ColumnFormat::Numeric(_) => match to_f64(&value) {
                Some(number) => CellValue::Number(number),
                None => CellValue::Text(display_text(&value)),
            },
            format => match (format.html_format(), to_datetime(&value)) {
                (Some(_), Some(instant)) if spreadsheet => CellValue::DateTime(instant),
                (Some(html_format), Some(instant)) => {
                    CellValue::Text(instant.format(html_format).to_string())
                }
                (None, _) if spreadsheet => match value {
                    Literal::Int(v) => CellValue::Number(v as f64),
                    Literal::Real(v) => CellValue::Number(v),
                    other => CellValue::Text(display_text(&other)),
                },
                _ => CellValue::Text(display_text(&value)),
            },
        };
        if cell == CellValue::Text(String::new()) {
            return Ok(CellValue::Empty);
        }
        Ok(cell)
    }

    pub fn apply_sort(&self, query: Query, descending: bool) -> Query {
        let target = match &self.expr {
            Some(ColumnExpr {
                label: Some(label), ..
            }) => raw(label.clone()),
            Some(ColumnExpr { expr, .. }) => expr.clone(),
            None => raw(self.key.clone()),
        };
        if descending {
            query.order_by(target.desc())
        } else {
            query.order_by(target.asc())
        }
    }

    /// Spreadsheet number format: explicit override first, then one derived from the format.
    pub fn effective_xls_num_format(&self) -> Option<String> {
        self.xls_num_format
            .clone()
            .or_else(|| self.format.xls_num_format())
    }

    pub fn xls_width_calc(&self, value: &CellValue) -> f64 {
        if let Some(width) = self.xls_width {
            return width;
        }
        let text = match (value, self.format.html_format()) {
            (CellValue::DateTime(instant), Some(html_format)) => {
                instant.format(html_format).to_string()
            }
            _ => value.as_text(),
        };
        text.chars().count() as f64
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Column \"{}\">", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::query::col;
    use crate::domain::filters::text::TextFilter;
    use pretty_assertions::assert_eq;

    fn person() -> Record {
        Record::from_pairs([
            ("id", Literal::Int(7)),
            ("firstname", Literal::Text("fn007".into())),
            ("inactive", Literal::Int(1)),
            ("due_date", Literal::Text("2012-03-04".into())),
            ("numericcol", Literal::Real(-1234.5)),
        ])
    }

    #[test]
    fn extraction_prefers_output_name_then_key_then_tail() {
        let labeled = Column::from_expr("Name", col("persons.firstname").label("firstname"))
            .expect("labeled expression");
        assert_eq!(
            labeled.extract_data(&person()),
            Ok(&Literal::Text("fn007".into()))
        );

        let qualified = Column::new("Name", "persons.firstname");
        assert_eq!(
            qualified.extract_data(&person()),
            Ok(&Literal::Text("fn007".into()))
        );

        let missing = Column::new("Nope", "nope");
        assert_eq!(
            missing.extract_data(&person()),
            Err(ColumnError::Extraction("nope".into()))
        );
        assert_eq!(
            missing
                .extract_data(&person())
                .expect_err("missing key")
                .to_string(),
            "key \"nope\" not found in record"
        );
    }

    #[test]
    fn unnamed_expression_is_rejected() {
        let err = Column::from_expr("Sum", Expr::func("sum", vec![col("a")]))
            .expect_err("no output name");
        assert!(matches!(err, ColumnError::Config(_)));
    }

    #[test]
    fn bool_labels_and_reverse() {
        let yes_no = Column::new("Inactive", "inactive").format(ColumnFormat::yes_no());
        assert_eq!(
            yes_no.render(RenderTarget::Html, &person()),
            Ok(CellValue::Text("Yes".into()))
        );

        let reversed = Column::new("Active", "inactive").format(ColumnFormat::Bool {
            true_label: "Yes".into(),
            false_label: "No".into(),
            reverse: true,
        });
        assert_eq!(
            reversed.render(RenderTarget::Csv, &person()),
            Ok(CellValue::Text("No".into()))
        );
    }

    #[test]
    fn dates_render_per_target() {
        let due = Column::new("Due", "due_date").format(ColumnFormat::date());
        assert_eq!(
            due.render(RenderTarget::Html, &person()),
            Ok(CellValue::Text("03/04/2012".into()))
        );
        let xlsx = due
            .render(RenderTarget::Xlsx, &person())
            .expect("xlsx render");
        assert!(matches!(xlsx, CellValue::DateTime(_)));
        assert_eq!(due.xls_width_calc(&xlsx), 10.0);
        assert_eq!(due.effective_xls_num_format().as_deref(), Some("m/dd/yyyy"));
    }

    #[test]
    fn numbers_render_as_text_or_raw() {
        let number = Column::new("Number", "numericcol").numeric(NumericFormat::accounting());
        assert_eq!(
            number.render(RenderTarget::Html, &person()),
            Ok(CellValue::Text("($1,234.50)".into()))
        );
        assert_eq!(
            number.render(RenderTarget::Xlsx, &person()),
            Ok(CellValue::Number(-1234.5))
        );
    }

    #[test]
    fn hooks_run_after_formatting() {
        let mut name = Column::new("Name", "firstname");
        name.add_hook(ValueHook::new(|value| match value {
            Literal::Text(text) => Literal::Text(text.to_uppercase()),
            other => other,
        }));
        assert_eq!(
            name.extract_and_format_data(&person()),
            Ok(Literal::Text("FN007".into()))
        );
    }

    #[test]
    fn sort_uses_raw_key_or_expression() {
        let raw_key = Column::new("Name", "firstname");
        assert_eq!(
            raw_key.apply_sort(Query::select("persons"), true).to_string(),
            "SELECT * FROM persons ORDER BY firstname DESC"
        );

        let expr = Column::from_expr("Name", col("persons.firstname")).expect("named");
        assert_eq!(
            expr.apply_sort(Query::select("persons"), false).to_string(),
            "SELECT * FROM persons ORDER BY persons.firstname ASC"
        );
    }

    #[test]
    fn new_instance_clones_filter_state_free() {
        let mut prototype = Column::from_expr("Name", col("persons.firstname"))
            .expect("named")
            .filter(TextFilter::on(col("persons.firstname")));
        if let Some(filter) = prototype.filter.as_mut() {
            filter.set(Some("eq"), Some("foo"), None).expect("set");
        }

        let instance = prototype
            .new_instance(Some(Dialect::Sqlite))
            .expect("instance");
        let filter = instance.filter.as_ref().expect("filter copied");
        assert!(!filter.is_active());
        assert_eq!(filter.config().dialect, Some(Dialect::Sqlite));
    }

    #[test]
    fn totals_aggregate_by_key() {
        assert_eq!(
            Aggregate::Sum.to_column("numericcol").output_name(),
            Some("numericcol")
        );
        let formula = Aggregate::Formula("sum(a) / sum(b)".into()).to_column("ratio");
        assert_eq!(formula.label.as_deref(), Some("ratio"));
    }
}
