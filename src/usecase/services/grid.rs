use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::unsync::OnceCell;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::args::QueryArgs;
use crate::domain::entities::column::{Column, ColumnError, RenderTarget, ValueHook};
use crate::domain::entities::query::{Literal, Predicate, Query, TotalsQuery};
use crate::domain::entities::record::{Record, RecordSet};
use crate::domain::entities::settings::{ExportFormat, GridSettings};
use crate::domain::filters::base::FilterError;
use crate::usecase::ports::host::RequestHost;
use crate::usecase::ports::session::{SessionError, SessionStore};
use crate::usecase::ports::source::{DataSource, SourceError};
use crate::usecase::services::qs_args::{ArgKeys, SessionReconciler};

const SESSION_KEY_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum GridError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no filtered column with key \"{0}\"")]
    UnknownFilter(String),
    #[error("No export format set")]
    NoExportFormat,
}

/// Receives the base query plus `has_sort` and `has_filters`.
pub type QueryPrep = Arc<dyn Fn(Query, bool, bool) -> Query + Send + Sync>;
pub type BeforeQuery = Arc<dyn Fn(&mut Grid) + Send + Sync>;

/// Immutable grid template; every [`Grid`] clones its columns and filters.
pub struct GridDefinition {
    name: String,
    identifier: Option<String>,
    from: String,
    columns: Vec<Column>,
    settings: GridSettings,
    prep: Option<QueryPrep>,
    before_query: Option<BeforeQuery>,
    column_hooks: Vec<(String, ValueHook)>,
}

impl GridDefinition {
    pub fn new(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            from: from.into(),
            columns: Vec::new(),
            settings: GridSettings::default(),
            prep: None,
            before_query: None,
            column_hooks: Vec::new(),
        }
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn settings(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn prep(mut self, f: impl Fn(Query, bool, bool) -> Query + Send + Sync + 'static) -> Self {
        self.prep = Some(Arc::new(f));
        self
    }

    pub fn before_query(mut self, f: impl Fn(&mut Grid) + Send + Sync + 'static) -> Self {
        self.before_query = Some(Arc::new(f));
        self
    }

    /// Post-format hook for every value rendered by the column with `key`.
    pub fn column_hook(
        mut self,
        key: impl Into<String>,
        f: impl Fn(Literal) -> Literal + Send + Sync + 'static,
    ) -> Self {
        self.column_hooks.push((key.into(), ValueHook::new(f)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prototype_columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn grid_settings(&self) -> &GridSettings {
        &self.settings
    }
}

impl fmt::Debug for GridDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridDefinition")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("from", &self.from)
            .field("columns", &self.columns)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Host collaborators a grid talks to.
#[derive(Clone)]
pub struct GridManager {
    pub source: Arc<dyn DataSource>,
    pub host: Arc<dyn RequestHost>,
    pub sessions: Arc<dyn SessionStore>,
}

impl GridManager {
    pub fn new(
        source: Arc<dyn DataSource>,
        host: Arc<dyn RequestHost>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            source,
            host,
            sessions,
        }
    }
}

/// Request-scoped grid instance.
pub struct Grid {
    definition: Arc<GridDefinition>,
    manager: GridManager,
    ident: Option<String>,
    columns: Vec<Column>,
    key_column_map: HashMap<String, usize>,
    filtered_cols: Vec<usize>,
    subtotal_cols: Vec<usize>,
    order_by: Vec<(String, bool)>,
    per_page: Option<i64>,
    on_page: i64,
    pager_on: bool,
    session_key: String,
    foreign_session_loaded: bool,
    export_to: Option<ExportFormat>,
    search_value: Option<String>,
    user_warnings: Vec<String>,
    record_count: OnceCell<i64>,
    records: OnceCell<RecordSet>,
    page_totals: OnceCell<Option<Record>>,
    grand_totals: OnceCell<Option<Record>>,
}

impl Grid {
    pub fn new(definition: Arc<GridDefinition>, manager: GridManager) -> Result<Self, GridError> {
        let dialect = manager.source.dialect();
        let mut columns = Vec::with_capacity(definition.columns.len());
        let mut key_column_map = HashMap::new();
        let mut filtered_cols = Vec::new();
        let mut subtotal_cols = Vec::new();

        for (idx, prototype) in definition.columns.iter().enumerate() {
            let mut column = prototype.new_instance(Some(dialect.clone()))?;
            for (key, hook) in &definition.column_hooks {
                if *key == column.key {
                    column.add_hook(hook.clone());
                }
            }
            key_column_map.insert(column.key.clone(), idx);
            if column.filter.is_some() {
                filtered_cols.push(idx);
            }
            if column.has_subtotal.is_some() {
                subtotal_cols.push(idx);
            }
            columns.push(column);
        }

        let settings = &definition.settings;
        Ok(Self {
            ident: None,
            per_page: settings.per_page,
            on_page: settings.on_page,
            pager_on: settings.pager_on,
            session_key: random_session_key(),
            columns,
            key_column_map,
            filtered_cols,
            subtotal_cols,
            order_by: Vec::new(),
            foreign_session_loaded: false,
            export_to: None,
            search_value: None,
            user_warnings: Vec::new(),
            record_count: OnceCell::new(),
            records: OnceCell::new(),
            page_totals: OnceCell::new(),
            grand_totals: OnceCell::new(),
            definition,
            manager,
        })
    }

    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn ident(&self) -> String {
        self.ident
            .clone()
            .or_else(|| self.definition.identifier.clone())
            .unwrap_or_else(|| snake_case(&self.definition.name))
    }

    pub fn settings(&self) -> &GridSettings {
        &self.definition.settings
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.key_column_map
            .get(key)
            .and_then(|idx| self.columns.get(*idx))
    }

    pub fn column_mut(&mut self, key: &str) -> Option<&mut Column> {
        self.clear_record_cache();
        let idx = *self.key_column_map.get(key)?;
        self.columns.get_mut(idx)
    }

    pub fn iter_columns(&self, target: RenderTarget) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(move |column| column.renders_in(target))
    }

    pub fn filtered_columns(&self) -> impl Iterator<Item = &Column> {
        self.filtered_cols.iter().map(|idx| &self.columns[*idx])
    }

    pub fn subtotal_columns(&self) -> impl Iterator<Item = &Column> {
        self.subtotal_cols.iter().map(|idx| &self.columns[*idx])
    }

    pub fn has_subtotals(&self) -> bool {
        !self.subtotal_cols.is_empty()
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn per_page(&self) -> Option<i64> {
        self.per_page
    }

    pub fn on_page(&self) -> i64 {
        self.on_page
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn foreign_session_loaded(&self) -> bool {
        self.foreign_session_loaded
    }

    pub fn export_to(&self) -> Option<ExportFormat> {
        self.export_to
    }

    pub fn search_value(&self) -> Option<&str> {
        self.search_value.as_deref()
    }

    pub fn user_warnings(&self) -> &[String] {
        &self.user_warnings
    }

    pub fn can_search(&self) -> bool {
        self.definition.settings.enable_search
            && self.filtered_columns().any(|column| {
                column
                    .filter
                    .as_ref()
                    .is_some_and(|filter| filter.search_expr().is_some())
            })
    }

    pub fn has_filters(&self) -> bool {
        self.filtered_columns().any(|column| {
            column
                .filter
                .as_ref()
                .is_some_and(|filter| filter.is_active())
        })
    }

    pub fn has_sort(&self) -> bool {
        !self.order_by.is_empty()
    }

    pub fn set_filter(
        &mut self,
        key: &str,
        op: Option<&str>,
        value1: Option<&str>,
        value2: Option<&str>,
    ) -> Result<(), GridError> {
        self.clear_record_cache();
        let filter = self
            .key_column_map
            .get(key)
            .and_then(|idx| self.columns.get_mut(*idx))
            .and_then(|column| column.filter.as_mut())
            .ok_or_else(|| GridError::UnknownFilter(key.to_string()))?;
        filter.set(op, value1, value2)?;
        Ok(())
    }

    /// Replaces the sort order; `-key` sorts descending, blanks are skipped.
    pub fn set_sort<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.clear_record_cache();
        self.order_by.clear();

        for key in keys {
            let key = key.as_ref();
            if key.is_empty() {
                continue;
            }
            let (key, descending) = match key.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (key, false),
            };
            if self.column(key).is_some_and(|column| column.can_sort) {
                self.order_by.push((key.to_string(), descending));
            } else if !self.foreign_session_loaded {
                self.user_warnings
                    .push(format!("can't sort on invalid key \"{key}\""));
            }
        }
    }

    pub fn set_paging(&mut self, per_page: Option<i64>, on_page: i64) {
        self.clear_record_cache();
        self.per_page = per_page;
        self.on_page = on_page;
    }

    pub fn set_pager_on(&mut self, pager_on: bool) {
        self.clear_record_cache();
        self.pager_on = pager_on;
    }

    pub fn set_search(&mut self, value: Option<&str>) {
        self.clear_record_cache();
        self.search_value = value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
    }

    pub fn set_export_to(&mut self, to: Option<&str>) {
        self.export_to = to
            .and_then(ExportFormat::from_key)
            .filter(|format| self.definition.settings.allows_export(*format));
    }

    /// Primes the cached rows, e.g. with records computed outside the grid.
    pub fn set_records(&mut self, records: RecordSet) {
        self.clear_record_cache();
        let count = records.len() as i64;
        let _ = self.record_count.set(count);
        let _ = self.records.set(records);
    }

    pub fn clear_record_cache(&mut self) {
        self.record_count = OnceCell::new();
        self.records = OnceCell::new();
        self.page_totals = OnceCell::new();
        self.grand_totals = OnceCell::new();
    }

    fn clear_page_cache(&mut self) {
        self.records = OnceCell::new();
        self.page_totals = OnceCell::new();
    }

    pub fn record_count(&self) -> Result<i64, GridError> {
        self.record_count
            .get_or_try_init(|| {
                let query = self.build_query(true)?;
                self.timed("Count", || self.manager.source.count(&query.count_statement()))
            })
            .copied()
    }

    pub fn records(&self) -> Result<&RecordSet, GridError> {
        self.records.get_or_try_init(|| {
            let query = self.build_query(false)?;
            self.timed("Data", || self.manager.source.fetch(&query.to_statement()))
        })
    }

    pub fn page_totals(&self) -> Result<Option<&Record>, GridError> {
        self.page_totals
            .get_or_try_init(|| self.totals_col_results(true))
            .map(Option::as_ref)
    }

    pub fn grand_totals(&self) -> Result<Option<&Record>, GridError> {
        self.grand_totals
            .get_or_try_init(|| self.totals_col_results(false))
            .map(Option::as_ref)
    }

    pub fn page_count(&self) -> Result<i64, GridError> {
        match self.per_page {
            Some(per_page) if per_page > 0 => {
                Ok((self.record_count()? - 1).max(0) / per_page + 1)
            }
            _ => Ok(1),
        }
    }

    pub fn totals_query(&self, page_totals_only: bool) -> Result<TotalsQuery, GridError> {
        let aggregates = self
            .subtotal_columns()
            .filter_map(|column| {
                column
                    .has_subtotal
                    .as_ref()
                    .map(|aggregate| aggregate.to_column(&column.key))
            })
            .collect();
        Ok(TotalsQuery {
            inner: self.build_query(!page_totals_only)?,
            aggregates,
        })
    }

    fn totals_col_results(&self, page_totals_only: bool) -> Result<Option<Record>, GridError> {
        if !self.has_subtotals() {
            return Ok(None);
        }
        let query = self.totals_query(page_totals_only)?;
        self.timed("Totals", || {
            self.manager.source.fetch_totals(&query.to_statement())
        })
    }

    pub fn build_query(&self, for_count: bool) -> Result<Query, GridError> {
        let has_filters = self.has_filters();
        let mut query = self.query_base();
        if let Some(prep) = &self.definition.prep {
            query = prep(query, self.has_sort() || for_count, has_filters);
        }

        if has_filters {
            query = self.query_filters(query)?;
        }
        query = self.query_search(query);

        if for_count {
            return Ok(query);
        }

        query = self.query_sort(query);
        if self.pager_on {
            query = self.query_paging(query);
        }
        Ok(query)
    }

    fn query_base(&self) -> Query {
        self.columns
            .iter()
            .filter_map(|column| column.expr.clone())
            .fold(Query::select(self.definition.from.clone()), Query::column)
    }

    fn query_filters(&self, mut query: Query) -> Result<Query, GridError> {
        for column in self.filtered_columns() {
            if let Some(filter) = column.filter.as_ref().filter(|filter| filter.is_active()) {
                query = filter.apply(query)?;
            }
        }
        Ok(query)
    }

    fn query_search(&self, query: Query) -> Query {
        let Some(term) = self.search_value.as_deref() else {
            return query;
        };
        if !self.definition.settings.enable_search {
            return query;
        }
        let predicates: Vec<Predicate> = self
            .filtered_columns()
            .filter_map(|column| column.filter.as_ref()?.search_expr())
            .filter_map(|search| search(term))
            .collect();
        match Predicate::any(predicates) {
            Some(predicate) => query.filter(predicate),
            None => query,
        }
    }

    fn query_sort(&self, mut query: Query) -> Query {
        let mut seen: Vec<&str> = Vec::new();
        for (key, descending) in &self.order_by {
            let Some(column) = self.column(key) else {
                continue;
            };
            if seen.contains(&column.key.as_str()) {
                continue;
            }
            seen.push(column.key.as_str());
            query = column.apply_sort(query, *descending);
        }
        query
    }

    fn query_paging(&self, query: Query) -> Query {
        match self.per_page {
            Some(per_page) if per_page > 0 && self.on_page > 0 => query
                .offset((self.on_page - 1).saturating_mul(per_page))
                .limit(per_page),
            _ => query,
        }
    }

    /// `build()` minus the count: reads request arguments and applies them.
    pub fn apply_qs_args(&mut self) -> Result<(), GridError> {
        let args = self.manager.host.request_args();
        self.apply_args(args, true)
    }

    pub fn apply_args(&mut self, args: QueryArgs, add_user_warnings: bool) -> Result<(), GridError> {
        self.clear_record_cache();
        let keys = ArgKeys::new(self.definition.settings.qs_prefix.clone());
        let max_sort_keys = self.definition.settings.max_sort_keys;

        let args = if self.definition.settings.session_on {
            let reconciler = SessionReconciler {
                grid_name: &self.definition.name,
                keys: &keys,
                max_sort_keys,
                store: self.manager.sessions.as_ref(),
            };
            let reconciled = reconciler.reconcile(&args, self.session_key.clone())?;
            self.session_key = reconciled.session_key;
            self.foreign_session_loaded = reconciled.foreign_session_loaded;
            reconciled.args
        } else {
            args
        };

        // filters first: onpage clamps against the filtered page count
        for idx in self.filtered_cols.clone() {
            let column = &mut self.columns[idx];
            let Some(filter) = column.filter.as_mut() else {
                continue;
            };
            let mut outcome = Ok(());
            if filter.config().has_default_op() {
                outcome = filter.set(None, None, None);
            }
            if let Some(op) = args.get(&keys.op(&column.key)) {
                let mut values1 = args.get_all(&keys.v1(&column.key));
                if !filter.receives_list() {
                    values1.truncate(1);
                }
                let value2 = args.get(&keys.v2(&column.key));
                outcome = filter.set_list(Some(op), &values1, value2);
            }
            if let Err(err) = outcome {
                let message = filter.format_invalid(&err, &column.label);
                self.user_warnings.push(message);
            }
        }

        // search narrows the row count the onpage clamp reads
        if self.definition.settings.enable_search {
            self.set_search(args.get(&keys.key("search")));
        }

        let per_page_key = keys.key("perpage");
        if let Some(raw) = args.get(&per_page_key) {
            let per_page = self.int_arg(raw, &per_page_key).unwrap_or(1).max(1);
            self.per_page = Some(per_page);
            self.clear_page_cache();
        }

        let on_page_key = keys.key("onpage");
        if let Some(raw) = args.get(&on_page_key) {
            let on_page = self.int_arg(raw, &on_page_key).unwrap_or(1).max(1);
            self.on_page = on_page.min(self.page_count()?);
            self.clear_page_cache();
        }

        let sorts: Vec<String> = (1..=max_sort_keys)
            .filter_map(|position| args.get(&keys.sort(position)).map(str::to_string))
            .collect();
        if !sorts.is_empty() {
            self.set_sort(&sorts);
        }

        self.set_export_to(args.get(&keys.key("export_to")));

        if add_user_warnings {
            for message in &self.user_warnings {
                self.manager.host.flash_message("warning", message);
            }
        }
        Ok(())
    }

    pub fn build(&mut self) -> Result<(), GridError> {
        self.apply_qs_args()?;
        if let Some(hook) = self.definition.before_query.clone() {
            hook(self);
        }
        self.record_count()?;
        Ok(())
    }

    fn int_arg(&mut self, raw: &str, key: &str) -> Option<i64> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.user_warnings
                    .push(format!("\"{key}\" grid argument invalid, ignoring"));
                None
            }
        }
    }

    fn timed<T>(
        &self,
        kind: &str,
        run: impl FnOnce() -> Result<T, SourceError>,
    ) -> Result<T, GridError> {
        debug!("{}", self);
        debug!("{}", self.filters_summary());
        debug!("{}", self.sorts_summary());
        debug!(
            "Page {}; {} per page",
            self.on_page,
            self.per_page
                .map(|per_page| per_page.to_string())
                .unwrap_or_else(|| "None".to_string())
        );
        let started = Instant::now();
        let result = run()?;
        debug!(
            "{kind} query ran in {:.4} seconds",
            started.elapsed().as_secs_f64()
        );
        Ok(result)
    }

    fn filters_summary(&self) -> String {
        let active: Vec<String> = self
            .filtered_columns()
            .filter_map(|column| {
                let filter = column.filter.as_ref()?;
                filter
                    .is_active()
                    .then(|| format!("{}: {}", column.key, filter.summary()))
            })
            .collect();
        if active.is_empty() {
            "No filters".to_string()
        } else {
            active.join(";")
        }
    }

    fn sorts_summary(&self) -> String {
        if self.order_by.is_empty() {
            return "No sorts".to_string();
        }
        self.order_by
            .iter()
            .map(|(key, descending)| {
                if *descending {
                    format!("-{key}")
                } else {
                    key.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Grid \"{}\">", self.definition.name)
    }
}

fn random_session_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(char::from)
        .collect()
}

/// `PeopleGrid` -> `people_grid`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
