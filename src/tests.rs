use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rusqlite::{params, Connection};

use crate::domain::filters::date::DateFilter;
use crate::domain::filters::datetime::DateTimeFilter;
use crate::domain::filters::numeric::{IntFilter, NumberFilter};
use crate::domain::filters::options::{OptionKey, OptionsFilter};
use crate::domain::filters::text::TextFilter;
use crate::domain::filters::time::TimeFilter;
use crate::domain::filters::yes_no::YesNoFilter;
use crate::infra::sqlite::repo::{SqliteSessionStore, SqliteSource};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::host::RequestHost;
use crate::usecase::ports::session::{MemorySessionStore, SessionKey, SessionStore};
use crate::usecase::services::export_service::ExportService;
use crate::*;

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("datagrid-{prefix}-{nanos}"))
}

struct StaticHost {
    args: QueryArgs,
    flashed: Mutex<Vec<String>>,
}

impl StaticHost {
    fn new(query: &str) -> Arc<Self> {
        Arc::new(Self {
            args: QueryArgs::parse(query),
            flashed: Mutex::new(Vec::new()),
        })
    }

    fn flashed(&self) -> Vec<String> {
        self.flashed.lock().expect("lock").clone()
    }
}

impl RequestHost for StaticHost {
    fn request_args(&self) -> QueryArgs {
        self.args.clone()
    }

    fn flash_message(&self, category: &str, message: &str) {
        self.flashed
            .lock()
            .expect("lock")
            .push(format!("{category}: {message}"));
    }
}

fn seed_persons(db_path: &Path) {
    init_db(db_path).expect("init_db should succeed");
    let conn = Connection::open(db_path).expect("should open sqlite db");
    conn.execute_batch(
        "
        CREATE TABLE persons (
            id          INTEGER PRIMARY KEY,
            firstname   TEXT,
            status      TEXT,
            amount      INTEGER,
            numericcol  REAL,
            inactive    INTEGER,
            due_date    TEXT,
            createdts   TEXT,
            start_time  TEXT
        );
        ",
    )
    .expect("should create persons");

    let rows: [(i64, &str, &str, i64, Option<f64>, i64, Option<&str>, Option<&str>, Option<&str>); 5] = [
        (1, "fn001", "in", 10, Some(1.5), 0, Some("2012-01-01"), Some("2012-01-01 10:00:00"), Some("09:30:00")),
        (2, "fn002", "out", 20, Some(2.5), 1, Some("2012-02-15"), Some("2012-02-15 00:00:00"), Some("13:00:00")),
        (3, "fn003", "in", 30, Some(-3.25), 0, Some("2011-12-25"), Some("2011-12-25 23:59:00"), Some("17:45:00")),
        (4, "bob", "pending", 40, None, 1, None, None, None),
        (5, "fn005", "in", 50, Some(10.0), 0, Some("2012-01-10"), Some("2012-01-10 12:00:00"), Some("08:00:00")),
    ];
    for row in rows {
        conn.execute(
            "INSERT INTO persons(id, firstname, status, amount, numericcol, inactive, due_date, createdts, start_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8],
        )
        .expect("should insert person");
    }
}

fn fixed_now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2012, 1, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid datetime")
}

fn people_grid(settings: GridSettings) -> GridDefinition {
    let statuses = vec![
        (OptionKey::from("in"), "In".to_string()),
        (OptionKey::from("out"), "Out".to_string()),
        (OptionKey::from("pending"), "Pending".to_string()),
    ];
    GridDefinition::new("PeopleGrid", "persons")
        .settings(settings)
        .column(
            Column::from_expr("ID", col("persons.id"))
                .expect("named")
                .filter(IntFilter::on(col("persons.id"))),
        )
        .column(
            Column::from_expr("First Name", col("persons.firstname"))
                .expect("named")
                .filter(TextFilter::on(col("persons.firstname"))),
        )
        .column(
            Column::from_expr("Status", col("persons.status"))
                .expect("named")
                .filter(OptionsFilter::with_options(col("persons.status"), statuses)),
        )
        .column(
            Column::from_expr("Amount", col("persons.amount"))
                .expect("named")
                .filter(IntFilter::on(col("persons.amount")))
                .subtotal(Aggregate::Sum),
        )
        .column(
            Column::from_expr("Number", col("persons.numericcol"))
                .expect("named")
                .filter(NumberFilter::on(col("persons.numericcol")))
                .numeric(NumericFormat::accounting()),
        )
        .column(
            Column::from_expr("Inactive", col("persons.inactive"))
                .expect("named")
                .filter(YesNoFilter::on(col("persons.inactive")))
                .format(ColumnFormat::yes_no()),
        )
        .column(
            Column::from_expr("Due Date", col("persons.due_date"))
                .expect("named")
                .filter(DateFilter::on(col("persons.due_date")).with_now(fixed_now()))
                .format(ColumnFormat::date()),
        )
        .column(
            Column::from_expr("Created", col("persons.createdts"))
                .expect("named")
                .filter(DateTimeFilter::on(col("persons.createdts")).with_now(fixed_now()))
                .format(ColumnFormat::datetime())
                .render_in(&[RenderTarget::Html]),
        )
        .column(
            Column::from_expr("Start", col("persons.start_time"))
                .expect("named")
                .filter(TimeFilter::on(col("persons.start_time")))
                .format(ColumnFormat::time())
                .render_in(&[RenderTarget::Html]),
        )
}

fn build_grid(
    db_path: &Path,
    definition: GridDefinition,
    host: Arc<StaticHost>,
    sessions: Arc<dyn SessionStore>,
) -> Grid {
    let manager = GridManager::new(
        Arc::new(SqliteSource::new(db_path.to_path_buf())),
        host,
        sessions,
    );
    Grid::new(Arc::new(definition), manager).expect("grid should build")
}

fn ids(grid: &Grid) -> Vec<i64> {
    grid.records()
        .expect("records should load")
        .iter()
        .map(|record| match record.get("id") {
            Some(Literal::Int(id)) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

fn with_db(prefix: &str, test: impl FnOnce(&Path)) {
    let temp_dir = unique_test_dir(prefix);
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    seed_persons(&db_path);

    test(&db_path);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn init_db_creates_session_table() {
    with_db("init-db", |db_path| {
        let conn = Connection::open(db_path).expect("should open sqlite db");
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'grid_session'",
                [],
                |row| row.get(0),
            )
            .expect("table count query should succeed");
        assert_eq!(table_count, 1, "grid_session table should exist");
    });
}

#[test]
fn filters_run_against_sqlite() {
    let cases = [
        ("op(firstname)=contains&v1(firstname)=FN00", vec![1, 2, 3, 5]),
        ("op(firstname)=eq&v1(firstname)=BOB", vec![4]),
        ("op(status)=is&v1(status)=out&v1(status)=pending", vec![2, 4]),
        ("op(status)=!is&v1(status)=in&v1(status)=bogus", vec![2, 4]),
        ("op(amount)=gte&v1(amount)=30", vec![3, 4, 5]),
        ("op(numericcol)=lte&v1(numericcol)=2", vec![1, 3]),
        ("op(numericcol)=eq&v1(numericcol)=-3.25", vec![3]),
        ("op(numericcol)=empty", vec![4]),
        ("op(inactive)=y", vec![2, 4]),
        ("op(due_date)=between&v1(due_date)=01/31/2012&v2(due_date)=12/31/2011", vec![1, 5]),
        ("op(due_date)=da&v1(due_date)=5", vec![5]),
        ("op(due_date)=thismonth", vec![1, 5]),
        ("op(createdts)=eq&v1(createdts)=01/10/2012", vec![5]),
        ("op(createdts)=lte&v1(createdts)=12/25/2011", vec![3]),
        ("op(start_time)=gte&v1(start_time)=1:00 PM", vec![2, 3]),
    ];

    with_db("filters", |db_path| {
        for (query, expected) in cases {
            let mut grid = build_grid(
                db_path,
                people_grid(GridSettings::default()),
                StaticHost::new(query),
                Arc::new(MemorySessionStore::new()),
            );
            grid.set_sort(&["id"]);
            grid.apply_qs_args().expect("args should apply");
            assert!(grid.user_warnings().is_empty(), "{query}: {:?}", grid.user_warnings());
            assert_eq!(ids(&grid), expected, "{query}");
            assert_eq!(
                grid.record_count().expect("count"),
                expected.len() as i64,
                "{query}"
            );
        }
    });
}

#[test]
fn default_operator_applies_until_overridden() {
    with_db("default-op", |db_path| {
        let definition = || {
            GridDefinition::new("PeopleGrid", "persons").column(
                Column::from_expr("First Name", col("persons.firstname"))
                    .expect("named")
                    .filter(TextFilter::new(
                        FilterConfig::new(col("persons.firstname"))
                            .default_op("contains")
                            .default_value1("fn"),
                    )),
            )
        };
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

        let mut defaulted = build_grid(db_path, definition(), StaticHost::new(""), sessions.clone());
        defaulted.build().expect("build");
        assert!(defaulted.has_filters());
        assert_eq!(defaulted.record_count().expect("count"), 4);
        assert_eq!(
            defaulted.build_query(true).expect("query").to_string(),
            "SELECT persons.firstname FROM persons \
             WHERE lower(persons.firstname) LIKE lower('%fn%')"
        );

        let mut explicit = build_grid(
            db_path,
            definition(),
            StaticHost::new("op(firstname)=eq&v1(firstname)=bob"),
            sessions,
        );
        explicit.build().expect("build");
        assert_eq!(explicit.record_count().expect("count"), 1);
    });
}

#[test]
fn bad_filter_input_becomes_a_warning() {
    with_db("bad-input", |db_path| {
        let host = StaticHost::new(
            "op(amount)=eq&v1(amount)=ten&op(due_date)=bogus&op(firstname)=eq&v1(firstname)=bob",
        );
        let mut grid = build_grid(
            db_path,
            people_grid(GridSettings::default()),
            host.clone(),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build should not fail on bad input");

        assert_eq!(grid.record_count().expect("count"), 1);
        assert_eq!(
            host.flashed(),
            vec![
                "warning: Amount: Please enter an integer value".to_string(),
                "warning: Due Date: unrecognized operator \"bogus\"".to_string(),
            ]
        );
    });
}

#[test]
fn paging_clamps_silently() {
    with_db("paging", |db_path| {
        let host = StaticHost::new("perpage=2&onpage=99&sort1=-amount");
        let mut grid = build_grid(
            db_path,
            people_grid(GridSettings::default()),
            host.clone(),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");

        assert_eq!(grid.page_count().expect("pages"), 3);
        assert_eq!(grid.on_page(), 3);
        assert_eq!(ids(&grid), vec![1]);
        assert!(host.flashed().is_empty());

        grid.set_paging(Some(2), 1);
        assert_eq!(ids(&grid), vec![5, 4]);
    });
}

#[test]
fn totals_follow_filters_and_paging() {
    with_db("totals", |db_path| {
        let settings = GridSettings {
            subtotals: Subtotals::All,
            per_page: Some(2),
            ..GridSettings::default()
        };
        let mut grid = build_grid(
            db_path,
            people_grid(settings),
            StaticHost::new("op(status)=is&v1(status)=in&sort1=id"),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");

        let grand = grid.grand_totals().expect("grand").expect("row");
        assert_eq!(grand.get("amount"), Some(&Literal::Int(90)));
        let page = grid.page_totals().expect("page").expect("row");
        assert_eq!(page.get("amount"), Some(&Literal::Int(40)));

        let column = grid.column("amount").expect("amount column");
        assert_eq!(
            column.render(RenderTarget::Html, grand),
            Ok(CellValue::Text("90".into()))
        );
    });
}

#[test]
fn average_and_formula_totals() {
    with_db("totals-avg", |db_path| {
        let definition = GridDefinition::new("PeopleGrid", "persons")
            .column(
                Column::from_expr("Amount", col("persons.amount"))
                    .expect("named")
                    .subtotal(Aggregate::Avg),
            )
            .column(
                Column::from_expr("Ratio", col("persons.id"))
                    .expect("named")
                    .subtotal(Aggregate::Formula("sum(amount) / sum(id)".into())),
            );
        let grid = build_grid(
            db_path,
            definition,
            StaticHost::new(""),
            Arc::new(MemorySessionStore::new()),
        );
        let totals = grid.grand_totals().expect("totals").expect("row");
        assert_eq!(totals.get("amount"), Some(&Literal::Real(30.0)));
        assert_eq!(totals.get("id"), Some(&Literal::Int(10)));
    });
}

#[test]
fn search_spans_filtered_columns() {
    with_db("search", |db_path| {
        let settings = GridSettings {
            enable_search: true,
            ..GridSettings::default()
        };
        let mut grid = build_grid(
            db_path,
            people_grid(settings.clone()),
            StaticHost::new("search=bob"),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");
        assert_eq!(ids(&grid), vec![4]);

        let mut by_label = build_grid(
            db_path,
            people_grid(settings),
            StaticHost::new("search=pend"),
            Arc::new(MemorySessionStore::new()),
        );
        by_label.build().expect("build");
        assert_eq!(ids(&by_label), vec![4]);
    });
}

#[test]
fn search_narrows_before_page_clamp() {
    with_db("search-paging", |db_path| {
        let settings = GridSettings {
            enable_search: true,
            ..GridSettings::default()
        };
        let host = StaticHost::new("search=bob&perpage=1&onpage=3");
        let mut grid = build_grid(
            db_path,
            people_grid(settings.clone()),
            host.clone(),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");
        assert_eq!(grid.page_count().expect("pages"), 1);
        assert_eq!(grid.on_page(), 1);
        assert_eq!(ids(&grid), vec![4]);
        assert!(host.flashed().is_empty());

        let mut sorted = build_grid(
            db_path,
            people_grid(settings),
            StaticHost::new("search=fn00&perpage=2&onpage=9&sort1=-id"),
            Arc::new(MemorySessionStore::new()),
        );
        sorted.build().expect("build");
        assert_eq!(sorted.record_count().expect("count"), 4);
        assert_eq!(sorted.on_page(), 2);
        assert_eq!(ids(&sorted), vec![2, 1]);
    });
}

#[test]
fn applying_filters_twice_renders_same_sql() {
    with_db("apply-stable", |db_path| {
        let mut grid = build_grid(
            db_path,
            people_grid(GridSettings::default()),
            StaticHost::new(
                "op(firstname)=contains&v1(firstname)=fn\
                 &op(status)=is&v1(status)=in&v1(status)=out\
                 &op(amount)=gte&v1(amount)=10\
                 &op(numericcol)=lte&v1(numericcol)=5\
                 &op(inactive)=n\
                 &op(due_date)=between&v1(due_date)=01/31/2012&v2(due_date)=12/01/2011\
                 &op(createdts)=lte&v1(createdts)=01/10/2012\
                 &op(start_time)=gte&v1(start_time)=8:00%20AM&sort1=id",
            ),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");
        assert!(grid.user_warnings().is_empty(), "{:?}", grid.user_warnings());

        for column in grid.filtered_columns() {
            let filter = column.filter.as_ref().expect("filtered column");
            assert!(filter.is_active(), "{column}");
            let once = filter
                .apply(Query::select("persons"))
                .expect("apply")
                .to_string();
            let twice = filter
                .apply(Query::select("persons"))
                .expect("apply")
                .to_string();
            assert_eq!(once, twice, "{column}");
        }

        let first = grid.build_query(false).expect("query").to_string();
        assert_eq!(grid.build_query(false).expect("query").to_string(), first);
        assert_eq!(ids(&grid), vec![1, 3]);
        assert_eq!(ids(&grid), vec![1, 3]);
    });
}

#[test]
fn session_args_persist_between_requests() {
    with_db("session", |db_path| {
        let store = Arc::new(SqliteSessionStore::new(db_path.to_path_buf()));
        store.init().expect("session store should init");
        let settings = GridSettings {
            session_on: true,
            ..GridSettings::default()
        };

        let mut first = build_grid(
            db_path,
            people_grid(settings.clone()),
            StaticHost::new("op(status)=is&v1(status)=out&perpage=1&export_to=csv"),
            store.clone(),
        );
        first.build().expect("build");
        let first_key = first.session_key().to_string();
        assert_eq!(first.export_to(), Some(ExportFormat::Csv));

        let saved = store
            .load("PeopleGrid", &SessionKey::Instance(first_key.clone()))
            .expect("load")
            .expect("args saved under session key");
        assert_eq!(saved.get("datagrid"), Some("PeopleGrid"));
        assert!(!saved.contains_key("export_to"));

        // no grid args: the default set comes back
        let mut second = build_grid(
            db_path,
            people_grid(settings.clone()),
            StaticHost::new(""),
            store.clone(),
        );
        second.build().expect("build");
        assert_eq!(second.record_count().expect("count"), 1);
        assert_eq!(second.per_page(), Some(1));
        assert_eq!(second.export_to(), None);

        // a fresh filter replaces the default set
        let mut third = build_grid(
            db_path,
            people_grid(settings.clone()),
            StaticHost::new("op(status)=is&v1(status)=in"),
            store.clone(),
        );
        third.build().expect("build");
        assert_eq!(third.record_count().expect("count"), 3);

        // the first instance is still reachable by its key
        let mut keyed = build_grid(
            db_path,
            people_grid(settings.clone()),
            StaticHost::new(&format!("session_key={first_key}")),
            store.clone(),
        );
        keyed.build().expect("build");
        assert_eq!(keyed.session_key(), first_key);
        assert_eq!(keyed.record_count().expect("count"), 1);

        let mut reset = build_grid(
            db_path,
            people_grid(settings),
            StaticHost::new(&format!("session_key={first_key}&dgreset=1")),
            store,
        );
        reset.build().expect("build");
        assert!(!reset.has_filters());
        assert_eq!(reset.record_count().expect("count"), 5);
    });
}

#[test]
fn extraction_errors_surface() {
    with_db("extraction", |db_path| {
        let definition =
            GridDefinition::new("PeopleGrid", "persons").column(Column::new("Ghost", "ghost"));
        let grid = build_grid(
            db_path,
            definition,
            StaticHost::new(""),
            Arc::new(MemorySessionStore::new()),
        );
        let records = grid.records().expect("records");
        let column = grid.column("ghost").expect("column");
        let err = column
            .render(RenderTarget::Csv, &records.rows[0])
            .expect_err("ghost key should be missing");
        assert_eq!(err, ColumnError::Extraction("ghost".into()));
    });
}

#[test]
fn csv_export_writes_labels_rows_and_totals() {
    with_db("csv-export", |db_path| {
        let settings = GridSettings {
            subtotals: Subtotals::Grand,
            per_page: Some(1),
            ..GridSettings::default()
        };
        let mut grid = build_grid(
            db_path,
            people_grid(settings),
            StaticHost::new("op(status)=is&v1(status)=in&sort1=id&export_to=csv"),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");

        let out_dir = db_path.with_file_name("exports");
        let path = ExportService::new(out_dir)
            .export(&mut grid)
            .expect("csv export should succeed");
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name");
        assert!(file_name.starts_with("people_grid_"), "{file_name}");
        assert!(file_name.ends_with(".csv"), "{file_name}");

        let mut reader = csv::Reader::from_path(&path).expect("should open export");
        let headers: Vec<String> = reader
            .headers()
            .expect("headers")
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(
            headers,
            vec!["ID", "First Name", "Status", "Amount", "Number", "Inactive", "Due Date"]
        );
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|row| row.expect("row").iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            vec!["1", "fn001", "in", "10", "$1.50", "No", "01/01/2012"]
        );
        assert_eq!(rows[1][4], "($3.25)");
        assert_eq!(
            rows[3],
            vec!["Totals (3 records):", "", "", "90", "", "", ""]
        );
    });
}

#[test]
fn export_requires_a_format() {
    with_db("no-format", |db_path| {
        let mut grid = build_grid(
            db_path,
            people_grid(GridSettings::default()),
            StaticHost::new(""),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");
        let err = ExportService::new(db_path.with_file_name("exports"))
            .export(&mut grid)
            .expect_err("no export format");
        assert_eq!(err.to_string(), "No export format set");
    });
}

#[test]
fn xlsx_export_reads_back() {
    with_db("xlsx-export", |db_path| {
        let mut grid = build_grid(
            db_path,
            people_grid(GridSettings::default()),
            StaticHost::new("sort1=id&export_to=xlsx"),
            Arc::new(MemorySessionStore::new()),
        );
        grid.build().expect("build");

        let path = ExportService::new(db_path.with_file_name("exports"))
            .export(&mut grid)
            .expect("xlsx export should succeed");
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("xlsx"));

        let mut workbook = open_workbook_auto(&path).expect("should open xlsx");
        let range = workbook
            .worksheet_range("people_grid")
            .expect("sheet should exist");
        let rows: Vec<&[Data]> = range.rows().collect();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0][0], Data::String("ID".into()));
        assert_eq!(rows[0][6], Data::String("Due Date".into()));
        assert_eq!(rows[1][1], Data::String("fn001".into()));
        assert_eq!(rows[1][3], Data::Float(10.0));
        assert_eq!(rows[1][5], Data::String("No".into()));
        assert_eq!(rows[4][4], Data::Empty);
    });
}
