use std::path::PathBuf;

use crate::domain::entities::args::QueryArgs;
use crate::domain::entities::query::{Dialect, SqlStatement};
use crate::domain::entities::record::{Record, RecordSet};
use crate::infra::sqlite::queries::{
    count_rows, fetch_first_row, fetch_rows, load_session_args, save_session_args,
};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::session::{SessionError, SessionKey, SessionStore};
use crate::usecase::ports::source::{DataSource, SourceError};

/// Grid rows served from a SQLite file; one connection per call.
pub struct SqliteSource {
    pub db_path: PathBuf,
}

impl SqliteSource {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

impl DataSource for SqliteSource {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn count(&self, statement: &SqlStatement) -> Result<i64, SourceError> {
        count_rows(&self.db_path, statement).map_err(|err| SourceError::Message(format!("{err:#}")))
    }

    fn fetch(&self, statement: &SqlStatement) -> Result<RecordSet, SourceError> {
        fetch_rows(&self.db_path, statement).map_err(|err| SourceError::Message(format!("{err:#}")))
    }

    fn fetch_totals(&self, statement: &SqlStatement) -> Result<Option<Record>, SourceError> {
        fetch_first_row(&self.db_path, statement)
            .map_err(|err| SourceError::Message(format!("{err:#}")))
    }
}

pub struct SqliteSessionStore {
    pub db_path: PathBuf,
}

impl SqliteSessionStore {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn init(&self) -> Result<(), SessionError> {
        init_db(&self.db_path).map_err(|err| SessionError::Message(err.to_string()))
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, grid: &str, key: &SessionKey) -> Result<Option<QueryArgs>, SessionError> {
        load_session_args(&self.db_path, grid, &key.storage_key(grid))
            .map_err(|err| SessionError::Message(err.to_string()))
    }

    fn save(&self, grid: &str, key: &SessionKey, args: &QueryArgs) -> Result<(), SessionError> {
        save_session_args(&self.db_path, grid, &key.storage_key(grid), args)
            .map_err(|err| SessionError::Message(err.to_string()))
    }
}
