use thiserror::Error;

use crate::domain::entities::query::{Dialect, SqlStatement};
use crate::domain::entities::record::{Record, RecordSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{0}")]
    Message(String),
}

/// Backend a grid runs its statements against.
pub trait DataSource: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn count(&self, statement: &SqlStatement) -> Result<i64, SourceError>;
    fn fetch(&self, statement: &SqlStatement) -> Result<RecordSet, SourceError>;

    /// Single aggregate row, or `None` when the statement yields no rows.
    fn fetch_totals(&self, statement: &SqlStatement) -> Result<Option<Record>, SourceError>;
}
