use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::domain::entities::args::QueryArgs;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Instance(String),
    /// Most recent arguments of any instance, stored as `"_" + grid name`.
    Default,
}

impl SessionKey {
    pub fn storage_key(&self, grid: &str) -> String {
        match self {
            SessionKey::Instance(key) => key.clone(),
            SessionKey::Default => format!("_{grid}"),
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self, grid: &str, key: &SessionKey) -> Result<Option<QueryArgs>, SessionError>;
    fn save(&self, grid: &str, key: &SessionKey, args: &QueryArgs) -> Result<(), SessionError>;
}

/// Process-local store; enough for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<(String, String), QueryArgs>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, grid: &str, key: &SessionKey) -> Result<Option<QueryArgs>, SessionError> {
        let entries = self
            .entries
            .lock()
            .map_err(|err| SessionError::Message(err.to_string()))?;
        Ok(entries
            .get(&(grid.to_string(), key.storage_key(grid)))
            .cloned())
    }

    fn save(&self, grid: &str, key: &SessionKey, args: &QueryArgs) -> Result<(), SessionError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| SessionError::Message(err.to_string()))?;
        entries.insert((grid.to_string(), key.storage_key(grid)), args.clone());
        Ok(())
    }
}
