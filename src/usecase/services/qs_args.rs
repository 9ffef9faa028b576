use tracing::warn;

use crate::domain::entities::args::QueryArgs;
use crate::usecase::ports::session::{SessionError, SessionKey, SessionStore};

const FILTER_ARG_KINDS: [&str; 3] = ["op", "v1", "v2"];

/// Query-string keys for one grid, namespaced by its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgKeys {
    prefix: String,
}

impl ArgKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn op(&self, column: &str) -> String {
        self.key(&format!("op({column})"))
    }

    pub fn v1(&self, column: &str) -> String {
        self.key(&format!("v1({column})"))
    }

    pub fn v2(&self, column: &str) -> String {
        self.key(&format!("v2({column})"))
    }

    pub fn sort(&self, position: usize) -> String {
        self.key(&format!("sort{position}"))
    }

    /// Column key of a prefixed `op(<key>)` argument.
    fn op_column<'a>(&self, arg: &'a str) -> Option<&'a str> {
        arg.strip_prefix(self.prefix.as_str())?
            .strip_prefix("op(")?
            .strip_suffix(')')
    }

    pub fn has_op(&self, args: &QueryArgs) -> bool {
        args.keys().any(|key| self.op_column(key).is_some())
    }

    fn has_page(&self, args: &QueryArgs) -> bool {
        args.contains_key(&self.key("onpage")) || args.contains_key(&self.key("perpage"))
    }

    fn has_sort(&self, args: &QueryArgs, max_sort_keys: usize) -> bool {
        (1..=max_sort_keys).any(|position| args.contains_key(&self.sort(position)))
    }
}

/// Result of merging request arguments with a persisted argument set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub args: QueryArgs,
    pub session_key: String,
    pub foreign_session_loaded: bool,
}

/// Session-aware argument resolution for one grid.
pub struct SessionReconciler<'a> {
    pub grid_name: &'a str,
    pub keys: &'a ArgKeys,
    pub max_sort_keys: usize,
    pub store: &'a dyn SessionStore,
}

impl SessionReconciler<'_> {
    /// Picks the argument set for this request and persists it for the next one.
    pub fn reconcile(
        &self,
        request: &QueryArgs,
        session_key: String,
    ) -> Result<Reconciled, SessionError> {
        let session_key = request
            .get(&self.keys.key("session_key"))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .unwrap_or(session_key);

        let authoritative = request.contains_key(&self.keys.key("apply"));
        let overriding = request.contains_key(&self.keys.key("session_override"));
        let mut foreign_session_loaded = false;

        let mut args = request.clone();
        if !authoritative && (overriding || !self.keys.has_op(request)) {
            let mut session_args = self.stored_or_request(request, &session_key)?;
            if overriding {
                self.override_filters(&mut session_args, request);
            }
            if self.keys.has_page(request) {
                for name in ["onpage", "perpage"] {
                    let key = self.keys.key(name);
                    session_args.set_all(&key, request.get_all(&key));
                }
            }
            if self.keys.has_sort(request, self.max_sort_keys) {
                for position in 1..=self.max_sort_keys {
                    let key = self.keys.sort(position);
                    session_args.set_all(&key, request.get_all(&key));
                }
            }
            if session_args
                .get("datagrid")
                .is_some_and(|owner| owner != self.grid_name)
            {
                foreign_session_loaded = true;
            }
            args = session_args;
        }

        let export_key = self.keys.key("export_to");
        if request.contains_key(&export_key) {
            args.set_all(&export_key, request.get_all(&export_key));
        }
        self.save(&args, &session_key)?;

        Ok(Reconciled {
            args,
            session_key,
            foreign_session_loaded,
        })
    }

    fn stored_or_request(
        &self,
        request: &QueryArgs,
        session_key: &str,
    ) -> Result<QueryArgs, SessionError> {
        let reset = request.contains_key(&self.keys.key("dgreset"));
        let lookup = if request
            .get(&self.keys.key("session_key"))
            .is_some_and(|key| !key.is_empty())
        {
            SessionKey::Instance(session_key.to_string())
        } else {
            SessionKey::Default
        };
        let stored = self.store.load(self.grid_name, &lookup)?;
        Ok(match stored {
            Some(stored) if !reset && !stored.is_empty() => stored,
            _ => request.clone(),
        })
    }

    fn override_filters(&self, session_args: &mut QueryArgs, request: &QueryArgs) {
        let columns: Vec<&str> = request
            .keys()
            .filter_map(|key| self.keys.op_column(key))
            .collect();
        for column in columns {
            for kind in FILTER_ARG_KINDS {
                let key = self.keys.key(&format!("{kind}({column})"));
                session_args.set_all(&key, request.get_all(&key));
            }
        }
    }

    fn save(&self, args: &QueryArgs, session_key: &str) -> Result<(), SessionError> {
        let mut stored = args.clone();
        stored.remove(&self.keys.key("export_to"));
        stored.remove(&self.keys.key("dgreset"));
        stored.remove(&self.keys.key("apply"));
        stored.remove(&self.keys.key("session_override"));
        stored.set("datagrid", self.grid_name);

        self.store.save(
            self.grid_name,
            &SessionKey::Instance(session_key.to_string()),
            &stored,
        )?;
        if let Err(err) = self.store.save(self.grid_name, &SessionKey::Default, &stored) {
            warn!(grid = self.grid_name, error = %err, "failed to store default grid arguments");
        }
        Ok(())
    }
}
