use std::sync::Arc;

use crate::domain::entities::query::Literal;

/// One result row; field names are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    names: Arc<[String]>,
    values: Vec<Literal>,
}

impl Record {
    pub fn new(names: Arc<[String]>, values: Vec<Literal>) -> Self {
        Self { names, values }
    }

    /// Convenience for building rows by hand.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Literal)>) -> Self {
        let (names, values): (Vec<String>, Vec<Literal>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self {
            names: names.into(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Literal] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A materialised page of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}
