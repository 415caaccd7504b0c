//! Query keys and key prefixes.
//!
//! A key is `(kind, optional id, filters)`. Keys are equal iff all three
//! are equal; filters are kept in a `BTreeMap` so equality and ordering
//! ignore insertion order.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey {
    kind: String,
    id: Option<String>,
    filters: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            filters: BTreeMap::new(),
        }
    }

    /// Scope the key to one entity, e.g. `student:{id}`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(name.into(), value.to_string());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if let Some(id) = &self.id {
            write!(f, ":{id}")?;
        }
        write_filters(f, &self.filters)
    }
}

/// Selects every key with the same kind, the same id (when the prefix
/// names one), and a superset of the prefix's filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPrefix {
    kind: String,
    id: Option<String>,
    filters: BTreeMap<String, String>,
}

impl QueryPrefix {
    /// Every key of `kind`.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(name.into(), value.to_string());
        self
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        if self.kind != key.kind {
            return false;
        }
        if self.id.is_some() && self.id != key.id {
            return false;
        }
        self.filters
            .iter()
            .all(|(name, value)| key.filters.get(name) == Some(value))
    }

    /// True when the prefix selects a whole kind.
    pub fn is_broad(&self) -> bool {
        self.id.is_none() && self.filters.is_empty()
    }
}

impl From<&QueryKey> for QueryPrefix {
    fn from(key: &QueryKey) -> Self {
        Self {
            kind: key.kind.clone(),
            id: key.id.clone(),
            filters: key.filters.clone(),
        }
    }
}

impl From<QueryKey> for QueryPrefix {
    fn from(key: QueryKey) -> Self {
        Self {
            kind: key.kind,
            id: key.id,
            filters: key.filters,
        }
    }
}

impl fmt::Display for QueryPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if let Some(id) = &self.id {
            write!(f, ":{id}")?;
        }
        write_filters(f, &self.filters)?;
        if self.is_broad() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

fn write_filters(f: &mut fmt::Formatter<'_>, filters: &BTreeMap<String, String>) -> fmt::Result {
    if filters.is_empty() {
        return Ok(());
    }
    f.write_str("{")?;
    for (i, (name, value)) in filters.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{name}={value}")?;
    }
    f.write_str("}")
}
