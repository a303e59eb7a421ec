//! Query parameters attached to an action and the string built from them.
//!
//! The query string doubles as part of the cache key. Keys are written in the
//! order they were first inserted and values verbatim, without
//! percent-encoding; escaping happens only when a request goes on the wire.

use std::fmt;

/// A scalar query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl QueryValue {
    /// `Null` and the literal string `"undefined"` are dropped from the query string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s == "undefined",
            _ => false,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Query parameters keyed by name, in insertion order.
///
/// # Examples
///
/// ```
/// use jawn::query::{Query, QueryValue};
///
/// let query = Query::new()
///     .param("page", 2)
///     .param("filter", QueryValue::Null)
///     .param("q", "rust");
///
/// assert_eq!(query.to_query_string(), "?page=2&q=rust");
/// assert_eq!(query.apply("/search"), "/search?page=2&q=rust");
///
/// let query = query.param("page", 3);
/// assert_eq!(query.to_query_string(), "?page=3&q=rust");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, or replaces the value of an existing key in place.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let (key, value) = (key.into(), value.into());
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Builds `?k=v&k2=v2` from the non-empty parameters, or `""` if there are none.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.params.iter().filter(|(_, v)| !v.is_empty()) {
            out.push(if out.is_empty() { '?' } else { '&' });
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
        }
        out
    }

    /// Appends the query string to `path` verbatim.
    pub fn apply(&self, path: &str) -> String {
        let mut full = String::with_capacity(path.len() + 16);
        full.push_str(path);
        full.push_str(&self.to_query_string());
        full
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

/// Resolves the effective path for an action: `path` plus the query string
/// when a query is present, `path` untouched otherwise.
pub fn effective_path(path: &str, query: Option<&Query>) -> String {
    match query {
        Some(query) => query.apply(path),
        None => path.to_owned(),
    }
}
