//! Read side of the response cache.
//!
//! The cache itself belongs to the state container. The middleware only sees
//! it through [`CacheView`] and never writes to it; the container updates it
//! in response to the notifications the middleware emits.

use std::collections::HashMap;

use serde_json::Value;

use crate::http::Method;

/// A previously received response, keyed by full path in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// Method of the request that produced `json`.
    pub method: Method,
    pub json: Value,
}

/// Read-only access to cached responses and in-flight flags.
///
/// Implementations return owned values so no lock outlives a call.
pub trait CacheView: Send + Sync {
    fn cached(&self, path: &str) -> Option<CachedResponse>;

    /// `true` while a request with this logical name is in flight.
    fn is_fetching(&self, name: &str) -> bool;
}

/// Plain-data cache state.
///
/// # Examples
///
/// ```
/// use jawn::cache::{lookup, CacheSnapshot};
/// use jawn::http::Method;
/// use serde_json::json;
///
/// let snapshot = CacheSnapshot::new()
///     .with_entry("/a", Method::Get, json!({"x": 1}))
///     .with_fetching("n", false);
///
/// assert_eq!(lookup(&snapshot, "/a", &Method::Get, "n"), Some(json!({"x": 1})));
/// assert_eq!(lookup(&snapshot, "/a", &Method::Post, "n"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    paths: HashMap<String, CachedResponse>,
    is_fetching: HashMap<String, bool>,
}

impl CacheSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(mut self, path: impl Into<String>, method: Method, json: Value) -> Self {
        self.insert(path, CachedResponse { method, json });
        self
    }

    #[must_use]
    pub fn with_fetching(mut self, name: impl Into<String>, fetching: bool) -> Self {
        self.set_fetching(name, fetching);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: CachedResponse) {
        self.paths.insert(path.into(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<CachedResponse> {
        self.paths.remove(path)
    }

    /// Drops every cached response. In-flight flags are left alone.
    pub fn clear_paths(&mut self) {
        self.paths.clear();
    }

    pub fn set_fetching(&mut self, name: impl Into<String>, fetching: bool) {
        self.is_fetching.insert(name.into(), fetching);
    }

    pub fn get(&self, path: &str) -> Option<&CachedResponse> {
        self.paths.get(path)
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl CacheView for CacheSnapshot {
    fn cached(&self, path: &str) -> Option<CachedResponse> {
        self.paths.get(path).cloned()
    }

    fn is_fetching(&self, name: &str) -> bool {
        self.is_fetching.get(name).copied().unwrap_or(false)
    }
}

/// Returns the cached JSON for a request, if the cache may answer it.
///
/// A hit needs all of:
///
/// 1. an entry at `path` (the full path, query string included),
/// 2. no request named `name` in flight,
/// 3. a method that does not bypass the cache (`POST`/`PUT` never hit),
/// 4. the entry was produced by the same method.
pub fn lookup(view: &dyn CacheView, path: &str, method: &Method, name: &str) -> Option<Value> {
    if method.bypasses_cache() || view.is_fetching(name) {
        return None;
    }
    view.cached(path)
        .filter(|entry| entry.method == *method)
        .map(|entry| entry.json)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot() -> CacheSnapshot {
        CacheSnapshot::new()
            .with_entry("/a", Method::Get, json!({"x": 1}))
            .with_entry("/p", Method::Post, json!({"created": true}))
            .with_entry("/d", Method::Delete, json!({}))
            .with_fetching("n", false)
    }

    #[test]
    fn hit_on_matching_get() {
        assert_eq!(
            lookup(&snapshot(), "/a", &Method::Get, "n"),
            Some(json!({"x": 1}))
        );
    }

    #[test]
    fn unknown_name_counts_as_idle() {
        assert!(lookup(&snapshot(), "/a", &Method::Get, "never-seen").is_some());
    }

    #[test]
    fn miss_when_path_absent() {
        assert_eq!(lookup(&snapshot(), "/a?page=2", &Method::Get, "n"), None);
    }

    #[test]
    fn miss_while_in_flight() {
        let s = snapshot().with_fetching("n", true);
        assert_eq!(lookup(&s, "/a", &Method::Get, "n"), None);
    }

    #[test]
    fn post_and_put_never_hit() {
        let s = snapshot();
        assert_eq!(lookup(&s, "/p", &Method::Post, "n"), None);
        let s = s.with_entry("/u", Method::Put, json!(1));
        assert_eq!(lookup(&s, "/u", &Method::Put, "n"), None);
    }

    #[test]
    fn method_must_match_entry() {
        assert_eq!(lookup(&snapshot(), "/a", &Method::Delete, "n"), None);
        assert_eq!(lookup(&snapshot(), "/d", &Method::Delete, "n"), Some(json!({})));
    }

    #[test]
    fn clear_keeps_fetching_flags() {
        let mut s = snapshot().with_fetching("n", true);
        s.clear_paths();
        assert!(s.is_empty());
        assert!(s.is_fetching("n"));
    }
}
