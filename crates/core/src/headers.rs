//! Ordered, case-insensitive, multi-value header map.
//!
//! Header names compare case-insensitively and keep their original spelling.
//! Repeated headers keep every value in arrival order.

use serde::{Deserialize, Serialize};

/// A case-insensitive, multi-value HTTP header map.
///
/// Serializes as a list of `[name, value]` pairs so that repeated headers and
/// insertion order survive a round trip through the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMap {
    inner: Vec<(String, String)>,
}

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header entry. Existing values for the same name are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Replaces every value for `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.inner.push((name, value.into()));
    }

    /// Returns the first value for the given header name, or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all values for the given header name.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` folded into one field value, joined by `", "`.
    ///
    /// This is the combined form RFC 7230 §3.2.2 allows for list headers and
    /// what `Vary` comparisons and `Cache-Control` parsing operate on.
    pub fn get_joined(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.get_all(name).collect();
        if values.is_empty() { None } else { Some(values.join(", ")) }
    }

    /// Removes all entries with the given name. Returns `true` if any were removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Copy of this map without any of the named headers.
    pub fn without<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let inner = self
            .inner
            .iter()
            .filter(|(k, _)| !names.iter().any(|n| k.eq_ignore_ascii_case(n.as_ref())))
            .cloned()
            .collect();
        Self { inner }
    }

    /// Total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_get() {
        let h = HeaderMap::from([("ETag", "\"abc\"")]);
        assert_eq!(h.get("etag"), Some("\"abc\""));
        assert_eq!(h.get("ETAG"), Some("\"abc\""));
        assert!(h.contains("Etag"));
    }

    #[test]
    fn test_multi_value_joined() {
        let mut h = HeaderMap::new();
        h.append("Cache-Control", "public");
        h.append("cache-control", "max-age=60");
        assert_eq!(h.get_all("CACHE-CONTROL").count(), 2);
        assert_eq!(h.get_joined("cache-control").as_deref(), Some("public, max-age=60"));
        assert_eq!(h.get_joined("vary"), None);
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut h = HeaderMap::from([("X-Trace", "1"), ("x-trace", "2")]);
        h.set("X-TRACE", "3");
        assert_eq!(h.get_all("x-trace").collect::<Vec<_>>(), vec!["3"]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_without_strips_named_headers() {
        let h = HeaderMap::from([("Authorization", "Bearer t"), ("Accept", "application/json")]);
        let stripped = h.without(&["authorization"]);
        assert!(!stripped.contains("authorization"));
        assert_eq!(stripped.get("accept"), Some("application/json"));
        assert!(h.contains("Authorization"));
    }

    #[test]
    fn test_serde_preserves_order_and_repeats() {
        let h = HeaderMap::from([("b", "1"), ("a", "2"), ("b", "3")]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"[["b","1"],["a","2"],["b","3"]]"#);
        let back: HeaderMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
