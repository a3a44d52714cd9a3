//! HTTP header map with case-insensitive name lookup.
//!
//! Header names are case-insensitive and a name may carry several values
//! (RFC 9110 §5); insertion order is preserved for serialization.

use std::fmt;

/// A case-insensitive, order-preserving, multi-value header map.
///
/// # Examples
///
/// ```
/// use gears_router::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/html; charset=utf-8");
/// assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html; charset=utf-8"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry. Multiple values for the same name are kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every entry with the given name by a single entry, or appends
    /// when the name is absent. Used for singleton headers such as
    /// `Content-Type`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.entries.push((name, value.into()));
    }

    /// Returns the first value for the given name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for the given name, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes all entries with the given name; returns `true` if any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.entries.len() < before
    }

    /// Returns `true` if at least one entry with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Returns the total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut h = Headers::new();
        h.insert("X-Request-Id", "abc");
        assert_eq!(h.get("x-request-id"), Some("abc"));
        assert_eq!(h.get("X-REQUEST-ID"), Some("abc"));
    }

    #[test]
    fn insert_keeps_multiple_values() {
        let mut h = Headers::new();
        h.insert("Set-Cookie", "a=1");
        h.insert("Set-Cookie", "b=2");
        let all: Vec<_> = h.get_all("set-cookie").collect();
        assert_eq!(all, vec!["a=1", "b=2"]);
    }

    #[test]
    fn set_replaces_existing_values() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        h.insert("Content-Type", "text/csv");
        h.set("content-type", "text/html");
        let all: Vec<_> = h.get_all("content-type").collect();
        assert_eq!(all, vec!["text/html"]);
    }

    #[test]
    fn remove_reports_whether_present() {
        let mut h = Headers::new();
        h.insert("X-Foo", "bar");
        assert!(h.remove("x-foo"));
        assert!(!h.remove("x-foo"));
        assert!(h.is_empty());
    }

    #[test]
    fn display_uses_crlf() {
        let mut h = Headers::new();
        h.insert("Host", "localhost");
        assert_eq!(h.to_string(), "Host: localhost\r\n");
    }
}
