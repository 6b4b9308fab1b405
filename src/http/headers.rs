//! Header map with canonical names.
//!
//! Names are stored in `Capitalized-Dash` form, so `user_agent`,
//! `user-agent` and `USER-AGENT` all address the same entry. A name may
//! carry several values (`Set-Cookie`, `Via`); they keep arrival order.

use std::collections::BTreeMap;
use std::fmt;

/// Header map keyed by canonical header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedHeaders {
    entries: BTreeMap<String, Vec<String>>,
}

impl NormalizedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of a header name.
    pub fn normalize(name: &str) -> String {
        name.replace('_', "-")
            .split('-')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Set `name` to a single value, returning the values it replaced.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<Vec<String>> {
        self.entries.insert(Self::normalize(name.as_ref()), vec![value.into()])
    }

    /// Add a value to `name`, keeping any already present.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .entry(Self::normalize(name.as_ref()))
            .or_default()
            .push(value.into());
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&Self::normalize(name))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of `name` in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&Self::normalize(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::normalize(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&Self::normalize(name))
    }

    /// Merge `other` into `self`; names present in `other` replace ours.
    pub fn extend(&mut self, other: &NormalizedHeaders) {
        for (name, values) in &other.entries {
            self.entries.insert(name.clone(), values.clone());
        }
    }

    /// True when every header in `expected` is present here with an equal value.
    pub fn matches(&self, expected: &NormalizedHeaders) -> bool {
        expected
            .iter()
            .all(|(name, value)| self.get_all(name).iter().any(|v| v == value))
    }

    /// One `(name, value)` pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for NormalizedHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

impl fmt::Display for NormalizedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_underscores_and_case() {
        assert_eq!(NormalizedHeaders::normalize("user_agent"), "User-Agent");
        assert_eq!(NormalizedHeaders::normalize("CONTENT-TYPE"), "Content-Type");
        assert_eq!(NormalizedHeaders::normalize("x-api_key"), "X-Api-Key");
        assert_eq!(NormalizedHeaders::normalize("accept"), "Accept");
    }

    #[test]
    fn lookups_ignore_spelling() {
        let mut headers = NormalizedHeaders::new();
        headers.insert("user-agent", "test");
        assert_eq!(headers.get("User_Agent"), Some("test"));
        assert!(headers.contains("USER-AGENT"));
        assert_eq!(headers.len(), 1);

        headers.insert("user_agent", "other");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.remove("user-agent"), Some(vec!["other".to_string()]));
        assert!(headers.is_empty());
    }

    #[test]
    fn matches_requires_every_expected_pair() {
        let request: NormalizedHeaders =
            [("user-agent", "test"), ("accept", "*/*")].into_iter().collect();
        let expected: NormalizedHeaders = [("User-Agent", "test")].into_iter().collect();
        let wrong: NormalizedHeaders = [("user_agent", "curl")].into_iter().collect();

        assert!(request.matches(&expected));
        assert!(request.matches(&NormalizedHeaders::new()));
        assert!(!request.matches(&wrong));
    }

    #[test]
    fn repeated_names_keep_every_value() {
        let headers: NormalizedHeaders = [
            ("Set-Cookie", "a=1"),
            ("content-length", "0"),
            ("set-cookie", "b=2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Set-Cookie"), Some("a=1"));
        assert_eq!(headers.get_all("set_cookie"), ["a=1", "b=2"]);
        assert!(headers.get_all("via").is_empty());

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("Content-Length", "0"), ("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")]);
        assert_eq!(headers.to_string(), "Content-Length: 0\nSet-Cookie: a=1\nSet-Cookie: b=2\n");

        let expected: NormalizedHeaders = [("set-cookie", "b=2")].into_iter().collect();
        assert!(headers.matches(&expected));
    }

    #[test]
    fn insert_replaces_all_values() {
        let mut headers = NormalizedHeaders::new();
        headers.append("via", "1.1 a");
        headers.append("via", "1.1 b");
        let previous = headers.insert("Via", "1.1 c");
        assert_eq!(previous, Some(vec!["1.1 a".to_string(), "1.1 b".to_string()]));
        assert_eq!(headers.get_all("via"), ["1.1 c"]);
    }
}
