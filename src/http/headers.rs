//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest),
//! [`HttpResponse`](crate::http::response::HttpResponse) and multipart parts.
//!
//! Headers are stored as a case-insensitive multimap: every name is folded to
//! ASCII lower case to form the key, and each key owns an ordered list of
//! `(name, value)` entries that remember the name exactly as it was written.
//!
//! - [`HttpHeaders::set`] replaces every entry for a key with a single one.
//! - [`HttpHeaders::add`] appends without touching existing entries.
//! - [`HttpHeaders::len`] counts distinct keys, not entries.
//!
//! Iteration yields entries grouped by key, keys in the order they first
//! appeared, entries in insertion order within a key. Removing a key does not
//! reorder the others.
//!
//! No validation is performed on names or values. Higher-level types apply
//! their own rules on top of this structure.

use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: IndexMap<String, Vec<HeaderEntry>>,
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&fold(name))
            .and_then(|entries| entries.first())
            .map(|e| e.value.as_str())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.headers
            .get(&fold(name))
            .into_iter()
            .flatten()
            .map(|e| e.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        let entry = HeaderEntry {
            name: name.to_string(),
            value: value.to_string(),
        };
        self.headers.insert(fold(name), vec![entry]);
    }

    pub fn add(&mut self, name: &str, value: &str) {
        self.headers.entry(fold(name)).or_default().push(HeaderEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Removes every entry for `name`, returning their values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.headers
            .shift_remove(&fold(name))
            .map(|entries| entries.into_iter().map(|e| e.value).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&fold(name))
    }

    /// Sets `name` only when absent and returns the resulting first value.
    pub fn set_if_absent(&mut self, name: &str, value: &str) -> &str {
        let entries = self.headers.entry(fold(name)).or_default();
        if entries.is_empty() {
            entries.push(HeaderEntry {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        entries[0].value.as_str()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Every `(name, value)` entry, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .values()
            .flatten()
            .map(|e| (e.name.as_str(), e.value.as_str()))
    }

    /// Flattens to a single-valued map. The first value of each name wins
    /// and later duplicates are dropped. Keys keep the case of that first entry.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.headers
            .values()
            .filter_map(|entries| entries.first())
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    }

    /// Serializes every entry as `Name: value\r\n`.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in self.iter() {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

impl<'a> IntoIterator for &'a HttpHeaders {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for HttpHeaders {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HttpHeaders::new();
        for (name, value) in iter {
            headers.add(name.as_ref(), value.as_ref());
        }
        headers
    }
}
