//! Append-only HTTP query parameter accumulator.

use std::fmt;

use crate::compile::CompiledQuery;

/// Characters kept readable after percent-encoding: the ones
/// `encodeURIComponent` leaves alone plus the delimiters `OData` values use.
const KEPT_ESCAPES: [(&str, &str); 13] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
    ("%40", "@"),
    ("%3A", ":"),
    ("%24", "$"),
    ("%2C", ","),
    ("%3B", ";"),
    ("%3D", "="),
    ("%3F", "?"),
    ("%2F", "/"),
];

/// Ordered multi-map of raw query parameters; keys may repeat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// First value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.pairs.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append every compiled pair, one `append` per key.
    pub fn extend_compiled(&mut self, compiled: &CompiledQuery) -> &mut Self {
        for (key, value) in compiled.pairs() {
            self.append(key.as_str(), value.as_str());
        }
        self
    }

    /// `k=v&k=v` with each component percent-encoded.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl From<&CompiledQuery> for QueryParams {
    fn from(compiled: &CompiledQuery) -> Self {
        let mut params = Self::new();
        params.extend_compiled(compiled);
        params
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn encode_component(raw: &str) -> String {
    // Every `%` in the encoded form starts a real escape, so plain
    // replacement cannot split a sequence.
    KEPT_ESCAPES
        .iter()
        .fold(urlencoding::encode(raw).into_owned(), |acc, (escape, ch)| {
            acc.replace(escape, ch)
        })
}
