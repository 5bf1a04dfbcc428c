//! Query compilation: builders in, ordered `$` parameters out.
//!
//! Keys are always emitted in the order `$select, $expand, $filter, $orderby,
//! $top, $skip, $count`; absent parts are skipped. Expand nodes are compiled
//! by the same function with the page window suppressed, and their options
//! are folded into `relation(k=v;k=v)`.

use std::fmt;

use crate::Error;
use crate::expand::Expand;
use crate::filter::Filter;
use crate::order_by::OrderBy;

/// Field projection: either a raw comma-separated string or a field list.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Select {
    /// Used verbatim, e.g. `"Id,Name"` or `"*"`.
    Raw(String),
    /// Joined with `,`.
    Fields(Vec<String>),
}

impl Default for Select {
    fn default() -> Self {
        Select::Fields(Vec::new())
    }
}

impl Select {
    /// Entries as given; a raw string counts as one entry.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        match self {
            Select::Raw(raw) => std::slice::from_ref(raw),
            Select::Fields(fields) => fields,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Select::Raw(raw) => raw.is_empty(),
            Select::Fields(fields) => fields.is_empty(),
        }
    }

    /// Append more entries, turning `self` into a field list.
    pub fn extend(&mut self, more: Select) {
        if let Select::Raw(raw) = self {
            *self = Select::Fields(vec![std::mem::take(raw)]);
        }
        if let Select::Fields(fields) = self {
            match more {
                Select::Raw(raw) => fields.push(raw),
                Select::Fields(more) => fields.extend(more),
            }
        }
    }

    /// Render the `$select` value verbatim; `None` when empty.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.entries().join(","))
    }
}

impl From<&str> for Select {
    fn from(raw: &str) -> Self {
        Select::Raw(raw.to_owned())
    }
}

impl From<String> for Select {
    fn from(raw: String) -> Self {
        Select::Raw(raw)
    }
}

impl From<Vec<String>> for Select {
    fn from(fields: Vec<String>) -> Self {
        Select::Fields(fields)
    }
}

impl From<Vec<&str>> for Select {
    fn from(fields: Vec<&str>) -> Self {
        Select::Fields(fields.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for Select {
    fn from(fields: &[&str]) -> Self {
        Select::Fields(fields.iter().map(|f| (*f).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Select {
    fn from(fields: [&str; N]) -> Self {
        Select::Fields(fields.into_iter().map(str::to_owned).collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryKey {
    Select,
    Expand,
    Filter,
    OrderBy,
    Top,
    Skip,
    Count,
}

impl QueryKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKey::Select => "$select",
            QueryKey::Expand => "$expand",
            QueryKey::Filter => "$filter",
            QueryKey::OrderBy => "$orderby",
            QueryKey::Top => "$top",
            QueryKey::Skip => "$skip",
            QueryKey::Count => "$count",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paging options; only the top-level query has one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageWindow {
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: bool,
}

/// Borrowed view of everything that compiles into one parameter set.
#[derive(Clone, Copy, Debug)]
pub struct QueryParts<'a> {
    pub select: Option<&'a Select>,
    pub filter: &'a Filter,
    pub order_by: &'a OrderBy,
    pub expand: &'a [Expand],
}

/// Ordered `(key, raw value)` pairs produced by [`compile`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledQuery {
    pairs: Vec<(QueryKey, String)>,
}

impl CompiledQuery {
    #[must_use]
    pub fn pairs(&self) -> &[(QueryKey, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn get(&self, key: QueryKey) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        self.pairs.iter().map(|(k, _)| *k).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Nested option list used inside `relation(...)`: `k=v;k=v`.
    #[must_use]
    pub fn to_nested_options(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn push(&mut self, key: QueryKey, value: String) {
        self.pairs.push((key, value));
    }
}

/// Compile `parts` into ordered protocol parameters.
///
/// `window` carries `$top`/`$skip`/`$count`; pass `None` to suppress paging.
///
/// # Errors
/// Returns `Error::UnterminatedScope` if any filter still has an open lambda scope
pub fn compile(
    parts: &QueryParts<'_>,
    window: Option<&PageWindow>,
) -> Result<CompiledQuery, Error> {
    let compiled = compile_parts(parts, window)?;
    tracing::debug!(
        keys = compiled.len(),
        expand_depth = parts.expand.iter().map(Expand::depth).max().unwrap_or(0),
        "compiled OData query"
    );
    Ok(compiled)
}

fn compile_parts(
    parts: &QueryParts<'_>,
    window: Option<&PageWindow>,
) -> Result<CompiledQuery, Error> {
    let mut out = CompiledQuery::default();

    if let Some(select) = parts.select.and_then(Select::render) {
        out.push(QueryKey::Select, select);
    }

    if !parts.expand.is_empty() {
        out.push(QueryKey::Expand, render_expand(parts.expand)?);
    }

    if !parts.filter.is_empty() {
        out.push(QueryKey::Filter, parts.filter.render()?);
    }

    if !parts.order_by.is_empty() {
        out.push(QueryKey::OrderBy, parts.order_by.render());
    }

    if let Some(window) = window {
        if let Some(top) = window.top {
            out.push(QueryKey::Top, top.to_string());
        }
        if let Some(skip) = window.skip {
            out.push(QueryKey::Skip, skip.to_string());
        }
        if window.count {
            out.push(QueryKey::Count, "true".to_owned());
        }
    }

    Ok(out)
}

fn render_expand(nodes: &[Expand]) -> Result<String, Error> {
    let mut rendered = Vec::with_capacity(nodes.len());
    for node in nodes {
        let nested = compile_parts(&node.parts(), None)?;
        if nested.is_empty() {
            rendered.push(node.relation().to_owned());
        } else {
            rendered.push(format!(
                "{}({})",
                node.relation(),
                nested.to_nested_options()
            ));
        }
    }
    Ok(rendered.join(","))
}
