//! `$orderby` builder.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDir {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub dir: SortDir,
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.dir.as_str())
    }
}

/// Ordered list of sort keys. Repeated calls accumulate in call order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderBy(Vec<OrderKey>);

impl OrderBy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field asc`.
    pub fn asc(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(field, SortDir::Asc)
    }

    /// Append `field desc`.
    pub fn desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(field, SortDir::Desc)
    }

    pub fn push(&mut self, field: impl Into<String>, dir: SortDir) -> &mut Self {
        self.0.push(OrderKey {
            field: field.into(),
            dir,
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[OrderKey] {
        &self.0
    }

    /// Render as the `$orderby` value, e.g. `Id asc,Name desc`.
    #[must_use]
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_single_asc() {
        let mut order = OrderBy::new();
        order.asc("Id");
        assert_eq!(order.render(), "Id asc");
    }

    #[test]
    fn test_single_desc() {
        let mut order = OrderBy::new();
        order.desc("Id");
        assert_eq!(order.render(), "Id desc");
    }

    #[test]
    fn test_keys_accumulate_in_call_order() {
        let mut order = OrderBy::new();
        order.asc("Id").desc("Name").asc("Id");

        assert_eq!(order.keys().len(), 3);
        assert_eq!(order.render(), "Id asc,Name desc,Id asc");
    }

    #[test]
    fn test_empty_renders_nothing() {
        let order = OrderBy::new();
        assert!(order.is_empty());
        assert_eq!(order.render(), "");
    }
}
