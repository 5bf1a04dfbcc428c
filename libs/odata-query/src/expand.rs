//! `$expand` tree.
//!
//! Each [`Expand`] node owns its own select list, filter, sort keys and
//! children. A node's filter is built through the same cursors as the
//! top-level filter, and [`Operator::end_expand_filter`] hands the node back:
//!
//! ```rust,ignore
//! let mut expand = ExpandList::default();
//! expand
//!     .add("Posts")
//!     .select("Id,Name")
//!     .begin_filter()
//!     .compare("Id", CompareOp::Eq, 1)
//!     .end_expand_filter()?
//!     .expand("Authors")
//!     .select(["Id", "Name"]);
//! ```
//!
//! [`Operator::end_expand_filter`]: crate::filter::Operator::end_expand_filter

use crate::compile::{QueryParts, Select};
use crate::filter::{Clause, Filter, FilterHost};
use crate::order_by::{OrderBy, SortDir};

/// One expanded relation with its nested query options.
#[derive(Clone, Debug, PartialEq)]
pub struct Expand {
    relation: String,
    select: Select,
    filter: Filter,
    order_by: OrderBy,
    children: Vec<Expand>,
}

impl Expand {
    #[must_use]
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            select: Select::default(),
            filter: Filter::new(),
            order_by: OrderBy::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Projected fields; repeated calls accumulate.
    pub fn select(&mut self, fields: impl Into<Select>) -> &mut Self {
        self.select.extend(fields.into());
        self
    }

    #[must_use]
    pub fn selected(&self) -> &[String] {
        self.select.entries()
    }

    /// Start (or continue) this node's nested `$filter`.
    pub fn begin_filter(&mut self) -> Clause<'_, Expand> {
        Clause::new(self)
    }

    /// Start appending nested `$orderby` keys.
    pub fn begin_order_by(&mut self) -> ExpandOrderBy<'_> {
        ExpandOrderBy { expand: self }
    }

    /// Add a child relation and return it.
    pub fn expand(&mut self, relation: impl Into<String>) -> &mut Expand {
        let index = self.children.len();
        self.children.push(Expand::new(relation));
        &mut self.children[index]
    }

    /// Attach an already built child.
    pub fn push(&mut self, child: Expand) -> &mut Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub fn order_by(&self) -> &OrderBy {
        &self.order_by
    }

    #[must_use]
    pub fn children(&self) -> &[Expand] {
        &self.children
    }

    /// Levels of nesting below and including this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Expand::depth).max().unwrap_or(0)
    }

    /// Options compiled inside `relation(...)`.
    #[must_use]
    pub fn parts(&self) -> QueryParts<'_> {
        QueryParts {
            select: Some(&self.select),
            filter: &self.filter,
            order_by: &self.order_by,
            expand: &self.children,
        }
    }
}

impl FilterHost for Expand {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }

    fn owning_expand(&mut self) -> Option<&mut Expand> {
        Some(self)
    }
}

/// Cursor over an expand node's sort keys.
pub struct ExpandOrderBy<'a> {
    expand: &'a mut Expand,
}

impl<'a> ExpandOrderBy<'a> {
    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.expand.order_by.push(field, SortDir::Asc);
        self
    }

    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.expand.order_by.push(field, SortDir::Desc);
        self
    }

    /// Return to the expand node.
    pub fn end_expand_order_by(self) -> &'a mut Expand {
        self.expand
    }
}

/// Top-level `$expand` entries in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpandList(Vec<Expand>);

impl ExpandList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation and return its node for further configuration.
    pub fn add(&mut self, relation: impl Into<String>) -> &mut Expand {
        let index = self.0.len();
        self.0.push(Expand::new(relation));
        &mut self.0[index]
    }

    pub fn push(&mut self, node: Expand) -> &mut Self {
        self.0.push(node);
        self
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Expand] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expand> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExpandList {
    type Item = &'a Expand;
    type IntoIter = std::slice::Iter<'a, Expand>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
