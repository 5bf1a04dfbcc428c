//! Query documents: a declarative YAML/JSON form of the builder calls.
//!
//! ```yaml
//! url: https://api.example.com/odata/People
//! select: [Id, Name]
//! filter:
//!   - begin_any: Posts
//!   - compare: { field: Id, op: eq, value: 1 }
//!   - or
//!   - compare: { field: Name, op: contains, value: rust }
//!   - end_any
//! order_by:
//!   - { field: Name, dir: desc }
//! expand:
//!   - relation: Posts
//!     select: Id,Title
//!     expand:
//!       - relation: Authors
//! top: 10
//! count: true
//! ```

use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, FixedOffset};
use odata_query::{
    Clause, CompareOp, Expand, FilterHost, IntoLiteral, Literal, ODataQuery, OperandOrder,
    Operator, Select, SortDir,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryDocument {
    pub url: Option<String>,
    pub select: Option<Select>,
    pub filter: Vec<FilterStep>,
    pub order_by: Vec<SortKey>,
    pub expand: Vec<ExpandDocument>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,
    pub pagination: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpandDocument {
    pub relation: String,
    #[serde(default)]
    pub select: Option<Select>,
    #[serde(default)]
    pub filter: Vec<FilterStep>,
    #[serde(default)]
    pub order_by: Vec<SortKey>,
    #[serde(default)]
    pub expand: Vec<ExpandDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortKey {
    pub field: String,
    #[serde(default = "ascending")]
    pub dir: SortDir,
}

fn ascending() -> SortDir {
    SortDir::Asc
}

/// One builder call on a `$filter`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStep {
    Compare(Comparison),
    Not,
    And,
    Or,
    OpenGroup,
    CloseGroup,
    BeginAny(String),
    BeginAll(String),
    BeginCount(String),
    EndAny,
    EndAll,
    EndCount(CountComparison),
}

impl FilterStep {
    fn name(&self) -> &'static str {
        match self {
            FilterStep::Compare(_) => "compare",
            FilterStep::Not => "not",
            FilterStep::And => "and",
            FilterStep::Or => "or",
            FilterStep::OpenGroup => "open_group",
            FilterStep::CloseGroup => "close_group",
            FilterStep::BeginAny(_) => "begin_any",
            FilterStep::BeginAll(_) => "begin_all",
            FilterStep::BeginCount(_) => "begin_count",
            FilterStep::EndAny => "end_any",
            FilterStep::EndAll => "end_all",
            FilterStep::EndCount(_) => "end_count",
        }
    }
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comparison {
    pub field: String,
    pub op: CompareOp,
    pub value: DocValue,
    #[serde(default)]
    pub order: OperandOrder,
    #[serde(default)]
    pub negate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountComparison {
    pub op: CompareOp,
    pub value: DocValue,
}

/// Scalar as written in the document. Strings that parse as RFC 3339
/// timestamps become date-time literals.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<FixedOffset>),
    Text(String),
}

impl IntoLiteral for &DocValue {
    fn into_literal(self) -> Literal {
        match self {
            DocValue::Bool(b) => b.into_literal(),
            DocValue::Integer(n) => n.into_literal(),
            DocValue::Float(x) => x.into_literal(),
            DocValue::DateTime(dt) => dt.into_literal(),
            DocValue::Text(s) => s.into_literal(),
        }
    }
}

impl QueryDocument {
    /// Read a document from `path` (`-` for stdin). `.json` files are parsed
    /// as JSON, everything else as YAML.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let content = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read document from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?
        };

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let document = if is_json {
            serde_json::from_str(&content).context("invalid JSON query document")?
        } else {
            serde_saphyr::from_str(&content).context("invalid YAML query document")?
        };
        Ok(document)
    }

    /// Apply every section to `query`, in builder order.
    pub fn apply(&self, query: &mut ODataQuery) -> anyhow::Result<()> {
        if let Some(url) = &self.url {
            query.url(url);
        }
        if let Some(select) = &self.select {
            query.select(select.clone());
        }
        if !self.filter.is_empty() {
            apply_filter(Clause::new(&mut query.filter), &self.filter).context("in $filter")?;
        }
        for key in &self.order_by {
            query.order_by.push(&key.field, key.dir);
        }
        for node in &self.expand {
            apply_expand(query.expand.add(&node.relation), node)
                .with_context(|| format!("in $expand of {}", node.relation))?;
        }
        if let Some(top) = self.top {
            query.top(top);
        }
        if let Some(skip) = self.skip {
            query.skip(skip);
        }
        if let Some(count) = self.count {
            query.count(count);
        }
        if let Some(pagination) = self.pagination {
            query.pagination = pagination;
        }
        Ok(())
    }
}

fn apply_expand(node: &mut Expand, document: &ExpandDocument) -> anyhow::Result<()> {
    if let Some(select) = &document.select {
        node.select(select.clone());
    }
    if !document.filter.is_empty() {
        apply_filter(node.begin_filter(), &document.filter)?;
    }
    if !document.order_by.is_empty() {
        let mut cursor = node.begin_order_by();
        for key in &document.order_by {
            cursor = match key.dir {
                SortDir::Asc => cursor.asc(&key.field),
                SortDir::Desc => cursor.desc(&key.field),
            };
        }
        cursor.end_expand_order_by();
    }
    for child in &document.expand {
        apply_expand(node.expand(&child.relation), child)
            .with_context(|| format!("in $expand of {}", child.relation))?;
    }
    Ok(())
}

/// The builder's two cursor states, chosen at runtime.
enum Cursor<'a, H: FilterHost> {
    Clause(Clause<'a, H>),
    Operator(Operator<'a, H>),
}

fn apply_filter<H: FilterHost>(start: Clause<'_, H>, steps: &[FilterStep]) -> anyhow::Result<()> {
    let mut cursor = Cursor::Clause(start);
    for (index, step) in steps.iter().enumerate() {
        cursor = advance(cursor, step).with_context(|| format!("filter step {index} ({step})"))?;
    }
    Ok(())
}

fn advance<'a, H: FilterHost>(
    cursor: Cursor<'a, H>,
    step: &FilterStep,
) -> anyhow::Result<Cursor<'a, H>> {
    let next = match (cursor, step) {
        (Cursor::Clause(clause), FilterStep::Compare(cmp)) => {
            let value = &cmp.value;
            Cursor::Operator(match (cmp.negate, cmp.order) {
                (true, OperandOrder::FieldFirst) => clause.negated_compare(&cmp.field, cmp.op, value),
                (true, order) => clause.negate_next().compare_with(&cmp.field, cmp.op, value, order),
                (false, order) => clause.compare_with(&cmp.field, cmp.op, value, order),
            })
        }
        (Cursor::Clause(clause), FilterStep::Not) => Cursor::Clause(clause.negate_next()),
        (Cursor::Clause(clause), FilterStep::OpenGroup) => Cursor::Clause(clause.open_group()),
        (Cursor::Clause(clause), FilterStep::CloseGroup) => Cursor::Operator(clause.close_group()),
        (Cursor::Clause(clause), FilterStep::BeginAny(relation)) => {
            Cursor::Clause(clause.begin_any(relation))
        }
        (Cursor::Clause(clause), FilterStep::BeginAll(relation)) => {
            Cursor::Clause(clause.begin_all(relation))
        }
        (Cursor::Clause(clause), FilterStep::BeginCount(relation)) => {
            Cursor::Clause(clause.begin_count(relation))
        }
        (Cursor::Operator(op), FilterStep::And) => Cursor::Clause(op.and()),
        (Cursor::Operator(op), FilterStep::Or) => Cursor::Clause(op.or()),
        (Cursor::Operator(op), FilterStep::CloseGroup) => Cursor::Operator(op.end_group()),
        (Cursor::Operator(op), FilterStep::EndAny) => Cursor::Operator(op.end_any()?),
        (Cursor::Operator(op), FilterStep::EndAll) => Cursor::Operator(op.end_all()?),
        (Cursor::Operator(op), FilterStep::EndCount(cmp)) => {
            Cursor::Operator(op.end_count(cmp.op, &cmp.value)?)
        }
        (Cursor::Clause(_), step) => bail!("`{step}` needs an operand before it"),
        (Cursor::Operator(_), step) => bail!("`{step}` cannot follow an operand without and/or"),
    };
    Ok(next)
}
