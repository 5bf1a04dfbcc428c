//! `$filter` builder.
//!
//! A [`Filter`] is an ordered token sequence plus two independent pieces of
//! bookkeeping:
//!
//! - a [`ScopeStack`] of open `any()`/`all()`/`count()` lambdas, which decides
//!   how field references are qualified and must be empty at render time;
//! - an open-group counter for plain parentheses, which is only reported
//!   (a `warn!` at render time) when unbalanced.
//!
//! Building goes through two cursor types borrowed from the filter's host:
//! [`Clause`] accepts the next operand (comparisons, negation, lambdas, groups)
//! and [`Operator`] sits after an operand and accepts combinators and closers.
//!
//! ```rust,ignore
//! let mut filter = Filter::new();
//! filter
//!     .begin_any("Posts")
//!     .compare("Id", CompareOp::Eq, 1)
//!     .or()
//!     .compare("Name", CompareOp::Ne, "test")
//!     .end_any()?;
//! assert_eq!(filter.render()?, "Posts/any(x:x/Id eq 1 or x/Name ne 'test')");
//! ```

use std::fmt;

use crate::Error;
use crate::expand::Expand;
use crate::value::{IntoLiteral, Literal};

/// Comparison kinds understood by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompareOp {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "ne")]
    Ne,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "ge")]
    Ge,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "le")]
    Le,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
}

impl CompareOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startsWith",
            CompareOp::EndsWith => "endsWith",
        }
    }

    /// String functions render as `op(a,b)`, everything else as `a op b`.
    #[must_use]
    pub fn is_function(self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operand is written first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OperandOrder {
    /// `field op value` / `op(field,value)`
    #[default]
    #[serde(rename = "field_first")]
    FieldFirst,
    /// `value op field` / `op(value,field)`
    #[serde(rename = "value_first")]
    ValueFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => " and ",
            Combinator::Or => " or ",
        }
    }
}

/// One comparison atom.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    field: String,
    op: CompareOp,
    value: Literal,
    order: OperandOrder,
    trailing: Option<Combinator>,
}

impl Expression {
    #[must_use]
    pub fn new(field: String, op: CompareOp, value: Literal, order: OperandOrder) -> Self {
        Self {
            field,
            op,
            value,
            order,
            trailing: None,
        }
    }

}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, second): (&dyn fmt::Display, &dyn fmt::Display) = match self.order {
            OperandOrder::FieldFirst => (&self.field, &self.value),
            OperandOrder::ValueFirst => (&self.value, &self.field),
        };
        if self.op.is_function() {
            write!(f, "{}({first},{second})", self.op)?;
        } else {
            write!(f, "{first} {} {second}", self.op)?;
        }
        if let Some(c) = self.trailing {
            f.write_str(c.as_str())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Any,
    All,
    Count,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeKind::Any => "any",
            ScopeKind::All => "all",
            ScopeKind::Count => "count",
        })
    }
}

/// Rendered pieces of a `$filter`, in render order.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Expr(Expression),
    OpenGroup,
    CloseGroup,
    Not,
    /// `Posts/any(x:`
    LambdaOpen {
        relation: String,
        kind: ScopeKind,
        variable: String,
    },
    /// `Posts/count(`
    CountOpen { relation: String },
    /// `$filter=`, emitted before the first operand inside a `count(`.
    CountFilter,
    ScopeClose,
    Combinator(Combinator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Expr(expr) => write!(f, "{expr}"),
            Token::OpenGroup => f.write_str("("),
            Token::CloseGroup | Token::ScopeClose => f.write_str(")"),
            Token::Not => f.write_str("Not "),
            Token::LambdaOpen {
                relation,
                kind,
                variable,
            } => write!(f, "{relation}/{kind}({variable}:"),
            Token::CountOpen { relation } => write!(f, "{relation}/count("),
            Token::CountFilter => f.write_str("$filter="),
            Token::Combinator(c) => f.write_str(c.as_str()),
        }
    }
}

const VARIABLES: [&str; 26] = [
    "x", "y", "z", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o",
    "p", "q", "r", "s", "t", "u", "v", "w",
];

/// Name of the `index`-th lambda variable: `x, y, z, a, ..., w, x1, y1, ...`.
fn variable_name(index: usize) -> String {
    let letter = VARIABLES[index.rem_euclid(VARIABLES.len())];
    match index.div_euclid(VARIABLES.len()) {
        0 => letter.to_owned(),
        round => format!("{letter}{round}"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeFrame {
    kind: ScopeKind,
    /// Bound variable of an `any`/`all` lambda; `count` scopes have none.
    variable: Option<String>,
    /// Set until a `count` scope has emitted its `$filter=` prefix.
    prefix_pending: bool,
}

impl ScopeFrame {
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }
}

/// LIFO stack of open lambda scopes.
///
/// Variables are allocated from the number of lambdas opened so far, not from
/// the current depth, so sibling lambdas never reuse a name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
    lambdas_opened: usize,
}

impl ScopeStack {
    /// Push an `any`/`all` frame and return its bound variable.
    fn push_lambda(&mut self, kind: ScopeKind) -> String {
        let variable = variable_name(self.lambdas_opened);
        self.lambdas_opened += 1;
        self.frames.push(ScopeFrame {
            kind,
            variable: Some(variable.clone()),
            prefix_pending: false,
        });
        variable
    }

    fn push_count(&mut self) {
        self.frames.push(ScopeFrame {
            kind: ScopeKind::Count,
            variable: None,
            prefix_pending: true,
        });
    }

    /// Pop the innermost frame if it is of kind `close`.
    ///
    /// The stack is left untouched on error.
    fn pop(&mut self, close: ScopeKind) -> Result<ScopeFrame, Error> {
        let open = self
            .frames
            .last()
            .map(ScopeFrame::kind)
            .ok_or(Error::ScopeUnderflow { close })?;
        if open != close {
            return Err(Error::ScopeMismatch { close, open });
        }
        self.frames.pop().ok_or(Error::ScopeUnderflow { close })
    }

    /// Qualify `name` with the innermost bound variable (`x/name`).
    fn qualify(&self, name: &str) -> String {
        match self.innermost().and_then(ScopeFrame::variable) {
            Some(variable) => format!("{variable}/{name}"),
            None => name.to_owned(),
        }
    }

    /// Consume the pending `$filter=` prefix of an innermost `count` scope.
    fn take_pending_prefix(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(frame) if frame.prefix_pending => {
                frame.prefix_pending = false;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn innermost(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of `any`/`all` lambdas opened so far, including closed ones.
    #[must_use]
    pub fn lambdas_opened(&self) -> usize {
        self.lambdas_opened
    }
}

/// Anything that owns a [`Filter`] the cursors can write to.
pub trait FilterHost {
    fn filter_mut(&mut self) -> &mut Filter;

    /// The expand node this filter belongs to, if any.
    fn owning_expand(&mut self) -> Option<&mut Expand>;
}

impl FilterHost for Filter {
    fn filter_mut(&mut self) -> &mut Filter {
        self
    }

    fn owning_expand(&mut self) -> Option<&mut Expand> {
        None
    }
}

/// Token sequence for one `$filter` value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    tokens: Vec<Token>,
    scopes: ScopeStack,
    open_groups: isize,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field op value`.
    pub fn compare(
        &mut self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
    ) -> Operator<'_> {
        Clause::new(self).compare(field, op, value)
    }

    /// Append a comparison with an explicit operand order.
    pub fn compare_with(
        &mut self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
        order: OperandOrder,
    ) -> Operator<'_> {
        Clause::new(self).compare_with(field, op, value, order)
    }

    /// Append `Not field op value`.
    pub fn negated_compare(
        &mut self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
    ) -> Operator<'_> {
        Clause::new(self).negated_compare(field, op, value)
    }

    /// Append a standalone `Not ` applying to whatever comes next.
    pub fn negate_next(&mut self) -> Clause<'_> {
        Clause::new(self).negate_next()
    }

    pub fn begin_any(&mut self, relation: impl Into<String>) -> Clause<'_> {
        Clause::new(self).begin_any(relation)
    }

    pub fn begin_all(&mut self, relation: impl Into<String>) -> Clause<'_> {
        Clause::new(self).begin_all(relation)
    }

    pub fn begin_count(&mut self, relation: impl Into<String>) -> Clause<'_> {
        Clause::new(self).begin_count(relation)
    }

    pub fn open_group(&mut self) -> Clause<'_> {
        Clause::new(self).open_group()
    }

    pub fn close_group(&mut self) -> Operator<'_> {
        Clause::new(self).close_group()
    }

    /// Cursor positioned after the most recent token.
    pub fn cursor(&mut self) -> Operator<'_> {
        Operator { host: self }
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Opened minus closed plain groups.
    #[must_use]
    pub fn open_groups(&self) -> isize {
        self.open_groups
    }

    /// Render the `$filter` value.
    ///
    /// # Errors
    /// Returns `Error::UnterminatedScope` if an `any()`/`all()`/`count()` scope
    /// is still open.
    pub fn render(&self) -> Result<String, Error> {
        if let Some(frame) = self.scopes.innermost() {
            return Err(Error::UnterminatedScope {
                kind: frame.kind,
                depth: self.scopes.depth(),
            });
        }
        if self.open_groups != 0 {
            tracing::warn!(
                open_groups = self.open_groups,
                "rendering $filter with unbalanced parentheses"
            );
        }
        Ok(self.tokens.iter().map(ToString::to_string).collect())
    }

    fn flush_count_prefix(&mut self) {
        if self.scopes.take_pending_prefix() {
            self.tokens.push(Token::CountFilter);
        }
    }

    fn push_compare(
        &mut self,
        field: &str,
        op: CompareOp,
        value: Literal,
        order: OperandOrder,
        negated: bool,
    ) {
        self.flush_count_prefix();
        if negated {
            self.tokens.push(Token::Not);
        }
        let field = self.scopes.qualify(field);
        tracing::trace!(%field, op = op.as_str(), literal = %value.kind(), negated, "comparison added");
        self.tokens
            .push(Token::Expr(Expression::new(field, op, value, order)));
    }

    fn push_not(&mut self) {
        self.flush_count_prefix();
        self.tokens.push(Token::Not);
    }

    fn push_lambda(&mut self, kind: ScopeKind, relation: &str) {
        self.flush_count_prefix();
        let relation = self.scopes.qualify(relation);
        let variable = self.scopes.push_lambda(kind);
        tracing::trace!(%kind, %relation, %variable, depth = self.scopes.depth(), "lambda scope opened");
        self.tokens.push(Token::LambdaOpen {
            relation,
            kind,
            variable,
        });
    }

    fn push_count(&mut self, relation: &str) {
        self.flush_count_prefix();
        let relation = self.scopes.qualify(relation);
        self.scopes.push_count();
        tracing::trace!(%relation, depth = self.scopes.depth(), "count scope opened");
        self.tokens.push(Token::CountOpen { relation });
    }

    fn push_open_group(&mut self) {
        self.flush_count_prefix();
        self.tokens.push(Token::OpenGroup);
        self.open_groups += 1;
    }

    fn push_close_group(&mut self) {
        self.tokens.push(Token::CloseGroup);
        self.open_groups -= 1;
    }

    /// Attach `c` to the last comparison, or append it as its own token when
    /// the last token is structural (`)`, lambda close, ...).
    fn combine(&mut self, c: Combinator) {
        if let Some(Token::Expr(expr)) = self.tokens.last_mut() {
            expr.trailing = Some(c);
        } else {
            self.tokens.push(Token::Combinator(c));
        }
    }

    fn close_scope(&mut self, kind: ScopeKind) -> Result<(), Error> {
        self.scopes.pop(kind)?;
        tracing::trace!(%kind, depth = self.scopes.depth(), "scope closed");
        self.tokens.push(Token::ScopeClose);
        Ok(())
    }

    fn close_count(&mut self, op: CompareOp, value: Literal) -> Result<(), Error> {
        self.close_scope(ScopeKind::Count)?;
        self.tokens.push(Token::Expr(Expression::new(
            String::new(),
            op,
            value,
            OperandOrder::FieldFirst,
        )));
        Ok(())
    }
}

/// Cursor expecting the next operand.
pub struct Clause<'a, H: FilterHost + ?Sized = Filter> {
    host: &'a mut H,
}

impl<'a, H: FilterHost + ?Sized> Clause<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        Self { host }
    }

    pub fn compare(
        self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
    ) -> Operator<'a, H> {
        self.compare_with(field, op, value, OperandOrder::FieldFirst)
    }

    pub fn compare_with(
        self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
        order: OperandOrder,
    ) -> Operator<'a, H> {
        let field: String = field.into();
        self.host
            .filter_mut()
            .push_compare(&field, op, value.into_literal(), order, false);
        Operator { host: self.host }
    }

    pub fn negated_compare(
        self,
        field: impl Into<String>,
        op: CompareOp,
        value: impl IntoLiteral,
    ) -> Operator<'a, H> {
        let field: String = field.into();
        self.host.filter_mut().push_compare(
            &field,
            op,
            value.into_literal(),
            OperandOrder::FieldFirst,
            true,
        );
        Operator { host: self.host }
    }

    #[must_use]
    pub fn negate_next(self) -> Self {
        self.host.filter_mut().push_not();
        self
    }

    /// Open `relation/any(v:` with the next free variable.
    #[must_use]
    pub fn begin_any(self, relation: impl Into<String>) -> Self {
        let relation: String = relation.into();
        self.host.filter_mut().push_lambda(ScopeKind::Any, &relation);
        self
    }

    /// Open `relation/all(v:` with the next free variable.
    ///
    /// Inside another lambda the relation is qualified like `begin_any`:
    /// `x/Authors/all(y:`.
    #[must_use]
    pub fn begin_all(self, relation: impl Into<String>) -> Self {
        let relation: String = relation.into();
        self.host.filter_mut().push_lambda(ScopeKind::All, &relation);
        self
    }

    /// Open `relation/count(`; fields inside are not qualified.
    #[must_use]
    pub fn begin_count(self, relation: impl Into<String>) -> Self {
        let relation: String = relation.into();
        self.host.filter_mut().push_count(&relation);
        self
    }

    #[must_use]
    pub fn open_group(self) -> Self {
        self.host.filter_mut().push_open_group();
        self
    }

    pub fn close_group(self) -> Operator<'a, H> {
        self.host.filter_mut().push_close_group();
        Operator { host: self.host }
    }
}

/// Cursor positioned after an operand.
pub struct Operator<'a, H: FilterHost + ?Sized = Filter> {
    host: &'a mut H,
}

impl<'a, H: FilterHost + ?Sized> Operator<'a, H> {
    pub fn and(self) -> Clause<'a, H> {
        self.host.filter_mut().combine(Combinator::And);
        Clause { host: self.host }
    }

    pub fn or(self) -> Clause<'a, H> {
        self.host.filter_mut().combine(Combinator::Or);
        Clause { host: self.host }
    }

    #[must_use]
    pub fn end_group(self) -> Self {
        self.host.filter_mut().push_close_group();
        self
    }

    /// Close the innermost `any()` scope.
    ///
    /// # Errors
    /// Returns `Error::ScopeUnderflow` if no scope is open, or
    /// `Error::ScopeMismatch` if the innermost scope is not `any()`.
    pub fn end_any(self) -> Result<Self, Error> {
        self.host.filter_mut().close_scope(ScopeKind::Any)?;
        Ok(self)
    }

    /// Close the innermost `all()` scope.
    ///
    /// # Errors
    /// Returns `Error::ScopeUnderflow` if no scope is open, or
    /// `Error::ScopeMismatch` if the innermost scope is not `all()`.
    pub fn end_all(self) -> Result<Self, Error> {
        self.host.filter_mut().close_scope(ScopeKind::All)?;
        Ok(self)
    }

    /// Close the innermost `count()` scope and compare its result: `) op value`.
    ///
    /// # Errors
    /// Returns `Error::ScopeUnderflow` if no scope is open, or
    /// `Error::ScopeMismatch` if the innermost scope is not `count()`.
    pub fn end_count(self, op: CompareOp, value: impl IntoLiteral) -> Result<Self, Error> {
        self.host
            .filter_mut()
            .close_count(op, value.into_literal())?;
        Ok(self)
    }

    /// Return to the expand node that owns this filter.
    ///
    /// # Errors
    /// Returns `Error::OrphanExpandFilter` if the filter does not belong to an
    /// expand node.
    pub fn end_expand_filter(self) -> Result<&'a mut Expand, Error> {
        H::owning_expand(self.host).ok_or(Error::OrphanExpandFilter)
    }
}
