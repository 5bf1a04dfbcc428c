#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Fluent builder for `OData` query options.
//!
//! An [`ODataQuery`] collects a select list, a `$filter` token sequence with
//! `any()`/`all()`/`count()` lambda scopes, sort keys, a nested `$expand`
//! tree and paging options, and compiles them into ordered `$`-parameters:
//!
//! ```rust,ignore
//! let mut query = ODataQuery::new();
//! query.select("*").paginate(Some(10), Some(0), true);
//! query
//!     .filter
//!     .begin_any("Posts")
//!     .compare("Id", CompareOp::Eq, 1)
//!     .end_any()?;
//! assert_eq!(
//!     query.compile()?.to_nested_options(),
//!     "$select=*;$filter=Posts/any(x:x/Id eq 1);$top=10;$skip=0;$count=true"
//! );
//! ```
pub mod compile;
pub mod config;
pub mod expand;
pub mod filter;
pub mod order_by;
pub mod params;
pub mod query;
pub mod value;

pub use compile::{CompiledQuery, PageWindow, QueryKey, Select, compile};
pub use config::{ConfigError, QueryDefaults};
pub use expand::{Expand, ExpandList, ExpandOrderBy};
pub use filter::{Clause, CompareOp, Filter, FilterHost, OperandOrder, Operator, ScopeKind};
pub use order_by::{OrderBy, OrderKey, SortDir};
pub use params::QueryParams;
pub use query::ODataQuery;
pub use value::{IntoLiteral, Literal};

/// Errors raised while building or compiling a query.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot close {close}(): no lambda scope is open")]
    ScopeUnderflow { close: ScopeKind },

    #[error("cannot close {close}(): innermost open scope is {open}()")]
    ScopeMismatch { close: ScopeKind, open: ScopeKind },

    #[error("$filter has {depth} unterminated scope(s), innermost is {kind}()")]
    UnterminatedScope { kind: ScopeKind, depth: usize },

    #[error("filter is not attached to an expand node")]
    OrphanExpandFilter,

    #[error("no base url configured for the query")]
    MissingUrl,

    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
