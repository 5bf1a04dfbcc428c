//! Top-level query aggregate.

use url::Url;

use crate::Error;
use crate::compile::{CompiledQuery, PageWindow, QueryParts, Select, compile};
use crate::config::QueryDefaults;
use crate::expand::ExpandList;
use crate::filter::Filter;
use crate::order_by::OrderBy;
use crate::params::QueryParams;

/// A complete `OData` request: projection, filter, sort, expansion, paging.
///
/// Builders are plain public fields; the paging setters return `&mut Self`
/// so they chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ODataQuery {
    pub select: Option<Select>,
    pub filter: Filter,
    pub order_by: OrderBy,
    pub expand: ExpandList,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub show_count: bool,
    /// Whether paging was requested, seeded from `pagination_enabled`.
    /// Informational: `$top`/`$skip`/`$count` follow their own fields.
    pub pagination: bool,
    /// Base resource URL used by [`ODataQuery::request_url`].
    pub url: Option<String>,
}

impl Default for ODataQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl ODataQuery {
    /// New query seeded from the installed [`QueryDefaults`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(&QueryDefaults::current())
    }

    #[must_use]
    pub fn with_defaults(defaults: &QueryDefaults) -> Self {
        Self {
            select: None,
            filter: Filter::new(),
            order_by: OrderBy::new(),
            expand: ExpandList::new(),
            top: defaults.default_top,
            skip: defaults.default_skip,
            show_count: defaults.show_count(),
            pagination: defaults.pagination_enabled,
            url: None,
        }
    }

    /// Replace the projection.
    pub fn select(&mut self, fields: impl Into<Select>) -> &mut Self {
        self.select = Some(fields.into());
        self
    }

    pub fn top(&mut self, top: u64) -> &mut Self {
        self.top = Some(top);
        self
    }

    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.skip = Some(skip);
        self
    }

    pub fn count(&mut self, show_count: bool) -> &mut Self {
        self.show_count = show_count;
        self
    }

    /// Set all paging options at once and turn paging on.
    pub fn paginate(&mut self, top: Option<u64>, skip: Option<u64>, show_count: bool) -> &mut Self {
        self.top = top;
        self.skip = skip;
        self.show_count = show_count;
        self.pagination = true;
        self
    }

    pub fn url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = Some(url.into());
        self
    }

    fn window(&self) -> PageWindow {
        PageWindow {
            top: self.top,
            skip: self.skip,
            count: self.show_count,
        }
    }

    /// Compile into ordered `$` parameters. Does not mutate the query.
    ///
    /// # Errors
    /// Returns `Error::UnterminatedScope` if a filter scope was never closed.
    pub fn compile(&self) -> Result<CompiledQuery, Error> {
        let parts = QueryParts {
            select: self.select.as_ref(),
            filter: &self.filter,
            order_by: &self.order_by,
            expand: self.expand.as_slice(),
        };
        compile(&parts, Some(&self.window()))
    }

    /// Compiled parameters in a fresh accumulator.
    ///
    /// # Errors
    /// Same as [`ODataQuery::compile`].
    pub fn params(&self) -> Result<QueryParams, Error> {
        Ok(QueryParams::from(&self.compile()?))
    }

    /// Append the compiled parameters to an existing accumulator.
    ///
    /// # Errors
    /// Same as [`ODataQuery::compile`]; `params` is left untouched on error.
    pub fn append_to(&self, params: &mut QueryParams) -> Result<(), Error> {
        params.extend_compiled(&self.compile()?);
        Ok(())
    }

    /// # Errors
    /// Same as [`ODataQuery::compile`].
    pub fn to_query_string(&self) -> Result<String, Error> {
        Ok(self.params()?.to_query_string())
    }

    /// Base URL with the encoded query string attached.
    ///
    /// # Errors
    /// - `Error::MissingUrl` if no base URL was set
    /// - `Error::InvalidUrl` if the base URL does not parse
    /// - any error of [`ODataQuery::compile`]
    pub fn request_url(&self) -> Result<Url, Error> {
        let base = self.url.as_deref().ok_or(Error::MissingUrl)?;
        let mut url = Url::parse(base)?;
        let query = self.to_query_string()?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}
