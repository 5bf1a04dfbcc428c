//! Process-wide query defaults.
//!
//! Defaults are read once per query, when [`ODataQuery::new`] snapshots them;
//! changing them afterwards never affects an existing query.
//!
//! Sources are layered in this order, later ones winning:
//! built-in defaults, an optional YAML file, then `ODATA_QUERY_*` environment
//! variables (e.g. `ODATA_QUERY_DEFAULT_TOP=25`).
//!
//! [`ODataQuery::new`]: crate::ODataQuery::new

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for defaults overrides.
pub const ENV_PREFIX: &str = "ODATA_QUERY_";

static INSTALLED: RwLock<QueryDefaults> = parking_lot::const_rwlock(QueryDefaults::EMPTY);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("defaults file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid query defaults: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Initial paging state for new queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryDefaults {
    pub default_top: Option<u64>,
    pub default_skip: Option<u64>,
    /// Marks new queries as paginated and turns on `$count`.
    pub pagination_enabled: bool,
    pub default_show_count: bool,
}

impl QueryDefaults {
    const EMPTY: Self = Self {
        default_top: None,
        default_skip: None,
        pagination_enabled: false,
        default_show_count: false,
    };

    /// Snapshot of the installed defaults.
    #[must_use]
    pub fn current() -> Self {
        INSTALLED.read().clone()
    }

    /// Replace the installed defaults. Existing queries are unaffected.
    pub fn install(self) {
        tracing::debug!(
            default_top = ?self.default_top,
            default_skip = ?self.default_skip,
            pagination_enabled = self.pagination_enabled,
            default_show_count = self.default_show_count,
            "installing OData query defaults"
        );
        *INSTALLED.write() = self;
    }

    /// Restore the built-in defaults.
    pub fn reset() {
        Self::default().install();
    }

    /// Whether new queries should emit `$count=true`.
    #[must_use]
    pub fn show_count(&self) -> bool {
        self.pagination_enabled || self.default_show_count
    }

    /// Layered sources: built-ins, then `file` if given, then the environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Yaml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` if the merged sources do not describe
    /// valid defaults.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Load defaults from an optional YAML file plus the environment.
    ///
    /// # Errors
    /// - `ConfigError::NotFound` if `file` is given but does not exist
    /// - `ConfigError::Invalid` if a source holds malformed values
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(file) = file
            && !file.is_file()
        {
            return Err(ConfigError::NotFound(file.to_path_buf()));
        }
        let defaults = Self::from_figment(&Self::figment(file))?;
        tracing::debug!(file = ?file, "loaded OData query defaults");
        Ok(defaults)
    }
}
