use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use odata_query::QueryDefaults;

#[derive(Args)]
pub struct CommonArgs {
    /// YAML file with query defaults; `ODATA_QUERY_*` variables override it
    #[arg(short = 'd', long)]
    defaults: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the layered defaults and install them for new queries.
    pub fn install_defaults(&self) -> anyhow::Result<QueryDefaults> {
        let defaults = QueryDefaults::load(self.defaults.as_deref())
            .context("failed to load query defaults")?;
        defaults.clone().install();
        Ok(defaults)
    }
}
