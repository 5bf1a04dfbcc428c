use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use odata_query::ODataQuery;

use crate::common::CommonArgs;
use crate::document::QueryDocument;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// One raw `key=value` line per parameter
    #[default]
    Params,
    /// Percent-encoded `k=v&k=v`
    QueryString,
    /// Base URL with the encoded query attached
    Url,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Query document (YAML, or JSON by `.json` extension); `-` reads stdin
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Params)]
    format: OutputFormat,

    /// Base URL, overriding `url` in the document
    #[arg(long)]
    base_url: Option<String>,

    #[command(flatten)]
    common_args: CommonArgs,
}

impl CompileArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        self.common_args.install_defaults()?;
        let document = QueryDocument::read(&self.document)?;

        let mut query = ODataQuery::new();
        document.apply(&mut query)?;
        if let Some(base) = &self.base_url {
            query.url(base);
        }
        tracing::info!(document = %self.document.display(), "compiling query document");

        match self.format {
            OutputFormat::Params => {
                for (key, value) in query.params()?.iter() {
                    println!("{key}={value}");
                }
            }
            OutputFormat::QueryString => println!("{}", query.to_query_string()?),
            OutputFormat::Url => {
                let url = query
                    .request_url()
                    .context("cannot build request url (set `url` or pass --base-url)")?;
                println!("{url}");
            }
        }
        Ok(())
    }
}
