#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `odata-query`: compile query documents into `OData` request parameters.
//!
//! ```bash
//! # Raw `key=value` lines
//! odata-query compile people.yaml
//!
//! # Percent-encoded query string, paging defaults from a file
//! odata-query compile --defaults defaults.yaml --format query-string people.yaml
//!
//! # Full request URL
//! odata-query compile --format url --base-url https://api.example.com/odata/People people.json
//! ```

// CLI tools are expected to print to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod common;
mod compile;
mod defaults;
mod document;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(name = "odata-query")]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug, -vvv trace); `RUST_LOG` wins
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query document
    Compile(compile::CompileArgs),
    /// Print the effective query defaults
    Defaults(defaults::DefaultsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile(compile) => compile.run(),
        Commands::Defaults(defaults) => defaults.run(),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
