//! dynrepo CLI: serve enriched ISO 19139 catalog records from the command line.
//!
//! Looks records up in the configured catalog table, enriches them with the
//! schema identity and rendered XML, and prints the result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
