//! RivalScope CLI: competitor website analysis from the terminal.
//!
//! Fetches competitor sites, enriches them with a language model, and
//! prints a market analysis as JSON.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
