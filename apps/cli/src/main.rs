//! LeadEnrich CLI: turn a list of company names into sales-ready lead rows.
//!
//! Reads a CSV of company names, finds each company's website, summarizes the
//! homepage, and writes an enriched CSV.

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
