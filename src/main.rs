//! Portico binary.

mod cli;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    let args = cli::Cli::parse();
    cli::run(args).await
}
