use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = goamet_credscript::cli::Cli::parse();
    cli.run().await
}
