use air_pollution_pipeline::cli::{Cli, run};
use air_pollution_pipeline::error::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
