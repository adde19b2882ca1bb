use anyhow::Result;
use aurora_cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let code = aurora_cli::run_main(Cli::parse()).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
