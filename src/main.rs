use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use vogon::cli::Cli;
use vogon::utils;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first so --verbose reaches the logger
    let cli = Cli::parse();
    utils::logger::init(cli.verbose)?;

    if let Err(e) = cli.execute().await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
