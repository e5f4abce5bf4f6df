pub mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Variant;
use run::LaunchArgs;

#[derive(Parser)]
#[command(name = "vogon")]
#[command(author = "Vogon Team")]
#[command(version)]
#[command(about = "~@ vogon @~ ephemeral docker dev containers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (defaults to ~/.vogon.json)
    #[arg(long, global = true, env = "VOGON_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a poetry-managed repo in a fresh container and attach to it
    Poet(LaunchArgs),

    /// Mount a directory in a fresh container and attach to it
    Explorer(LaunchArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Poet(args) => args.execute(Variant::Poet, self.config).await,
            Commands::Explorer(args) => args.execute(Variant::Explorer, self.config).await,
        }
    }
}
