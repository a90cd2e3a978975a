//! Command-line surface

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;
use commands::extract::{ExtractArgs, handle_extract_command};
use commands::update::{UpdateArgs, handle_update_command};

#[derive(Parser)]
#[command(name = "longas-cli")]
#[command(about = "Reconcile long-stay bed occupancy reports into the Longas workbook")]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file (default: $LONGAS_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new dated workbook from the current (and previous) report
    Update(UpdateArgs),
    /// Print the occupancy records of a report
    Extract(ExtractArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Update(args) => handle_update_command(args, &config),
        Commands::Extract(args) => handle_extract_command(args, &config),
    }
}
