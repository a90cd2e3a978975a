//! Longas - long-stay bed reconciliation
//!
//! Reads the hospital's long-stay occupancy report (PDF), compares it with
//! the previous report and writes a dated copy of the Longas workbook with
//! the current occupants and the accumulated discharge history.

mod cli;
mod config;
mod occupancy;
mod pdf;
mod reconcile;
mod workbook;

use clap::Parser;
use colored::*;

fn main() {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = cli::run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}
