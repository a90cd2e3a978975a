//! `update`: one reconciliation cycle

mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::handle_update_command;

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Current occupancy report (PDF)
    #[arg(short, long)]
    pub current: Option<PathBuf>,

    /// Previous occupancy report; without it no discharges are computed
    #[arg(short, long)]
    pub previous: Option<PathBuf>,

    /// Base workbook (overrides the config file)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Directory for the dated workbook (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Copy the current report here after a successful run, for use as --previous next time
    #[arg(long)]
    pub archive_current: Option<PathBuf>,
}
