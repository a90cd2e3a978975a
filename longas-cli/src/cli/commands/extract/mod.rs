//! `extract`: print the records of one report without touching a workbook

mod handler;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

pub use handler::handle_extract_command;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Occupancy report (PDF)
    pub document: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Print only the reference date; never fails on unreadable documents
    #[arg(long)]
    pub date_only: bool,
}
