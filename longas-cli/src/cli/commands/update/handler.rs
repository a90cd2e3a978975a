//! Update command handler

use anyhow::{Context, Result};
use colored::*;
use std::fs;

use super::UpdateArgs;
use crate::config::Config;
use crate::pdf::DocumentTableExtractor;
use crate::reconcile::{CycleOutcome, ReconcileSummary, SpreadsheetReconciler, UpdateRequest};

pub fn handle_update_command(args: UpdateArgs, config: &Config) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let extractor = DocumentTableExtractor::new(config.extraction.clone(), today);

    let request = UpdateRequest {
        current: args.current.clone(),
        previous: args.previous.clone(),
        template: args.template.unwrap_or_else(|| config.template.clone()),
        output_dir: args.output_dir.unwrap_or_else(|| config.output_dir.clone()),
        generated_on: today,
    };

    let outcome = SpreadsheetReconciler::new(&extractor, &config.layout).run(&request)?;
    print!("{}", render_outcome(&outcome));

    let CycleOutcome::Completed(summary) = outcome else {
        return Ok(());
    };
    log::debug!("Cycle stages: {:?}", summary.stages);

    if let (Some(archive), Some(current)) = (&args.archive_current, &request.current) {
        fs::copy(current, archive).with_context(|| {
            format!(
                "Failed to archive {} to {}",
                current.display(),
                archive.display()
            )
        })?;
        println!(
            "Archived current report to {}",
            archive.display().to_string().cyan()
        );
    }

    Ok(())
}

/// Text shown once a cycle has finished
fn render_outcome(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::NoValidTable { reference_date } => format!(
            "{} {}\n",
            "Warning:".yellow().bold(),
            format!(
                "no valid occupancy table found in the report of {}; no workbook was written",
                reference_date
            )
            .yellow()
        ),
        CycleOutcome::Completed(summary) => render_summary(summary),
    }
}

fn render_summary(summary: &ReconcileSummary) -> String {
    let mut out = String::new();

    if summary.baseline {
        out.push_str(&format!(
            "{}\n",
            "No previous report given: baseline run, discharges were not computed".cyan()
        ));
    }

    out.push_str(&format!(
        "{} {}\n",
        "Workbook written:".green().bold(),
        summary.output_path.display().to_string().bright_white()
    ));
    out.push_str(&format!(
        "{}\n",
        format!("{} leitos, {} baixas", summary.current_beds, summary.discharges).green()
    ));
    if !summary.baseline {
        out.push_str(&format!(
            "New beds since previous report: {}\n",
            summary.arrivals
        ));
    }

    if summary.reference_date.used_fallback() {
        out.push_str(&format!(
            "Reference date: {} {}\n",
            summary.reference_date,
            "(not found in report, using today)".yellow()
        ));
    } else {
        out.push_str(&format!("Reference date: {}\n", summary.reference_date));
    }

    out
}
