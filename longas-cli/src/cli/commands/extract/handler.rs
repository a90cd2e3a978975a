//! Extract command handler

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use super::{ExtractArgs, OutputFormat};
use crate::config::Config;
use crate::occupancy::{DateSource, OccupancyRecord, Snapshot};
use crate::pdf::DocumentTableExtractor;

#[derive(Serialize)]
struct ExtractReport<'a> {
    reference_date: String,
    date_source: DateSource,
    records: &'a [OccupancyRecord],
}

pub fn handle_extract_command(args: ExtractArgs, config: &Config) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let extractor = DocumentTableExtractor::new(config.extraction.clone(), today);

    if args.date_only {
        let date = extractor.reference_date(&args.document);
        println!("{} ({})", date, date.source);
        return Ok(());
    }

    if !args.document.is_file() {
        anyhow::bail!("Document does not exist: {}", args.document.display());
    }

    let snapshot = extractor
        .extract(&args.document)
        .with_context(|| format!("Failed to extract {}", args.document.display()))?;

    if snapshot.is_empty() {
        eprintln!(
            "{} {}",
            "Warning:".yellow().bold(),
            "no valid occupancy table found".yellow()
        );
    }

    match args.format {
        OutputFormat::Table => print!("{}", render_table(&snapshot)),
        OutputFormat::Json => println!("{}", render_json(&snapshot)?),
        OutputFormat::Csv => print!("{}", render_csv(&snapshot)?),
    }

    Ok(())
}

fn render_json(snapshot: &Snapshot) -> Result<String> {
    let report = ExtractReport {
        reference_date: snapshot.reference_date.to_string(),
        date_source: snapshot.reference_date.source,
        records: &snapshot.records,
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize records")
}

fn render_csv(snapshot: &Snapshot) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in &snapshot.records {
        writer.serialize(record).context("Failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Failed to flush CSV: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn render_table(snapshot: &Snapshot) -> String {
    let header = ["Leito", "Atendimento", "Paciente", "Dias"];
    let rows: Vec<[String; 4]> = snapshot
        .records
        .iter()
        .map(|r| {
            [
                r.bed_id.clone(),
                r.visit_id.clone(),
                r.patient_name.clone(),
                r.occupied_days.to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 4]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let source = match snapshot.reference_date.source {
        DateSource::Document => String::new(),
        DateSource::Fallback => " (fallback)".to_string(),
    };

    let mut out = format!("Reference date: {}{}\n\n", snapshot.reference_date, source);
    out.push_str(&line(header).bold().to_string());
    out.push('\n');
    for row in &rows {
        out.push_str(&line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ]));
        out.push('\n');
    }
    out.push_str(&format!("\n{} records\n", rows.len()));
    out
}
