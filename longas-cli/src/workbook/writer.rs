//! Apply a reconcile plan to the workbook and save it atomically

use std::io::Write;
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use tempfile::NamedTempFile;

use crate::config::{CellRef, SheetLayout};
use crate::occupancy::{DATE_FORMAT, OccupancyRecord};
use crate::reconcile::{HistoryUpdate, ReconcilePlan, UpdateError};

use super::cell::CellValue;
use super::cols;
use super::formatting::RenderFormats;
use super::reader::{SheetContents, WorkbookContents};

/// Exclusive, in-memory working copy of the workbook.
///
/// Nothing reaches disk until [`StagedWorkbook::commit`], and a plan must be
/// applied to obtain a `StagedWorkbook`.
#[derive(Debug)]
pub struct WorkbookTransaction {
    contents: WorkbookContents,
    layout: SheetLayout,
    generated_cell: CellRef,
    reference_cell: CellRef,
}

impl WorkbookTransaction {
    /// Check the layout against the workbook and take ownership of it
    pub fn begin(contents: WorkbookContents, layout: &SheetLayout) -> Result<Self, UpdateError> {
        for name in [&layout.current_sheet, &layout.history_sheet] {
            if contents.sheet(name).is_none() {
                return Err(UpdateError::MissingSheet { name: name.clone() });
            }
        }

        let generated_cell = stamp_cell(&layout.generated_cell, layout)?;
        let reference_cell = stamp_cell(&layout.reference_cell, layout)?;

        Ok(Self {
            contents,
            layout: layout.clone(),
            generated_cell,
            reference_cell,
        })
    }

    pub fn contents(&self) -> &WorkbookContents {
        &self.contents
    }

    /// Stamp dates, rewrite the current occupants body and append history
    pub fn apply(mut self, plan: &ReconcilePlan) -> Result<StagedWorkbook, UpdateError> {
        let body_start = self.layout.body_start_index();

        let current = sheet_mut(&mut self.contents, &self.layout.current_sheet)?;
        current.set_cell(
            self.generated_cell.row,
            self.generated_cell.col,
            CellValue::text(&plan.generated_on.format(DATE_FORMAT).to_string()),
        );
        current.set_cell(
            self.reference_cell.row,
            self.reference_cell.col,
            CellValue::text(&plan.reference_date.to_string()),
        );

        current.truncate_rows(body_start);
        for (offset, row) in plan.current_rows.iter().enumerate() {
            let r = body_start + offset;
            write_record(current, r, &row.record);
            current.set_cell(r, cols::STATUS, row.annotation.status_note.clone());
            current.set_cell(r, cols::NOTE, row.annotation.free_text_note.clone());
        }
        let body_rows = body_start..body_start + plan.current_rows.len();
        log::debug!(
            "Rewrote {} body rows of '{}'",
            plan.current_rows.len(),
            self.layout.current_sheet
        );

        if let HistoryUpdate::Append(rows) = &plan.history {
            let history = sheet_mut(&mut self.contents, &self.layout.history_sheet)?;
            let start = history.used_rows();
            history.truncate_rows(start);
            for (offset, row) in rows.iter().enumerate() {
                let r = start + offset;
                write_record(history, r, &row.record);
                history.set_cell(r, cols::STATUS, row.annotation.status_note.clone());
                history.set_cell(r, cols::NOTE, row.annotation.free_text_note.clone());
                let discharged_on = CellValue::text(&row.discharge_date.to_string());
                history.set_cell(r, cols::DISCHARGE, discharged_on);
            }
            log::debug!(
                "Appended {} rows to '{}' at row {}",
                rows.len(),
                self.layout.history_sheet,
                start + 1
            );
        }

        Ok(StagedWorkbook {
            contents: self.contents,
            current_sheet: self.layout.current_sheet,
            body_rows,
        })
    }
}

fn stamp_cell(reference: &str, layout: &SheetLayout) -> Result<CellRef, UpdateError> {
    let cell = reference
        .parse::<CellRef>()
        .map_err(|err| UpdateError::InvalidLayout {
            message: err.to_string(),
        })?;
    if cell.row >= layout.body_start_index() {
        return Err(UpdateError::InvalidLayout {
            message: format!(
                "cell {} lies inside the body, which starts at row {}",
                reference, layout.body_start_row
            ),
        });
    }
    Ok(cell)
}

fn sheet_mut<'a>(
    contents: &'a mut WorkbookContents,
    name: &str,
) -> Result<&'a mut SheetContents, UpdateError> {
    contents
        .sheet_mut(name)
        .ok_or_else(|| UpdateError::MissingSheet { name: name.to_string() })
}

fn write_record(sheet: &mut SheetContents, row: usize, record: &OccupancyRecord) {
    sheet.set_cell(row, cols::BED, CellValue::text(&record.bed_id));
    sheet.set_cell(row, cols::VISIT, CellValue::text(&record.visit_id));
    sheet.set_cell(row, cols::PATIENT, CellValue::text(&record.patient_name));
    sheet.set_cell(row, cols::DAYS, CellValue::Number(f64::from(record.occupied_days)));
}

/// Workbook with a plan applied, ready to be written
#[derive(Debug)]
pub struct StagedWorkbook {
    contents: WorkbookContents,
    current_sheet: String,
    body_rows: Range<usize>,
}

impl StagedWorkbook {
    pub fn contents(&self) -> &WorkbookContents {
        &self.contents
    }

    fn render(&self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        let formats = RenderFormats::new();
        let plain = Format::new();

        for sheet in &self.contents.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            let is_current = sheet.name == self.current_sheet;

            // Merges go first: merge_range blanks its first cell
            for m in &sheet.merged {
                if m.first_row == m.last_row && m.first_col == m.last_col {
                    continue;
                }
                worksheet.merge_range(
                    m.first_row as u32,
                    m.first_col as u16,
                    m.last_row as u32,
                    m.last_col as u16,
                    "",
                    &plain,
                )?;
            }

            for (r, row) in sheet.rows.iter().enumerate() {
                let in_body = is_current && self.body_rows.contains(&r);
                let width = if in_body {
                    row.len().max(cols::BODY_COLUMNS)
                } else {
                    row.len()
                };

                for c in 0..width {
                    let value = row.get(c).unwrap_or(&CellValue::Empty);
                    let format = formats.pick(value, c, in_body);
                    write_cell(worksheet, r as u32, c as u16, value, format)?;
                }
            }

            worksheet.autofit();
        }

        Ok(workbook)
    }

    /// Serialize and move into place at `path`. On failure nothing is left at `path`.
    pub fn commit(self, path: &Path) -> Result<()> {
        let mut workbook = self.render()?;
        let buffer = workbook
            .save_to_buffer()
            .context("Failed to serialize workbook")?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        staged
            .write_all(&buffer)
            .context("Failed to write workbook")?;
        staged
            .as_file()
            .sync_all()
            .context("Failed to flush workbook")?;
        staged
            .persist(path)
            .map_err(|err| err.error)
            .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

        log::info!("Workbook saved to {}", path.display());
        Ok(())
    }
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<()> {
    let written = match value {
        CellValue::Empty => match format {
            Some(f) => ws.write_blank(row, col, f),
            None => return Ok(()),
        },
        CellValue::Text(s) => match format {
            Some(f) => ws.write_string_with_format(row, col, s, f),
            None => ws.write_string(row, col, s),
        },
        CellValue::Number(n) | CellValue::Date(n) => match format {
            Some(f) => ws.write_number_with_format(row, col, *n, f),
            None => ws.write_number(row, col, *n),
        },
        CellValue::Bool(b) => match format {
            Some(f) => ws.write_boolean_with_format(row, col, *b, f),
            None => ws.write_boolean(row, col, *b),
        },
        CellValue::Formula { formula, result } => {
            let formula = Formula::new(formula).set_result(result);
            match format {
                Some(f) => ws.write_formula_with_format(row, col, formula, f),
                None => ws.write_formula(row, col, formula),
            }
        }
    };
    written?;
    Ok(())
}
