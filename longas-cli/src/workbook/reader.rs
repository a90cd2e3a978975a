//! Read the Longas workbook into memory

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Reader, Xlsx, open_workbook};

use super::cell::CellValue;

/// A merged block of cells, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

/// Values of one worksheet, indexed from A1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetContents {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
    pub merged: Vec<MergedRange>,
}

static EMPTY: CellValue = CellValue::Empty;

impl SheetContents {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Number of rows up to and including the last one holding a value
    pub fn used_rows(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Drop every row from `row` on, with the merges that reach into them
    pub fn truncate_rows(&mut self, row: usize) {
        self.rows.truncate(row);
        self.merged.retain(|m| m.last_row < row);
    }
}

/// All sheets of a workbook, in workbook order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookContents {
    pub sheets: Vec<SheetContents>,
}

impl WorkbookContents {
    pub fn sheet(&self, name: &str) -> Option<&SheetContents> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut SheetContents> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }
}

/// Read every sheet's values, formulas and merges. The file is opened read-only.
pub fn read_workbook(path: &Path) -> Result<WorkbookContents> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let mut contents = WorkbookContents::default();

    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet: {}", name))?;

        let mut sheet = SheetContents::new(&name);

        // Ranges start at the first used cell, not at A1
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        for (r, row) in range.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let value = CellValue::from_data(data);
                if !value.is_empty() {
                    sheet.set_cell(row_offset as usize + r, col_offset as usize + c, value);
                }
            }
        }

        let formulas = workbook
            .worksheet_formula(&name)
            .with_context(|| format!("Failed to read formulas of sheet: {}", name))?;
        let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
        for (r, row) in formulas.rows().enumerate() {
            for (c, formula) in row.iter().enumerate() {
                if formula.is_empty() {
                    continue;
                }
                let (row, col) = (row_offset as usize + r, col_offset as usize + c);
                let result = sheet.cell(row, col).display();
                let formula = formula.trim_start_matches('=').to_string();
                sheet.set_cell(row, col, CellValue::Formula { formula, result });
            }
        }

        if let Some(merged) = workbook.worksheet_merge_cells(&name) {
            let merged =
                merged.with_context(|| format!("Failed to read merged cells of sheet: {}", name))?;
            sheet.merged = merged
                .iter()
                .map(|dims| MergedRange {
                    first_row: dims.start.0 as usize,
                    first_col: dims.start.1 as usize,
                    last_row: dims.end.0 as usize,
                    last_col: dims.end.1 as usize,
                })
                .collect();
        }

        log::debug!(
            "Read sheet '{}' ({} rows, {} merged ranges)",
            name,
            sheet.used_rows(),
            sheet.merged.len()
        );
        contents.sheets.push(sheet);
    }

    Ok(contents)
}
