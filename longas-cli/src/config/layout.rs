//! Layout of the Longas workbook

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CELL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{1,3})([1-9][0-9]*)$").expect("cell reference pattern is a valid regex")
});

/// Where things live in the workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Current occupants sheet
    pub current_sheet: String,
    /// Discharge history sheet
    pub history_sheet: String,
    /// First body row of the current occupants sheet (1-based, as shown in Excel)
    pub body_start_row: u32,
    /// Cell receiving the generation date
    pub generated_cell: String,
    /// Cell receiving the snapshot's reference date
    pub reference_cell: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            current_sheet: "Dados".to_string(),
            history_sheet: "Historico".to_string(),
            body_start_row: 6,
            generated_cell: "F2".to_string(),
            reference_cell: "F3".to_string(),
        }
    }
}

impl SheetLayout {
    /// Zero-based index of the first body row
    pub fn body_start_index(&self) -> usize {
        self.body_start_row.saturating_sub(1) as usize
    }
}

/// Zero-based cell position parsed from an A1 reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCellRef(pub String);

impl std::fmt::Display for InvalidCellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a cell reference like F2", self.0)
    }
}

impl std::error::Error for InvalidCellRef {}

impl FromStr for CellRef {
    type Err = InvalidCellRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CELL_REF
            .captures(s.trim())
            .ok_or_else(|| InvalidCellRef(s.to_string()))?;

        let col = caps[1]
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1;
        let row = caps[2]
            .parse::<usize>()
            .map_err(|_| InvalidCellRef(s.to_string()))?
            - 1;

        Ok(CellRef { row, col })
    }
}
