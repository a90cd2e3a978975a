//! Cell formats used when rendering the workbook

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder};

use super::cell::CellValue;
use super::cols;

const DATE_NUM_FORMAT: &str = "dd/mm/yyyy";

/// Columns centred in the body; the rest are left-aligned
const CENTERED: [u16; 3] = [cols::BED as u16, cols::VISIT as u16, cols::DAYS as u16];

/// Bordered, vertically centred body cell format for a column
pub fn body_format(col: u16) -> Format {
    let align = if CENTERED.contains(&col) {
        FormatAlign::Center
    } else {
        FormatAlign::Left
    };

    Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(align)
        .set_align(FormatAlign::VerticalCenter)
}

/// Format for date serials carried over from the template
pub fn date_format() -> Format {
    Format::new().set_num_format(DATE_NUM_FORMAT)
}

/// Every format a render needs, built once per workbook
pub struct RenderFormats {
    body: Vec<Format>,
    body_dates: Vec<Format>,
    dates: Format,
}

impl RenderFormats {
    pub fn new() -> Self {
        let columns = 0..cols::BODY_COLUMNS as u16;
        Self {
            body: columns.clone().map(body_format).collect(),
            body_dates: columns
                .map(|col| body_format(col).set_num_format(DATE_NUM_FORMAT))
                .collect(),
            dates: date_format(),
        }
    }

    /// Format for a cell. Body cells get borders; dates keep a date number format.
    pub fn pick(&self, value: &CellValue, col: usize, in_body: bool) -> Option<&Format> {
        let is_date = matches!(value, CellValue::Date(_));
        match (in_body, is_date) {
            (true, true) => self.body_dates.get(col).or(Some(&self.dates)),
            (true, false) => self.body.get(col),
            (false, true) => Some(&self.dates),
            (false, false) => None,
        }
    }
}
