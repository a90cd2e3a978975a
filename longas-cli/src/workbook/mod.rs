//! The Longas workbook: current occupants sheet and discharge history
//!
//! The base workbook is read once into memory, changed there and written
//! as a new dated file. The base file itself is never written to.
//!
//! Values, formulas and merged ranges are carried over. Column widths,
//! fonts and fills of the base file are not: the body gets its own
//! formats and every sheet is autofitted.

pub mod annotations;
pub mod cell;
pub mod formatting;
pub mod reader;
pub mod writer;

pub use annotations::read_annotations;
pub use cell::CellValue;
pub use reader::{WorkbookContents, read_workbook};
pub use writer::WorkbookTransaction;

/// Column positions shared by both sheets (0-based)
pub mod cols {
    pub const BED: usize = 0;
    pub const VISIT: usize = 1;
    pub const PATIENT: usize = 2;
    pub const DAYS: usize = 3;
    /// "Situação", hand-entered
    pub const STATUS: usize = 4;
    /// "OBS", hand-entered
    pub const NOTE: usize = 5;
    /// History sheet only
    pub const DISCHARGE: usize = 6;

    /// Columns styled in the current occupants body
    pub const BODY_COLUMNS: usize = 6;
}
