//! Hand-entered annotations of the current occupants sheet
//!
//! Columns E and F are typed by staff and never come from a report, so they
//! have to be captured before the body is rewritten and re-attached by bed id.

use crate::config::SheetLayout;
use crate::occupancy::{Annotation, AnnotationMap};

use super::cols;
use super::reader::SheetContents;

/// Read annotations keyed by bed id from the body of the current occupants sheet.
///
/// Notes keep the cell's type. Short rows yield empty notes; rows without a
/// bed id are skipped; a bed listed twice keeps its first row.
pub fn read_annotations(sheet: &SheetContents, layout: &SheetLayout) -> AnnotationMap {
    let mut annotations = AnnotationMap::new();

    for row in layout.body_start_index()..sheet.rows.len() {
        let bed_id = sheet.cell(row, cols::BED).display().trim().to_string();
        if bed_id.is_empty() {
            continue;
        }

        annotations.entry(bed_id).or_insert_with(|| Annotation {
            status_note: sheet.cell(row, cols::STATUS).clone(),
            free_text_note: sheet.cell(row, cols::NOTE).clone(),
        });
    }

    log::debug!("Read {} annotated rows from '{}'", annotations.len(), sheet.name);
    annotations
}
