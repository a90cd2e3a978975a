//! Value types shared by extraction, diffing and the workbook writer

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::workbook::CellValue;

/// Display format for dates written into the workbook ("DD/MM/YYYY")
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Bed identifiers with this prefix are listed before all others
pub const PRIORITY_PREFIX: &str = "BOX";

/// One row of an occupancy report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyRecord {
    /// Bed identifier, unique within a snapshot
    pub bed_id: String,
    pub visit_id: String,
    pub patient_name: String,
    pub occupied_days: u32,
}

impl OccupancyRecord {
    pub fn new(bed_id: &str, visit_id: &str, patient_name: &str, occupied_days: u32) -> Self {
        Self {
            bed_id: bed_id.to_string(),
            visit_id: visit_id.to_string(),
            patient_name: patient_name.to_string(),
            occupied_days,
        }
    }

    /// Whether this bed belongs to the priority class (listed first)
    pub fn is_priority(&self) -> bool {
        self.bed_id.starts_with(PRIORITY_PREFIX)
    }
}

/// Presentation order: priority beds first, then ascending bed id within each class
pub fn presentation_order(a: &OccupancyRecord, b: &OccupancyRecord) -> Ordering {
    b.is_priority()
        .cmp(&a.is_priority())
        .then_with(|| a.bed_id.cmp(&b.bed_id))
}

/// Where a reference date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Found in the document text
    Document,
    /// Pattern missing or document unreadable; processing date used instead
    Fallback,
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateSource::Document => write!(f, "document"),
            DateSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Point in time a snapshot describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl ReferenceDate {
    pub fn from_document(date: NaiveDate) -> Self {
        Self {
            date,
            source: DateSource::Document,
        }
    }

    pub fn fallback(today: NaiveDate) -> Self {
        Self {
            date: today,
            source: DateSource::Fallback,
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.source == DateSource::Fallback
    }

    /// "DD-MM-YYYY", safe for file names
    pub fn file_stamp(&self) -> String {
        self.date.format("%d-%m-%Y").to_string()
    }
}

impl std::fmt::Display for ReferenceDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date.format(DATE_FORMAT))
    }
}

/// All records extracted from one document
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Records in document scan order, unique by bed id
    pub records: Vec<OccupancyRecord>,
    pub reference_date: ReferenceDate,
}

impl Snapshot {
    /// Build a snapshot, collapsing repeated bed ids onto their first occurrence
    pub fn new(records: Vec<OccupancyRecord>, reference_date: ReferenceDate) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(records.len());

        for record in records {
            if seen.contains(&record.bed_id) {
                log::debug!("Dropping repeated bed id {}", record.bed_id);
                continue;
            }
            seen.insert(record.bed_id.clone());
            unique.push(record);
        }

        Self {
            records: unique,
            reference_date,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn bed_ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.bed_id.as_str()).collect()
    }

    /// Records sorted for the current occupants sheet
    pub fn sorted_for_presentation(&self) -> Vec<&OccupancyRecord> {
        let mut sorted: Vec<&OccupancyRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| presentation_order(a, b));
        sorted
    }
}

/// Hand-entered notes attached to a bed in the current occupants sheet.
///
/// Cells keep the type the sheet stored them with (a typed date stays a date).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Column E ("Situação")
    pub status_note: CellValue,
    /// Column F ("OBS")
    pub free_text_note: CellValue,
}

impl Annotation {
    pub fn new(status_note: &str, free_text_note: &str) -> Self {
        Self {
            status_note: CellValue::text(status_note),
            free_text_note: CellValue::text(free_text_note),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status_note.is_empty() && self.free_text_note.is_empty()
    }
}

/// Annotations keyed by bed id
pub type AnnotationMap = HashMap<String, Annotation>;
