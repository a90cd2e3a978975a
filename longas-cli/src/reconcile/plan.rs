//! Pure computation of what a reconciliation cycle writes

use chrono::NaiveDate;

use crate::occupancy::{
    Annotation, AnnotationMap, OccupancyRecord, ReferenceDate, Snapshot, arrivals,
    discharged_records,
};

/// A body row of the current occupants sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRow {
    pub record: OccupancyRecord,
    pub annotation: Annotation,
}

/// A row appended to the history sheet
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub record: OccupancyRecord,
    pub annotation: Annotation,
    pub discharge_date: ReferenceDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryUpdate {
    /// No previous snapshot: discharges cannot be computed this cycle
    Baseline,
    Append(Vec<HistoryRow>),
}

/// Everything a cycle writes, decided before the workbook is touched
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub generated_on: NaiveDate,
    pub reference_date: ReferenceDate,
    /// Sorted for presentation
    pub current_rows: Vec<CurrentRow>,
    pub history: HistoryUpdate,
    /// Beds new since the previous snapshot (reporting only)
    pub arrivals: usize,
}

impl ReconcilePlan {
    pub fn discharge_count(&self) -> usize {
        match &self.history {
            HistoryUpdate::Baseline => 0,
            HistoryUpdate::Append(rows) => rows.len(),
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self.history, HistoryUpdate::Baseline)
    }
}

/// Build the plan for one cycle
pub fn build_plan(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    annotations: &AnnotationMap,
    generated_on: NaiveDate,
) -> ReconcilePlan {
    let annotation_of = |bed_id: &str| annotations.get(bed_id).cloned().unwrap_or_default();

    let current_rows: Vec<CurrentRow> = current
        .sorted_for_presentation()
        .into_iter()
        .map(|record| CurrentRow {
            record: record.clone(),
            annotation: annotation_of(&record.bed_id),
        })
        .collect();
    log::debug!(
        "{} of {} current beds carry annotations",
        current_rows.iter().filter(|r| !r.annotation.is_empty()).count(),
        current_rows.len()
    );

    let (history, arrival_count) = match previous {
        None => (HistoryUpdate::Baseline, 0),
        Some(previous) => {
            let rows = discharged_records(previous, current)
                .into_iter()
                .map(|record| HistoryRow {
                    record: record.clone(),
                    annotation: annotation_of(&record.bed_id),
                    discharge_date: current.reference_date,
                })
                .collect();
            (HistoryUpdate::Append(rows), arrivals(previous, current).len())
        }
    };

    ReconcilePlan {
        generated_on,
        reference_date: current.reference_date,
        current_rows,
        history,
        arrivals: arrival_count,
    }
}
