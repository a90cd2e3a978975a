//! Discharge detection between two consecutive snapshots.
//!
//! A discharge is a bed present in the previous snapshot and absent from the
//! current one. Matching is exact on bed id; a bed that disappears, comes back
//! and disappears again is reported once per disappearance.

use std::collections::HashSet;

use super::types::{OccupancyRecord, Snapshot};

/// Bed ids present in `previous` but not in `current`
pub fn discharged(previous: &Snapshot, current: &Snapshot) -> HashSet<String> {
    let current_ids = current.bed_ids();
    previous
        .records
        .iter()
        .filter(|r| !current_ids.contains(r.bed_id.as_str()))
        .map(|r| r.bed_id.clone())
        .collect()
}

/// Discharged records, in the previous snapshot's order
pub fn discharged_records<'a>(
    previous: &'a Snapshot,
    current: &Snapshot,
) -> Vec<&'a OccupancyRecord> {
    let gone = discharged(previous, current);
    previous
        .records
        .iter()
        .filter(|r| gone.contains(&r.bed_id))
        .collect()
}

/// Bed ids new in `current`. Only used for reporting.
pub fn arrivals(previous: &Snapshot, current: &Snapshot) -> HashSet<String> {
    discharged(current, previous)
}
