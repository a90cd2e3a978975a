//! Occupancy table schema: header recognition and row decoding

use crate::occupancy::OccupancyRecord;

use super::grid::Table;

/// Required header names
pub mod columns {
    pub const BED: &str = "Leito";
    pub const VISIT: &str = "Atendimento";
    pub const PATIENT: &str = "Paciente";
    pub const DAYS: &str = "Dias de Ocupação";

    /// Present in some exports; never read
    pub const METRIC: &str = "Métrica";
}

/// Positions of the required columns within an accepted header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub bed: usize,
    pub visit: usize,
    pub patient: usize,
    pub days: usize,
}

fn normalize_header(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Match a header row by name. Column order does not matter and extra
/// columns are ignored. `None` when any required column is missing.
pub fn match_header(header: &[Option<String>]) -> Option<ColumnMap> {
    let names: Vec<String> = header
        .iter()
        .map(|cell| cell.as_deref().map(normalize_header).unwrap_or_default())
        .collect();

    let position = |wanted: &str| names.iter().position(|name| name == wanted);

    if names.iter().any(|n| n == columns::METRIC) {
        log::debug!("Ignoring '{}' column", columns::METRIC);
    }

    Some(ColumnMap {
        bed: position(columns::BED)?,
        visit: position(columns::VISIT)?,
        patient: position(columns::PATIENT)?,
        days: position(columns::DAYS)?,
    })
}

/// Coerce an occupied-days cell. Decimals truncate toward zero; blanks,
/// non-numeric text and negatives become 0.
pub fn coerce_days(raw: Option<&str>) -> u32 {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0;
    };

    if let Ok(value) = text.parse::<i64>() {
        return value.clamp(0, i64::from(u32::MAX)) as u32;
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            value.trunc().min(f64::from(u32::MAX)) as u32
        }
        _ => 0,
    }
}

/// Records of an occupancy table, or `None` when the header does not match
pub fn table_records(table: &Table) -> Option<Vec<OccupancyRecord>> {
    let (header, body) = table.rows.split_first()?;
    let map = match_header(header)?;

    let cell = |row: &[Option<String>], index: usize| -> String {
        row.get(index)
            .and_then(|c| c.as_deref())
            .map(|c| c.trim().to_string())
            .unwrap_or_default()
    };

    let records = body
        .iter()
        .filter_map(|row| {
            let bed_id = cell(row, map.bed);
            if bed_id.is_empty() {
                return None;
            }
            Some(OccupancyRecord {
                bed_id,
                visit_id: cell(row, map.visit),
                patient_name: cell(row, map.patient),
                occupied_days: coerce_days(row.get(map.days).and_then(|c| c.as_deref())),
            })
        })
        .collect();

    Some(records)
}
