use crate::errors::DataError;
use crate::types::{
    AccidentRecord, Gender, InjurySeverity, ParticipantRole, RawRow, RoadVolumeRecord, SeatbeltUse,
};
use crate::util::{normalize_segment, parse_alcohol, parse_date_flex, parse_f64_locale, parse_i32_safe};
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use log::{info, warn};
use std::path::Path;

// Contract column names of the road-volume workbook.
const SEGMENT_COLUMN: &str = "Odsek";
const AADT_COLUMN: &str = "PLDP";

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
    pub located_rows: usize,
}

/// Load and clean the accident CSV.
///
/// A row is only skipped when it cannot be identified at all (no accident
/// id or no parseable year). Every other malformed cell degrades to its
/// defined default so data variation never aborts the load.
pub fn load_accidents(path: &Path) -> Result<(Vec<AccidentRecord>, LoadReport), DataError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut located_rows = 0usize;
    let mut records: Vec<AccidentRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                skipped_rows += 1;
                continue;
            }
        };

        let accident_id = match row.accident_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };
        let year = match parse_i32_safe(row.year.as_deref()) {
            Some(y) => y,
            None => {
                skipped_rows += 1;
                continue;
            }
        };

        let easting = parse_f64_locale(row.geo_y.as_deref());
        let northing = parse_f64_locale(row.geo_x.as_deref());
        if easting.is_some() && northing.is_some() {
            located_rows += 1;
        }

        records.push(AccidentRecord {
            accident_id,
            year,
            date: parse_date_flex(row.date.as_deref()),
            admin_unit: clean_text(row.admin_unit, "NEZNANO"),
            road_name: clean_text(row.road_name, ""),
            segment_name: clean_text(row.segment_name, ""),
            accident_type: clean_text(row.accident_type, ""),
            cause: clean_text(row.cause, ""),
            role: ParticipantRole::parse(row.role.as_deref().unwrap_or("")),
            gender: row.gender.as_deref().and_then(Gender::parse),
            age: parse_i32_safe(row.age.as_deref()),
            injury: row.injury.as_deref().and_then(InjurySeverity::parse),
            seatbelt: SeatbeltUse::parse(row.seatbelt.as_deref().unwrap_or("")),
            alcohol: parse_alcohol(row.alcohol.as_deref()),
            easting,
            northing,
        });
    }

    let kept_rows = records.len();
    info!(
        "loaded {} of {} accident rows from {} ({} skipped, {} with coordinates)",
        kept_rows,
        total_rows,
        path.display(),
        skipped_rows,
        located_rows
    );
    let report = LoadReport { total_rows, kept_rows, skipped_rows, located_rows };
    Ok((records, report))
}

fn clean_text(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                fallback.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => fallback.to_string(),
    }
}

/// Load the road-volume workbook (first sheet). Segment names are
/// whitespace-normalized at load so they join directly against accident
/// segment names; rows without a usable AADT are skipped, not fatal.
pub fn load_road_volumes(path: &Path) -> Result<Vec<RoadVolumeRecord>, DataError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::EmptyWorkbook(path.to_path_buf()))??;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| DataError::MissingColumn {
        column: SEGMENT_COLUMN.to_string(),
        path: path.to_path_buf(),
    })?;
    let position = |column: &str| {
        header
            .iter()
            .position(|cell| matches!(cell, Data::String(s) if s.trim() == column))
    };
    let seg_col = position(SEGMENT_COLUMN).ok_or_else(|| DataError::MissingColumn {
        column: SEGMENT_COLUMN.to_string(),
        path: path.to_path_buf(),
    })?;
    let aadt_col = position(AADT_COLUMN).ok_or_else(|| DataError::MissingColumn {
        column: AADT_COLUMN.to_string(),
        path: path.to_path_buf(),
    })?;

    let mut volumes: Vec<RoadVolumeRecord> = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let segment_name = match row.get(seg_col) {
            Some(Data::String(s)) if !s.trim().is_empty() => normalize_segment(s),
            _ => {
                skipped += 1;
                continue;
            }
        };
        let aadt = match row.get(aadt_col) {
            Some(Data::Float(f)) => Some(*f),
            Some(Data::Int(i)) => Some(*i as f64),
            Some(Data::String(s)) => parse_f64_locale(Some(s)),
            _ => None,
        };
        match aadt {
            Some(v) if v > 0.0 => volumes.push(RoadVolumeRecord { segment_name, aadt: v }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{} volume rows skipped (missing segment or AADT)", skipped);
    }
    info!("loaded {} road segments from {}", volumes.len(), path.display());
    Ok(volumes)
}
