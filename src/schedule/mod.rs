//! # Schedule Table Module
//!
//! Deterministic extraction of one person's shifts from a photographed
//! schedule table. The pipeline mirrors how a reader scans the sheet:
//!
//! 1. [`grid::Grid`] rebuilds a dense text table from sparse cell detections
//! 2. [`header::HeaderIndices`] finds the date row, the position row and the
//!    band of rows whose first column is a clock time
//! 3. [`date::DateIndex`] assigns a calendar date to every column
//! 4. [`parser`] emits a [`ShiftRecord`] for each cell that mentions the name
//!
//! Every step degrades to "nothing found" instead of failing, so the pipeline
//! always returns a list.
use crate::schedule::cell::TableCell;
use crate::schedule::date::DateIndex;
use crate::schedule::grid::Grid;
use crate::schedule::header::HeaderIndices;
use crate::schedule::header::HeaderMarkers;
use crate::schedule::parser::ShiftCellParser;
use chrono::Datelike;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub mod appointment;
pub mod cell;
pub mod date;
pub mod grid;
pub mod header;
pub mod parser;

/// Title used when a column has no position label.
pub const DEFAULT_TITLE: &str = "근무";

/// One extracted shift.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftRecord {
    /// ISO calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Shift start, `HH:MM`
    pub start: String,
    /// Shift end, `HH:MM`
    pub end: String,
    /// Position label or fallback title
    pub title: String,
}

/// Knobs shared by both extraction paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Year applied to month/day header tokens
    pub year: i32,
    /// Column-0 prefixes of the header rows
    pub markers: HeaderMarkers,
    /// Title for columns without a position label
    pub fallback_title: String,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            year: chrono::Local::now().year(),
            markers: HeaderMarkers::default(),
            fallback_title: DEFAULT_TITLE.to_owned(),
        }
    }
}

impl ExtractionOptions {
    /// Default options for a fixed year.
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }
}

/// Runs the full deterministic pipeline over detected cells.
pub fn extract_shifts(cells: &[TableCell], name: &str, options: &ExtractionOptions) -> Vec<ShiftRecord> {
    if cells.is_empty() {
        info!("No table cells detected, nothing to extract");
    }
    let grid = Grid::from_cells(cells);
    extract_from_grid(&grid, name, options)
}

/// Runs header location, date mapping and cell parsing over a built grid.
///
/// Running it twice on the same grid yields the same ordered output.
pub fn extract_from_grid(grid: &Grid, name: &str, options: &ExtractionOptions) -> Vec<ShiftRecord> {
    let name = name.trim();
    if name.is_empty() {
        warn!("Empty target name, every cell would match; returning no shifts");
        return Vec::new();
    }

    let indices = HeaderIndices::locate(grid, &options.markers);
    debug!(
        rows = grid.row_count(),
        cols = grid.col_count(),
        date_row = ?indices.date_row,
        position_row = ?indices.position_row,
        time_band = ?indices.time_band,
        "Located schedule headers"
    );
    if indices.time_band.is_none() {
        info!("No time rows found, nothing to extract");
        return Vec::new();
    }

    let dates = DateIndex::build(grid, indices.date_row, options.year);
    let records = ShiftCellParser::new(grid, &indices, &dates, name, &options.fallback_title).parse();
    info!(shifts = records.len(), "Extracted shifts from schedule grid");
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds cells from dense rows, skipping blanks like a detector would.
    fn cells(rows: &[&[&str]]) -> Vec<TableCell> {
        rows.iter()
            .enumerate()
            .flat_map(|(row, record)| {
                record.iter()
                    .enumerate()
                    .filter(|(_, text)| !text.is_empty())
                    .map(move |(col, text)| TableCell::new(row, col, *text))
            })
            .collect()
    }

    fn shift(date: &str, start: &str, end: &str, title: &str) -> ShiftRecord {
        ShiftRecord {
            date: date.to_owned(),
            start: start.to_owned(),
            end: end.to_owned(),
            title: title.to_owned(),
        }
    }

    #[test]
    fn extract_basic_scenario() {
        let cells = cells(&[
            &["날짜", "07월 07일", "07월 08일"],
            &["포지션", "A", "B"],
            &["09:00", "김씨 17:00", ""],
        ]);
        let records = extract_shifts(&cells, "김씨", &ExtractionOptions::for_year(2025));

        assert_eq!(records, vec![shift("2025-07-07", "09:00", "17:00", "A")]);
    }

    #[test]
    fn extract_one_record_per_matching_cell() {
        let cells = cells(&[
            &["날짜", "7/7", "", "7/8"],
            &["포지션", "홀", "주방", ""],
            &["09:00", "김씨 15.5", "김씨", "이씨"],
            &["10:00", "", "", "김씨 16"],
            &["총 인원", "1", "1", "1"],
        ]);
        let records = extract_shifts(&cells, "김씨", &ExtractionOptions::for_year(2025));

        assert_eq!(records, vec![
            shift("2025-07-07", "09:00", "15:30", "홀"),
            shift("2025-07-07", "09:00", "10:00", "주방"),
            shift("2025-07-08", "10:00", "16:00", DEFAULT_TITLE),
        ]);
    }

    #[test]
    fn extract_skips_columns_without_date() {
        let cells = cells(&[
            &["날짜", "", "7월 11일"],
            &["09:00", "김씨", "김씨"],
        ]);
        let records = extract_shifts(&cells, "김씨", &ExtractionOptions::for_year(2025));

        assert_eq!(records, vec![shift("2025-07-11", "09:00", "10:00", DEFAULT_TITLE)]);
    }

    #[test]
    fn extract_is_idempotent() {
        let cells = cells(&[
            &["날짜", "7월 1일", "7월 2일"],
            &["08:30", "김씨 12", "김씨"],
            &["13:00", "", "김씨 18:00"],
        ]);
        let grid = Grid::from_cells(&cells);
        let options = ExtractionOptions::for_year(2025);

        let first = extract_from_grid(&grid, "김씨", &options);
        let second = extract_from_grid(&grid, "김씨", &options);
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn extract_malformed_input_yields_nothing() {
        let options = ExtractionOptions::for_year(2025);

        assert!(extract_shifts(&[], "김씨", &options).is_empty());
        assert!(extract_shifts(&cells(&[&["날짜", "7월 1일"], &["메모", "김씨"]]), "김씨", &options).is_empty());
        assert!(extract_shifts(&cells(&[&["날짜", "7월 1일"], &["09:00", "김씨"]]), "  ", &options).is_empty());
    }

    #[test]
    fn shift_record_serializes_with_plain_keys() {
        let json = serde_json::to_value(shift("2025-07-07", "09:00", "17:00", "A")).unwrap();

        assert_eq!(json, serde_json::json!({
            "date": "2025-07-07",
            "start": "09:00",
            "end": "17:00",
            "title": "A",
        }));
    }
}
