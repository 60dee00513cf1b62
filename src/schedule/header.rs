use crate::schedule::cell::ClockTime;
use crate::schedule::grid::Grid;
use std::ops::RangeInclusive;

/// Literal prefixes that identify header rows in column 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderMarkers {
    /// Prefix of the row carrying date tokens
    pub date: String,
    /// Prefix of the row carrying position labels
    pub position: String,
    /// Prefix of the row that closes the time-row band
    pub total: String,
}

impl Default for HeaderMarkers {
    fn default() -> Self {
        Self {
            date: "날짜".to_owned(),
            position: "포지션".to_owned(),
            total: "총 인원".to_owned(),
        }
    }
}

/// Row positions of the structural parts of a schedule table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderIndices {
    /// Row whose first column starts with the date marker
    pub date_row: Option<usize>,
    /// Row whose first column starts with the position marker
    pub position_row: Option<usize>,
    /// Inclusive band of shift-start rows, None if no time row exists
    pub time_band: Option<(usize, usize)>,
}

impl HeaderIndices {
    /// Scans column 0 of every row for the header markers and clock tokens.
    pub fn locate(grid: &Grid, markers: &HeaderMarkers) -> Self {
        let find = |marker: &str| {
            grid.row_headers()
                .find(|(_, header)| header.starts_with(marker))
                .map(|(row, _)| row)
        };
        let date_row = find(markers.date.as_str());
        let position_row = find(markers.position.as_str());
        let total_row = find(markers.total.as_str());

        let first_time_row = grid.row_headers()
            .find(|(_, header)| ClockTime::is_clock(header))
            .map(|(row, _)| row);
        let last_time_row = match total_row {
            Some(row) => row.checked_sub(1),
            None => grid.row_headers()
                .filter(|(_, header)| ClockTime::is_clock(header))
                .map(|(row, _)| row)
                .last(),
        };
        let time_band = first_time_row
            .zip(last_time_row)
            .filter(|(first, last)| first <= last);

        Self {
            date_row,
            position_row,
            time_band,
        }
    }

    /// Rows of the time band, empty when no band was found.
    pub fn time_rows(&self) -> RangeInclusive<usize> {
        match self.time_band {
            Some((first, last)) => first..=last,
            None => RangeInclusive::new(1, 0),
        }
    }
}
