use crate::schedule::cell::ClockTime;
use crate::schedule::date::DateIndex;
use crate::schedule::grid::Grid;
use crate::schedule::header::HeaderIndices;
use crate::schedule::ShiftRecord;
use tracing::debug;

/// Converts the time-like token that follows a name into `HH:MM`.
///
/// - `17:00` is kept verbatim
/// - `15.5` reads the fraction as part of an hour (`15:30`), rounded to the minute
/// - `16` becomes `16:00`
///
/// Returns None when the token cannot be read, in which case the caller
/// falls back to the one-hour default.
pub fn normalize_end_token(raw: &str) -> Option<String> {
    if raw.contains(':') {
        return Some(raw.to_owned());
    }
    if let Some((hour, fraction)) = raw.split_once('.') {
        let mut hour = hour.parse::<u32>().ok()?;
        let digits = fraction.split('.').next().unwrap_or("");
        let mut minute = if digits.is_empty() {
            0
        } else {
            (format!("0.{digits}").parse::<f64>().ok()? * 60f64).round() as u32
        };
        if minute >= 60 { // e.g. 15.999 rounds up to a full hour
            hour += 1;
            minute -= 60;
        }
        return Some(format!("{hour:02}:{minute:02}"));
    }
    let hour = raw.parse::<u32>().ok()?;
    Some(format!("{hour:02}:00"))
}

/// Time-like token (digits, `.` and `:`) right after an occurrence of `name`,
/// allowing whitespace in between. The first occurrence followed by one wins.
pub fn end_token<'t>(text: &'t str, name: &str) -> Option<&'t str> {
    if name.is_empty() {
        return None;
    }
    text.match_indices(name).find_map(|(index, _)| {
        let rest = text[index + name.len()..].trim_start();
        let length = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ':'))
            .unwrap_or(rest.len());
        (length > 0).then(|| &rest[..length])
    })
}

/// Walks the time-row band and emits one record per cell mentioning `name`.
pub(crate) struct ShiftCellParser<'a> {
    grid: &'a Grid,
    indices: &'a HeaderIndices,
    dates: &'a DateIndex,
    name: &'a str,
    fallback_title: &'a str,
}

impl<'a> ShiftCellParser<'a> {
    pub(crate) fn new(
        grid: &'a Grid,
        indices: &'a HeaderIndices,
        dates: &'a DateIndex,
        name: &'a str,
        fallback_title: &'a str,
    ) -> Self {
        Self {
            grid,
            indices,
            dates,
            name,
            fallback_title,
        }
    }

    /// Parses every matching cell, row by row and left to right.
    pub(crate) fn parse(&self) -> Vec<ShiftRecord> {
        let mut records = Vec::new();
        for row in self.indices.time_rows() {
            let start_text = self.grid.get(row, 0);
            let Some(start) = ClockTime::parse(start_text) else {
                debug!(row, header = start_text, "Skipping non-time row inside time band");
                continue;
            };
            for col in 1..self.grid.col_count() {
                let text = self.grid.get(row, col);
                if !text.contains(self.name) {
                    continue;
                }
                let Some(date) = self.dates.iso(col) else {
                    debug!(row, col, "Skipping cell in column without a date");
                    continue;
                };
                records.push(ShiftRecord {
                    date,
                    start: start_text.to_owned(),
                    end: self.end_time(text, start),
                    title: self.title(col),
                });
            }
        }
        records
    }

    /// End time from the token after the name, or one hour after the start.
    fn end_time(&self, text: &str, start: ClockTime) -> String {
        end_token(text, self.name)
            .and_then(normalize_end_token)
            .unwrap_or_else(|| start.plus_hours(1).to_string())
    }

    /// Position label above the column, or the fallback title.
    fn title(&self, col: usize) -> String {
        self.indices.position_row
            .map(|row| self.grid.get(row, col))
            .filter(|label| !label.is_empty())
            .unwrap_or(self.fallback_title)
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::cell::TableCell;
    use crate::schedule::extract_shifts;
    use crate::schedule::ExtractionOptions;

    #[test]
    fn end_token_forms() {
        assert_eq!(normalize_end_token("17:00").as_deref(), Some("17:00"));
        assert_eq!(normalize_end_token("15.5").as_deref(), Some("15:30"));
        assert_eq!(normalize_end_token("15.75").as_deref(), Some("15:45"));
        assert_eq!(normalize_end_token("16").as_deref(), Some("16:00"));
        assert_eq!(normalize_end_token("9").as_deref(), Some("09:00"));
        assert_eq!(normalize_end_token("9.").as_deref(), Some("09:00"));
    }

    #[test]
    fn end_token_rounds_to_nearest_minute() {
        assert_eq!(normalize_end_token("15.33").as_deref(), Some("15:20"));
        assert_eq!(normalize_end_token("15.999").as_deref(), Some("16:00"));
    }

    #[test]
    fn end_token_unreadable() {
        assert_eq!(normalize_end_token("."), None);
        assert_eq!(normalize_end_token(".5"), None);
        assert_eq!(normalize_end_token(""), None);
    }

    #[test]
    fn end_token_after_name() {
        assert_eq!(end_token("김씨 17:00", "김씨"), Some("17:00"));
        assert_eq!(end_token("김씨15.5 마감", "김씨"), Some("15.5"));
        assert_eq!(end_token("이씨 12 김씨   16", "김씨"), Some("16"));
        assert_eq!(end_token("김씨 / 김씨 18", "김씨"), Some("18"));
        assert_eq!(end_token("김씨", "김씨"), None);
        assert_eq!(end_token("김씨 마감", "김씨"), None);
        assert_eq!(end_token("a+b 9", "a+b"), Some("9"));
    }

    #[test]
    fn oversized_name_uses_default_end() {
        let name = "가".repeat(2_000_000);
        let cells = [
            TableCell::new(0, 0, "날짜"),
            TableCell::new(0, 1, "7월 1일"),
            TableCell::new(1, 0, "09:00"),
            TableCell::new(1, 1, name.clone()),
            TableCell::new(2, 0, "10:00"),
            TableCell::new(2, 1, format!("{name} 13")),
        ];
        let records = extract_shifts(&cells, &name, &ExtractionOptions::for_year(2025));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].end, "10:00");
        assert_eq!(records[1].end, "13:00");
    }
}
