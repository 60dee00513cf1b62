use crate::schedule::ShiftRecord;
use serde::Serialize;

/// Source tag stored with rows created from a scanned schedule.
pub const OCR_SOURCE: &str = "ocr";

/// UTC offset appended to local shift times.
pub const DEFAULT_UTC_OFFSET: &str = "+09";

/// Row handed to the persistence layer, which upserts on `(user_uid, start_time)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppointmentRow {
    pub user_uid: String,
    pub title: String,
    /// `YYYY-MM-DDTHH:MM:00+09`
    pub start_time: String,
    pub end_time: String,
    pub color: Option<String>,
    pub source: String,
}

impl AppointmentRow {
    /// Maps a shift to a row using the default offset.
    pub fn from_shift(user_uid: &str, shift: &ShiftRecord) -> Self {
        Self::from_shift_with_offset(user_uid, shift, DEFAULT_UTC_OFFSET)
    }

    pub fn from_shift_with_offset(user_uid: &str, shift: &ShiftRecord, offset: &str) -> Self {
        Self {
            user_uid: user_uid.to_owned(),
            title: shift.title.to_owned(),
            start_time: format!("{}T{}:00{offset}", shift.date, shift.start),
            end_time: format!("{}T{}:00{offset}", shift.date, shift.end),
            color: None,
            source: OCR_SOURCE.to_owned(),
        }
    }
}
