use crate::schedule::cell::ClockTime;
use crate::schedule::ShiftRecord;
use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::Deserialize;
use thiserror::Error;

/// Reasons a model reply is not accepted.
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Reply is not JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Reply is not a JSON array")]
    NotAnArray,

    #[error("Reply is an empty array")]
    EmptyArray,

    #[error("Invalid shift at index {index}: {message}")]
    InvalidShift { index: usize, message: String },
}

/// Builds the extraction instructions around the raw OCR payload.
pub fn build_prompt(payload: &serde_json::Value, name: &str, year: i32) -> String {
    let payload = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    format!(
        r#"You read photographed shift-schedule tables.
The JSON below is the table-detection OCR result of one schedule. Extract every shift worked by "{name}".

Target person: {name}
Year: {year}

OCR result:
{payload}

Rules:
1. Find the header row holding the dates. A date label covers its own column and every
   following column up to the next date label.
2. Find every cell whose text contains "{name}". Its column gives the date.
3. The first column of the cell's row is the start time.
4. A time written after the name in the cell is the end time ("17:00", "17" means 17:00,
   "15.5" means 15:30). Without one, the end is one hour after the start.
5. The label in the position row above the cell is the title.
6. Dates like "07월 11일", "7/11" or "07-11" become "{year}-07-11".
7. Times are "HH:MM".

Reply with a JSON array only, no explanation and no markdown:
[{{"date": "YYYY-MM-DD", "start": "HH:MM", "end": "HH:MM", "title": "position"}}]
Include every cell that mentions "{name}". Reply [] if there is none."#
    )
}

/// Removes one leading ```` ```json ```` / ```` ``` ```` marker and one trailing ```` ``` ````.
pub fn strip_code_fence(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// One element of the reply array before validation.
#[derive(Debug, Deserialize)]
struct ReplyShift {
    date: String,
    start: String,
    end: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

impl ReplyShift {
    fn validate(self) -> Result<ShiftRecord, String> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| format!("date '{}' is not YYYY-MM-DD", self.date))?;
        if !ClockTime::is_clock(&self.start) || NaiveTime::parse_from_str(&self.start, "%H:%M").is_err() {
            Err(format!("start '{}' is not a time of day", self.start))?;
        }
        // end may run to 24:MM when a shift closes the day
        match ClockTime::parse(&self.end) {
            Some(end) if end.hour <= 24 && end.minute < 60 => {}
            _ => Err(format!("end '{}' is not a time up to 24:59", self.end))?,
        }
        let title = self.title.or(self.position).ok_or("missing title")?;
        Ok(ShiftRecord {
            date: self.date,
            start: self.start,
            end: self.end,
            title,
        })
    }
}

/// Parses and validates a model reply into shifts.
///
/// The reply must be a non-empty JSON array whose every element has string
/// `date`, `start`, `end` and `title` (or `position`) fields in the expected
/// formats. Anything else is rejected as a whole.
pub fn parse_reply(reply: &str) -> Result<Vec<ShiftRecord>, ReplyError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(reply))?;
    let items = value.as_array().ok_or(ReplyError::NotAnArray)?;
    if items.is_empty() {
        Err(ReplyError::EmptyArray)?;
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            ReplyShift::deserialize(item)
                .map_err(|error| error.to_string())
                .and_then(ReplyShift::validate)
                .map_err(|message| ReplyError::InvalidShift { index, message })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_payload_and_rules() {
        let prompt = build_prompt(&json!({ "images": [] }), "김씨", 2025);

        assert!(prompt.contains("\"images\": []"));
        assert!(prompt.contains("Target person: 김씨"));
        assert!(prompt.contains("2025-07-11"));
        assert!(prompt.contains("JSON array only"));
    }

    #[test]
    fn strip_fences() {
        assert_eq!(strip_code_fence("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [2]  "), "[2]");
        assert_eq!(strip_code_fence("[3]\n```"), "[3]");
    }

    #[test]
    fn parse_valid_reply() {
        let reply = r#"```json
[{"name": "김씨", "position": "A", "date": "2025-07-07", "start": "09:00", "end": "17:00"},
 {"date": "2025-07-08", "start": "9:00", "end": "10:00", "title": "B"}]
```"#;
        let records = parse_reply(reply).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "A");
        assert_eq!(records[0].end, "17:00");
        assert_eq!(records[1].start, "9:00");
    }

    #[test]
    fn parse_rejects_bad_replies() {
        assert!(matches!(parse_reply("not json"), Err(ReplyError::InvalidJson(_))));
        assert!(matches!(parse_reply("{\"date\": \"2025-07-07\"}"), Err(ReplyError::NotAnArray)));
        assert!(matches!(parse_reply("[]"), Err(ReplyError::EmptyArray)));
        assert!(matches!(
            parse_reply(r#"[{"date": "2025-07-07", "start": "09:00", "end": "17:00"}]"#),
            Err(ReplyError::InvalidShift { index: 0, .. })
        ));
        assert!(matches!(
            parse_reply(r#"[{"date": "7월 7일", "start": "09:00", "end": "17:00", "title": "A"}]"#),
            Err(ReplyError::InvalidShift { .. })
        ));
        assert!(matches!(
            parse_reply(r#"[{"date": "2025-07-07", "start": 9, "end": "17:00", "title": "A"}]"#),
            Err(ReplyError::InvalidShift { .. })
        ));
        assert!(matches!(
            parse_reply(r#"[{"date": "2025-07-07", "start": "09:00", "end": "5pm", "title": "A"}]"#),
            Err(ReplyError::InvalidShift { .. })
        ));
    }

    #[test]
    fn parse_rejects_impossible_times() {
        for (start, end) in [("25:00", "26:00"), ("09:60", "10:00"), ("09:00", "99:99"), ("09:00", "25:00"), ("09:00", "17:60")] {
            let reply = format!(r#"[{{"date": "2025-07-07", "start": "{start}", "end": "{end}", "title": "A"}}]"#);
            assert!(matches!(parse_reply(&reply), Err(ReplyError::InvalidShift { index: 0, .. })), "{start}-{end}");
        }
    }

    #[test]
    fn parse_accepts_end_of_day() {
        let records = parse_reply(r#"[{"date": "2025-07-07", "start": "23:30", "end": "24:30", "title": "A"}]"#).unwrap();

        assert_eq!(records[0].end, "24:30");
    }
}
