use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

/// Strict clock token: 1-2 digit hour, exactly 2 digit minute.
static CLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("Hardcode regex pattern"));

/// One detected table cell with its position and flattened text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell text, already joined into a single line
    pub text: String,
}

impl TableCell {
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
        }
    }
}

/// Wall-clock time of a time-row header or a shift end.
///
/// Hours are not wrapped at 24: a shift starting in the last slot of the day
/// ends at `24:MM`, which the caller is expected to tolerate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    /// Parses a strict `H:MM` or `HH:MM` token. Surrounding whitespace is not accepted.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = CLOCK_PATTERN.captures(value)?;
        let hour = captures.get(1)?.as_str().parse().ok()?;
        let minute = captures.get(2)?.as_str().parse().ok()?;
        Some(Self { hour, minute })
    }

    /// Returns true if the text is a strict clock token.
    pub fn is_clock(value: &str) -> bool {
        CLOCK_PATTERN.is_match(value)
    }

    /// Adds whole hours, keeping the minute unchanged.
    pub fn plus_hours(self, hours: u32) -> Self {
        Self {
            hour: self.hour + hours,
            minute: self.minute,
        }
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
