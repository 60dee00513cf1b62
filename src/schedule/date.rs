use crate::schedule::grid::Grid;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("Hardcode regex pattern")
});
static KOREAN_MONTH_DAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})").expect("Hardcode regex pattern")
});
static NUMERIC_MONTH_DAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s*[/\-]\s*(\d{1,2})").expect("Hardcode regex pattern")
});

/// Month and day read from a header token, before the year is applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    /// Resolves to a calendar date, None if the day does not exist in that year.
    pub fn with_year(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

/// Date-token recognisers, tried in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DateMatcher {
    /// `2025-07-11`; the year in the token is ignored
    IsoDate,
    /// `7월 11일`, `07월11일`
    KoreanMonthDay,
    /// `07/11`, `7-11`
    NumericMonthDay,
}

impl DateMatcher {
    /// Priority order used by [`parse_date_token`].
    pub const ALL: [DateMatcher; 3] = [Self::IsoDate, Self::KoreanMonthDay, Self::NumericMonthDay];

    /// Attempts to read a `(month, day)` pair from the text.
    pub fn parse(&self, text: &str) -> Option<MonthDay> {
        let (pattern, month_group) = match self {
            Self::IsoDate => (&*ISO_DATE_PATTERN, 2),
            Self::KoreanMonthDay => (&*KOREAN_MONTH_DAY_PATTERN, 1),
            Self::NumericMonthDay => (&*NUMERIC_MONTH_DAY_PATTERN, 1),
        };
        let captures = pattern.captures(text)?;
        let month = captures.get(month_group)?.as_str().parse().ok()?;
        let day = captures.get(month_group + 1)?.as_str().parse().ok()?;
        Some(MonthDay { month, day })
    }
}

/// Reads the first date token in the text that forms a real date in `year`.
pub fn parse_date_token(text: &str, year: i32) -> Option<NaiveDate> {
    DateMatcher::ALL
        .iter()
        .find_map(|matcher| matcher.parse(text).and_then(|month_day| month_day.with_year(year)))
}

/// Column → calendar date mapping for one table.
///
/// Columns between two date labels inherit the preceding date, which models
/// merged header cells. Columns before the first label have no date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateIndex {
    dates: Vec<Option<NaiveDate>>,
}

impl DateIndex {
    /// Scans `date_row` left to right, carrying the last recognised date forward.
    pub fn build(grid: &Grid, date_row: Option<usize>, year: i32) -> Self {
        let Some(record) = date_row.and_then(|row| grid.row(row)) else {
            return Self::default();
        };
        let mut current = None;
        let dates = record
            .iter()
            .map(|text| {
                if let Some(date) = parse_date_token(text, year) {
                    current = Some(date);
                }
                current
            })
            .collect();
        Self { dates }
    }

    /// Date of the column, None if no date label precedes it.
    pub fn get(&self, col: usize) -> Option<NaiveDate> {
        self.dates.get(col).copied().flatten()
    }

    /// ISO `YYYY-MM-DD` form of the column's date.
    pub fn iso(&self, col: usize) -> Option<String> {
        self.get(col).map(|date| date.format("%Y-%m-%d").to_string())
    }
}
