//! # OCR Payload Module
//!
//! Wire types of the table-detection OCR response and the flattening step
//! that turns nested text lines and words into one string per cell.
//!
//! Only the first table of the first image is used: a schedule photo holds a
//! single table.
use crate::schedule::cell::TableCell;
use crate::schedule::date::DateMatcher;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub mod clova;

/// Errors raised while talking to the OCR service or reading its payload.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("Malformed OCR payload: {0}")]
    PayloadError(#[from] serde_json::Error),
}

/// Top level of the OCR response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrImage {
    #[serde(default)]
    pub name: Option<String>,
    /// `SUCCESS` or a failure code
    #[serde(default)]
    pub infer_result: Option<String>,
    #[serde(default)]
    pub tables: Vec<OcrTable>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrTable {
    #[serde(default)]
    pub cells: Vec<OcrCell>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCell {
    pub row_index: usize,
    pub column_index: usize,
    #[serde(default)]
    pub cell_text_lines: Vec<OcrTextLine>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrTextLine {
    #[serde(default)]
    pub cell_words: Vec<OcrWord>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrWord {
    #[serde(default)]
    pub infer_text: String,
}

impl OcrCell {
    /// Joins every word of every line with single spaces.
    pub fn text(&self) -> String {
        self.cell_text_lines
            .iter()
            .flat_map(|line| line.cell_words.iter())
            .map(|word| word.infer_text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_owned()
    }
}

impl OcrResponse {
    /// Reads a raw JSON payload.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, OcrError> {
        Ok(Self::deserialize(value)?)
    }

    /// Cells of the first table, empty when no table was detected.
    pub fn table_cells(&self) -> Vec<TableCell> {
        self.images
            .first()
            .and_then(|image| image.tables.first())
            .map(|table| {
                table.cells
                    .iter()
                    .map(|cell| TableCell::new(cell.row_index, cell.column_index, cell.text()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Counts logged before handing a payload to the generative model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PayloadSummary {
    pub cells: usize,
    pub date_cells: usize,
    pub target_cells: usize,
}

impl PayloadSummary {
    pub fn scan(response: &OcrResponse, name: &str) -> Self {
        let cells = response.table_cells();
        Self {
            cells: cells.len(),
            date_cells: cells
                .iter()
                .filter(|cell| DateMatcher::ALL.iter().any(|matcher| matcher.parse(&cell.text).is_some()))
                .count(),
            target_cells: cells
                .iter()
                .filter(|cell| !name.is_empty() && cell.text.contains(name))
                .count(),
        }
    }
}
