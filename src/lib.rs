//! # Rusty Roster
//!
//! Turns a photographed shift-schedule table into per-person shift records.
//!
//! ## Features
//!
//! - **Deterministic grid pipeline**: rebuilds the table grid from OCR cells, locates the
//!   date, position and time rows, and reads every cell that mentions the target person
//! - **Flexible date headers**: `07월 11일`, `7/11`, `07-11` and ISO dates, with merged
//!   header cells carried over to the following columns
//! - **Generative fallback**: sends the raw OCR payload to a text model and validates the
//!   JSON reply, retrying with perturbed sampling controls and backoff
//! - **OCR client**: table-detecting OCR over HTTP, chained in front of either path
//! - **Total extraction**: malformed payloads and failed model calls yield an empty list,
//!   never an error
//!
//! ## Entry points
//!
//! - [`extract_shifts`]: deterministic extraction from flattened table cells
//! - [`Extractor`]: mode selection from [`Config`], `extract` on a payload and `scan_image`
//!   on a photo
pub mod config;
pub mod error;
pub mod extractor;
pub mod generative;
pub mod ocr;
pub mod schedule;

pub use crate::config::Config;
pub use crate::error::RosterError;
pub use crate::extractor::ExtractionMode;
pub use crate::extractor::Extractor;
pub use crate::schedule::extract_shifts;
pub use crate::schedule::ExtractionOptions;
pub use crate::schedule::ShiftRecord;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Embedding services that install their own subscriber skip this; calling it
/// twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
