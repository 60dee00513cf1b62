//! # Generative Extraction Module
//!
//! Alternative extraction path: the raw OCR payload goes to a generative text
//! model together with extraction rules, and the model's JSON reply is
//! validated into [`ShiftRecord`](crate::schedule::ShiftRecord)s.
//!
//! The model is reached through the [`GenerativeClient`] trait so callers
//! pass in the handle they want (the HTTP client in production, a stub in
//! tests). Replies are sampled, so [`retry`] wraps the call in a bounded
//! loop that perturbs the sampling controls between attempts.
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod gemini;
pub mod prompt;
pub mod retry;

/// Failures of a single call to the generative endpoint.
#[derive(Error, Debug)]
pub enum GenerativeError {
    #[error("Generative request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Generative service returned {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("Generative service returned no text")]
    EmptyReply,

    #[error("Generative request timed out after {0} ms")]
    Timeout(u128),
}

/// Sampling controls sent with each prompt.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParams {
    /// 32-bit, as the endpoint's `generationConfig.seed` is an int32
    pub seed: i32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            temperature: 0.1,
            top_p: 0.8,
        }
    }
}

/// A text-completion endpoint.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Sends the prompt with the given sampling controls and returns the completion text.
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, GenerativeError>;
}
