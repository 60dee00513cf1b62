use thiserror::Error;

/// Main error type for the roster crate.
/// Aggregates errors from the collaborator clients, configuration and the extractor facade.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("{0}")]
    WithContextError(String),

    // Collaborator errors
    #[error("{0}")]
    OcrError(#[from] crate::ocr::OcrError),

    #[error("{0}")]
    GenerativeError(#[from] crate::generative::GenerativeError),

    // Service set-up errors
    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    ExtractorError(#[from] crate::extractor::ExtractorError),
}

pub trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RosterError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| RosterError::WithContextError(format!("{}: {}", message, e)))
    }
}
