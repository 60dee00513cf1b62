//! # Extractor Facade
//!
//! Selects between the deterministic grid pipeline and the generative path,
//! and chains the OCR call in front of either one.
use crate::config::Config;
use crate::error::ResultMessage;
use crate::error::RosterError;
use crate::generative::gemini::GeminiClient;
use crate::generative::retry::CancelFlag;
use crate::generative::retry::ModelExtractor;
use crate::generative::retry::RetryPolicy;
use crate::generative::GenerativeClient;
use crate::generative::SamplingParams;
use crate::ocr::clova::ClovaOcrClient;
use crate::ocr::OcrResponse;
use crate::schedule::extract_shifts;
use crate::schedule::ExtractionOptions;
use crate::schedule::ShiftRecord;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing::warn;

/// Errors building or driving the extractor.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("OCR service is not configured")]
    OcrNotConfigured,

    #[error("Generative mode requires a configured generative client")]
    ModelNotConfigured,
}

/// Which extraction path a caller selects.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Deterministic grid parsing
    #[default]
    Grid,
    /// Generative model with retries
    Generative,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "grid" | "deterministic" => Ok(Self::Grid),
            "generative" | "llm" | "gemini" => Ok(Self::Generative),
            _ => Err(format!("unknown extraction mode '{value}'. Valid options: grid, generative")),
        }
    }
}

impl Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::Generative => write!(f, "generative"),
        }
    }
}

/// Extraction path with the collaborator it needs.
#[derive(Clone)]
enum Strategy {
    Grid,
    Generative {
        client: Arc<dyn GenerativeClient>,
        params: SamplingParams,
        policy: RetryPolicy,
    },
}

/// Entry point for turning an OCR payload or a photo into shifts.
#[derive(Clone)]
pub struct Extractor {
    strategy: Strategy,
    options: ExtractionOptions,
    ocr: Option<ClovaOcrClient>,
}

impl Extractor {
    /// Deterministic extractor without an OCR client.
    pub fn grid(options: ExtractionOptions) -> Self {
        Self {
            strategy: Strategy::Grid,
            options,
            ocr: None,
        }
    }

    /// Generative extractor around an injected client.
    pub fn generative(
        options: ExtractionOptions,
        client: Arc<dyn GenerativeClient>,
        params: SamplingParams,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            strategy: Strategy::Generative { client, params, policy },
            options,
            ocr: None,
        }
    }

    /// Attaches the OCR client used by [`Extractor::scan_image`].
    pub fn with_ocr(mut self, ocr: ClovaOcrClient) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Builds the extractor and its HTTP clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self, RosterError> {
        let options = ExtractionOptions::for_year(config.year);
        let extractor = match config.mode {
            ExtractionMode::Grid => Self::grid(options),
            ExtractionMode::Generative => {
                let gemini = config.gemini.as_ref().ok_or(ExtractorError::ModelNotConfigured)?;
                let client = GeminiClient::new(gemini.endpoint.clone(), &gemini.model, gemini.api_key.expose().to_owned());
                Self::generative(options, Arc::new(client), config.sampling, config.retry.clone())
            }
        };
        let extractor = match &config.ocr {
            Some(ocr) => {
                let client = ClovaOcrClient::new(ocr.url.clone(), ocr.secret.expose().to_owned(), config.retry.request_timeout)?;
                extractor.with_ocr(client)
            }
            None => extractor,
        };
        info!(mode = %extractor.mode(), year = config.year, ocr = extractor.ocr.is_some(), "Extractor ready");
        Ok(extractor)
    }

    pub fn mode(&self) -> ExtractionMode {
        match self.strategy {
            Strategy::Grid => ExtractionMode::Grid,
            Strategy::Generative { .. } => ExtractionMode::Generative,
        }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extracts shifts from a raw OCR payload. Never fails: nothing found is an empty list.
    pub async fn extract(&self, payload: &serde_json::Value, name: &str) -> Vec<ShiftRecord> {
        self.extract_with_cancel(payload, name, None).await
    }

    /// Like [`Extractor::extract`], stopping generative retries once `cancel` is set.
    pub async fn extract_with_cancel(
        &self,
        payload: &serde_json::Value,
        name: &str,
        cancel: Option<CancelFlag>,
    ) -> Vec<ShiftRecord> {
        match &self.strategy {
            Strategy::Grid => match OcrResponse::from_value(payload) {
                Ok(response) => extract_shifts(&response.table_cells(), name, &self.options),
                Err(error) => {
                    warn!(%error, "Unreadable OCR payload, no shifts extracted");
                    Vec::new()
                }
            },
            Strategy::Generative { client, params, policy } => {
                let mut extractor = ModelExtractor::new(client.as_ref())
                    .with_params(*params)
                    .with_policy(policy.clone());
                if let Some(cancel) = cancel {
                    extractor = extractor.with_cancel(cancel);
                }
                extractor.extract(payload, name, self.options.year).await
            }
        }
    }

    /// Runs OCR on a photo and extracts the named person's shifts.
    ///
    /// Unlike extraction, a failed OCR call is an error: there is no table to read.
    pub async fn scan_image(&self, image: &[u8], format: &str, name: &str) -> Result<Vec<ShiftRecord>, RosterError> {
        let ocr = self.ocr.as_ref().ok_or(ExtractorError::OcrNotConfigured)?;
        let payload = ocr
            .recognize(image, format)
            .await
            .map_err(RosterError::from)
            .with_prefix("Scan schedule image")?;
        Ok(self.extract(&payload, name).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::GenerativeError;
    use crate::ocr::tests::payload;
    use crate::ocr::tests::serve_once;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct FixedReply {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeClient for FixedReply {
        async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String, GenerativeError> {
            assert!(prompt.contains("김씨"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_owned())
        }
    }

    fn schedule_payload() -> serde_json::Value {
        payload(&[
            (0, 0, "날짜"), (0, 1, "07월 07일"), (0, 2, "07월 08일"),
            (1, 0, "포지션"), (1, 1, "A"), (1, 2, "B"),
            (2, 0, "09:00"), (2, 1, "김씨 17:00"),
            (3, 0, "총 인원"),
        ])
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("grid".parse::<ExtractionMode>().unwrap(), ExtractionMode::Grid);
        assert_eq!("GENERATIVE".parse::<ExtractionMode>().unwrap(), ExtractionMode::Generative);
        assert_eq!(ExtractionMode::Generative.to_string(), "generative");
        assert!("ocr".parse::<ExtractionMode>().is_err());
    }

    #[tokio::test]
    async fn grid_extraction_from_payload() {
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025));
        let records = extractor.extract(&schedule_payload(), "김씨").await;

        assert_eq!(records, vec![ShiftRecord {
            date: "2025-07-07".to_owned(),
            start: "09:00".to_owned(),
            end: "17:00".to_owned(),
            title: "A".to_owned(),
        }]);
    }

    #[tokio::test]
    async fn grid_extraction_of_malformed_payload() {
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025));

        assert!(extractor.extract(&serde_json::json!({ "images": 3 }), "김씨").await.is_empty());
        assert!(extractor.extract(&serde_json::json!({ "images": [] }), "김씨").await.is_empty());
    }

    #[tokio::test]
    async fn grid_extraction_ignores_out_of_range_indices() {
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025));
        let mut value = schedule_payload();
        let cells = value["images"][0]["tables"][0]["cells"].as_array_mut().unwrap();
        cells.push(serde_json::json!({ "rowIndex": u64::MAX, "columnIndex": 0 }));
        cells.push(serde_json::json!({ "rowIndex": 10_000_000u64, "columnIndex": 10_000u64 }));

        let records = extractor.extract(&value, "김씨").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end, "17:00");

        let huge = payload(&[(usize::MAX, usize::MAX, "김씨")]);
        assert!(extractor.extract(&huge, "김씨").await.is_empty());
    }

    #[tokio::test]
    async fn scan_image_runs_ocr_then_grid() {
        let url = serve_once("200 OK", schedule_payload().to_string()).await;
        let ocr = ClovaOcrClient::new(url, "secret".to_owned(), Duration::from_secs(5)).unwrap();
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025)).with_ocr(ocr);
        let records = extractor.scan_image(&[0u8; 4], "jpg", "김씨").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "A");
    }

    #[tokio::test]
    async fn scan_image_service_failure_is_prefixed_error() {
        let url = serve_once("500 Internal Server Error", r#"{"message": "down"}"#).await;
        let ocr = ClovaOcrClient::new(url, "secret".to_owned(), Duration::from_secs(5)).unwrap();
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025)).with_ocr(ocr);
        let error = extractor.scan_image(&[0u8; 4], "jpg", "김씨").await.unwrap_err();

        assert!(error.to_string().starts_with("Scan schedule image: OCR service returned 500"));
    }

    #[tokio::test]
    async fn generative_extraction_uses_injected_client() {
        let client = Arc::new(FixedReply {
            reply: r#"[{"date": "2025-07-07", "start": "09:00", "end": "17:00", "title": "A"}]"#,
            calls: AtomicUsize::new(0),
        });
        let extractor = Extractor::generative(
            ExtractionOptions::for_year(2025),
            client.clone(),
            SamplingParams::default(),
            RetryPolicy::default(),
        );
        let records = extractor.extract(&schedule_payload(), "김씨").await;

        assert_eq!(extractor.mode(), ExtractionMode::Generative);
        assert_eq!(records.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scan_without_ocr_client_fails() {
        let extractor = Extractor::grid(ExtractionOptions::for_year(2025));
        let result = extractor.scan_image(&[0u8; 4], "jpg", "김씨").await;

        assert!(matches!(result, Err(RosterError::ExtractorError(ExtractorError::OcrNotConfigured))));
    }

    #[test]
    fn from_config_builds_clients() {
        let source: HashMap<String, String> = [
            ("CLOVA_URL", "https://ocr.example.com/general"),
            ("CLOVA_SECRET", "secret"),
            ("GEMINI_API_KEY", "key"),
            ("ROSTER_MODE", "generative"),
            ("ROSTER_YEAR", "2024"),
        ]
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        let config = Config::from_source(&source).unwrap();
        let extractor = Extractor::from_config(&config).unwrap();

        assert_eq!(extractor.mode(), ExtractionMode::Generative);
        assert_eq!(extractor.options().year, 2024);
        assert!(extractor.ocr.is_some());
    }
}
