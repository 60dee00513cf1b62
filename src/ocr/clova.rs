use crate::ocr::OcrError;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// Header carrying the OCR secret.
const SECRET_HEADER: &str = "X-OCR-SECRET";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    version: &'a str,
    request_id: String,
    timestamp: i64,
    enable_table_detection: bool,
    lang: &'a str,
    images: Vec<RecognizeImage<'a>>,
}

#[derive(Debug, Serialize)]
struct RecognizeImage<'a> {
    name: &'a str,
    format: &'a str,
    data: String,
}

/// HTTP client for the table-detecting OCR service.
#[derive(Debug, Clone)]
pub struct ClovaOcrClient {
    client: Client,
    url: Url,
    secret: String,
    lang: String,
}

impl ClovaOcrClient {
    pub fn new(url: Url, secret: String, timeout: Duration) -> Result<Self, OcrError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            secret,
            lang: "ko".to_owned(),
        })
    }

    /// Overrides the recognition language (default `ko`).
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_owned();
        self
    }

    /// Sends one image with table detection enabled and returns the raw payload.
    ///
    /// # Arguments
    /// * `image` - Encoded image bytes
    /// * `format` - Image format understood by the service (`jpg`, `png`, ...)
    pub async fn recognize(&self, image: &[u8], format: &str) -> Result<serde_json::Value, OcrError> {
        let request = RecognizeRequest {
            version: "V2",
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            enable_table_detection: true,
            lang: &self.lang,
            images: vec![RecognizeImage {
                name: "upload",
                format,
                data: base64::engine::general_purpose::STANDARD.encode(image),
            }],
        };
        debug!(request_id = %request.request_id, bytes = image.len(), "Sending OCR request");

        let response = self
            .client
            .post(self.url.clone())
            .header(SECRET_HEADER, &self.secret)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OcrError::ServiceError { status: status.as_u16(), message });
        }

        let payload = response.json::<serde_json::Value>().await?;
        info!(request_id = %request.request_id, "OCR response received");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::tests::serve_once;

    #[test]
    fn request_wire_format() {
        let request = RecognizeRequest {
            version: "V2",
            request_id: "id".to_owned(),
            timestamp: 1,
            enable_table_detection: true,
            lang: "ko",
            images: vec![RecognizeImage { name: "upload", format: "jpg", data: "AA==".to_owned() }],
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["requestId"], "id");
        assert_eq!(json["enableTableDetection"], true);
        assert_eq!(json["images"][0]["format"], "jpg");
    }

    #[tokio::test]
    async fn recognize_returns_payload() {
        let url = serve_once("200 OK", r#"{"images": []}"#).await;
        let client = ClovaOcrClient::new(url, "secret".to_owned(), Duration::from_secs(5)).unwrap();
        let payload = client.recognize(&[1, 2, 3], "jpg").await.unwrap();

        assert_eq!(payload, serde_json::json!({ "images": [] }));
    }

    #[tokio::test]
    async fn recognize_reports_service_failure() {
        let url = serve_once("401 Unauthorized", r#"{"code": "0002"}"#).await;
        let client = ClovaOcrClient::new(url, "wrong".to_owned(), Duration::from_secs(5)).unwrap();
        let result = client.recognize(&[1, 2, 3], "jpg").await;

        match result {
            Err(OcrError::ServiceError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("0002"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
