//! OCR collaborator: turn an image file into recognised text.
//!
//! The [`OcrEngine`] trait is the seam between the extraction stage and
//! whatever does the recognising. [`OcrSpaceEngine`] talks to OCR.space (or
//! a compatible endpoint) over HTTP; tests plug in scripted engines.
//!
//! Engines report failures as [`OcrError`]. The extraction stage never
//! propagates them: every failure ends in the size-band fallback.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why an OCR call produced no usable text.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR API request failed: {status}")]
    Status { status: u16 },

    #[error("OCR reply was not valid JSON: {0}")]
    Decode(String),

    #[error("OCR processing error: {0}")]
    Processing(String),

    #[error("no readable text detected")]
    NoText,
}

/// Recognises text in an image stored on disk.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Recognise the text in `image`. Must return [`OcrError::NoText`]
    /// rather than an empty string.
    async fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// OCR.space HTTP engine.
pub struct OcrSpaceEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl OcrSpaceEngine {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl OcrEngine for OcrSpaceEngine {
    fn name(&self) -> &str {
        "ocr.space"
    }

    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let bytes = tokio::fs::read(image).await?;
        let (mime, filetype) = sniff_format(&bytes);
        let data_uri = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
        debug!("OCR upload: {} bytes as {}", bytes.len(), filetype);

        let form = [
            ("apikey", self.api_key.as_str()),
            ("base64Image", data_uri.as_str()),
            ("language", "eng"),
            ("isOverlayRequired", "false"),
            ("filetype", filetype),
            ("detectOrientation", "true"),
            ("scale", "true"),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    OcrError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                OcrError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                OcrError::Request(e.to_string())
            }
        })?;

        parse_reply(&body)
    }
}

/// OCR.space reply body; only the fields the pipeline reads.
#[derive(Debug, Deserialize)]
struct OcrSpaceReply {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: Option<String>,
}

/// Decode an OCR.space reply body into recognised text.
///
/// Parsed regions are joined with a single space and trimmed.
pub fn parse_reply(body: &str) -> Result<String, OcrError> {
    let reply: OcrSpaceReply =
        serde_json::from_str(body).map_err(|e| OcrError::Decode(e.to_string()))?;

    if reply.is_errored {
        let msg = match reply.error_message {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        };
        return Err(OcrError::Processing(msg));
    }

    let text = reply
        .parsed_results
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.parsed_text.unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim();

    if text.is_empty() {
        Err(OcrError::NoText)
    } else {
        Ok(text.to_string())
    }
}

/// Pick the data-URI MIME type and OCR.space `filetype` for an image.
///
/// Unknown formats are sent as PNG.
pub fn sniff_format(bytes: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => ("image/jpeg", "JPG"),
        Ok(ImageFormat::Png) | Err(_) => ("image/png", "PNG"),
        Ok(other) => {
            debug!("Unexpected image format {:?}; sending as PNG", other);
            ("image/png", "PNG")
        }
    }
}
