//! Error types for the edgequake-content-analyzer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzeError`] — **Fatal**: the analysis cannot proceed at all
//!   (missing or oversized upload, unsupported media kind, no API
//!   credential). Returned as `Err(AnalyzeError)` from the top-level
//!   `analyze*` functions.
//!
//! * [`EnrichmentError`] — **Non-fatal**: the LLM enrichment step gave up
//!   after its retry policy, but extraction and heuristic scoring already
//!   succeeded. Stored inside [`crate::output::AnalysisResult`] next to a
//!   placeholder enrichment record so callers still get a usable result.
//!
//! Transient problems (OCR outage, HTTP 429) never reach either type: they
//! are absorbed by the size-band fallback and the retry policy respectively.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse category of a fatal error, for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// The caller sent something unusable (4xx-equivalent).
    BadInput,
    /// Configuration or infrastructure failure (5xx-equivalent).
    Internal,
}

impl ErrorStatus {
    /// The HTTP status code a web layer would answer with.
    pub fn http_code(self) -> u16 {
        match self {
            ErrorStatus::BadInput => 400,
            ErrorStatus::Internal => 500,
        }
    }
}

/// All fatal errors returned by the edgequake-content-analyzer library.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No file was supplied at all.
    #[error("No file provided")]
    NoFile,

    /// The upload contained zero bytes.
    #[error("File '{name}' is empty")]
    EmptyDocument { name: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Declared media type is outside the accepted set.
    #[error("Invalid file type '{declared}'. Only PDF and image files (PNG, JPEG) are supported.")]
    UnsupportedMediaType { declared: String },

    /// Upload exceeds the configured maximum size.
    #[error("File size must be less than {} (got {size} bytes)", size_limit(.max))]
    FileTooLarge { size: u64, max: u64 },

    // ── Enrichment errors ─────────────────────────────────────────────────
    /// Enrichment was requested but no API credential could be resolved.
    #[error("OpenRouter API key not configured.\n{hint}")]
    CredentialMissing { hint: String },

    /// Enrichment failed and the config asked for failures to be fatal.
    #[error("Deep analysis failed: {0}")]
    EnrichmentFailed(#[from] EnrichmentError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the JSON report.
    #[error("Failed to write report '{path}': {source}")]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzeError {
    /// Categorise the error as caller-fault or system-fault.
    pub fn status(&self) -> ErrorStatus {
        match self {
            AnalyzeError::NoFile
            | AnalyzeError::EmptyDocument { .. }
            | AnalyzeError::FileNotFound { .. }
            | AnalyzeError::PermissionDenied { .. }
            | AnalyzeError::UnsupportedMediaType { .. }
            | AnalyzeError::FileTooLarge { .. } => ErrorStatus::BadInput,
            AnalyzeError::CredentialMissing { .. }
            | AnalyzeError::EnrichmentFailed(_)
            | AnalyzeError::InvalidConfig(_)
            | AnalyzeError::ReportWriteFailed { .. }
            | AnalyzeError::Internal(_) => ErrorStatus::Internal,
        }
    }

    pub fn is_bad_input(&self) -> bool {
        self.status() == ErrorStatus::BadInput
    }
}

/// `10MB` for whole mebibytes and above, the byte count below that.
fn size_limit(max: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if *max >= MIB {
        format!("{}MB", max / MIB)
    } else {
        format!("{max} bytes")
    }
}

/// A non-fatal failure of the enrichment step.
///
/// Stored in [`crate::output::AnalysisResult::enrichment_error`] while the
/// enrichment slot itself holds a placeholder record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentError {
    /// Attempts ran out and at least one was rate-limited; `body` is the
    /// latest 429 body.
    #[error("OpenRouter API request failed after {attempts} attempts: {status} - {body}")]
    RetriesExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    /// Upstream answered with a non-retryable status.
    #[error("OpenRouter API request failed: {status} - {body}")]
    Upstream { status: u16, body: String },

    /// Attempts ran out on timeouts alone.
    #[error("OpenRouter API request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("OpenRouter API request could not be sent: {detail}")]
    Network { detail: String },

    /// A 2xx reply that carried no completion text.
    #[error("No analysis received from the model")]
    EmptyCompletion,

    /// Extraction produced no text, so there was nothing to enrich.
    #[error("No text provided for analysis")]
    NoText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = AnalyzeError::FileTooLarge {
            size: 11 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("10MB"), "got: {msg}");
        assert!(e.is_bad_input());
    }

    #[test]
    fn small_limit_shows_bytes() {
        let e = AnalyzeError::FileTooLarge {
            size: 2048,
            max: 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("less than 1024 bytes"), "got: {msg}");
        assert!(!msg.contains("0MB"), "got: {msg}");
    }

    #[test]
    fn credential_missing_is_internal() {
        let e = AnalyzeError::CredentialMissing {
            hint: "Set OPENROUTER_API_KEY".into(),
        };
        assert_eq!(e.status(), ErrorStatus::Internal);
        assert_eq!(e.status().http_code(), 500);
        assert!(e.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn unsupported_media_type_is_bad_input() {
        let e = AnalyzeError::UnsupportedMediaType {
            declared: "text/plain".into(),
        };
        assert_eq!(e.status().http_code(), 400);
        assert!(e.to_string().contains("text/plain"));
    }

    #[test]
    fn retries_exhausted_carries_last_body() {
        let e = EnrichmentError::RetriesExhausted {
            attempts: 3,
            status: 429,
            body: "slow down".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("slow down"));
        assert!(msg.contains("3 attempts"));
    }

    #[test]
    fn enrichment_error_wraps_into_fatal() {
        let e: AnalyzeError = EnrichmentError::EmptyCompletion.into();
        assert_eq!(e.status(), ErrorStatus::Internal);
    }
}
