//! # edgequake-content-analyzer
//!
//! Analyse social-media content in PDFs and images: extract the text, score
//! it with deterministic heuristics, and optionally ask a language model for
//! a strategic assessment.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / PNG / JPEG)
//!  │
//!  ├─ 1. Input      media kind + size checks
//!  ├─ 2. Extract    OCR for images, size-band note for PDFs and OCR failures
//!  ├─ 3. Score      word/character counts, readability, ordered tips
//!  ├─ 4. Enrich     (optional) chat completion with 429 retry + model fallback
//!  ├─ 5. Normalize  any model reply → fixed, total schema
//!  └─ 6. Result     one AnalysisResult, JSON-ready
//! ```
//!
//! Upstream trouble never turns into a failed call by itself: OCR outages
//! fall back to the size band, and enrichment failures leave a labelled
//! placeholder plus the reason. Only bad input and a missing API key are
//! returned as errors (see [`ErrorStatus`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_content_analyzer::{analyze_file, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from OPENROUTER_API_KEY or .env.local
//!     let config = AnalysisConfig::builder()
//!         .ocr_api_key(std::env::var("OCR_SPACE_API_KEY").unwrap_or_default())
//!         .build()?;
//!     let result = analyze_file("flyer.png", true, &config).await?;
//!     println!("{} words, readability {}", result.analysis.word_count,
//!         result.analysis.readability_score);
//!     for tip in &result.analysis.suggestions {
//!         println!("- {tip}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `content-analyzer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-content-analyzer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync, write_report};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use credentials::{Credential, CredentialSource};
pub use error::{AnalyzeError, EnrichmentError, ErrorStatus};
pub use output::{
    AnalysisReport, AnalysisResult, EnrichmentResult, HeuristicAnalysis, PlatformRecommendations,
};
pub use pipeline::extract::{ExtractionMethod, SizeBand};
pub use pipeline::input::{MediaKind, SourceDocument};
pub use pipeline::llm::{ChatReply, ChatRequest, ChatTransport, RetryPolicy, TransportError};
pub use pipeline::normalize::normalize_reply;
pub use pipeline::ocr::{OcrEngine, OcrError};
pub use pipeline::score::score;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{analyze_stream, AnalysisItem, AnalysisStream};
