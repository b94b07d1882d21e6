//! Progress-callback trait for per-stage analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! events as a document moves through extraction, scoring and enrichment.
//! The CLI uses it to drive a spinner; a web host can forward the events to
//! a socket or simply ignore them.
//!
//! # Example
//!
//! ```rust
//! use edgequake_content_analyzer::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RetryCounter(AtomicUsize);
//!
//! impl AnalysisProgressCallback for RetryCounter {
//!     fn on_enrichment_retry(&self, _name: &str, _attempt: u32, _delay_ms: u64, _status: u16) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(RetryCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::extract::ExtractionMethod;
use std::sync::Arc;

/// Called by the pipeline as it processes a document.
///
/// Implementations must be `Send + Sync`: batch analysis runs several
/// documents concurrently and they share one callback. All methods have
/// no-op defaults.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the upload passed validation.
    fn on_analysis_start(&self, name: &str, size: u64, enrich: bool) {
        let _ = (name, size, enrich);
    }

    /// Called when extraction produced its text.
    fn on_extraction_complete(&self, name: &str, method: ExtractionMethod, chars: usize) {
        let _ = (name, method, chars);
    }

    /// Called just before each enrichment request is sent.
    ///
    /// `attempt` is 1-indexed.
    fn on_enrichment_attempt(&self, name: &str, attempt: u32, model: &str) {
        let _ = (name, attempt, model);
    }

    /// Called when a failed attempt is about to be retried.
    ///
    /// `status` is the upstream HTTP status, or 0 when the attempt timed out.
    fn on_enrichment_retry(&self, name: &str, attempt: u32, delay_ms: u64, status: u16) {
        let _ = (name, attempt, delay_ms, status);
    }

    /// Called once the result has been assembled.
    ///
    /// `enriched` is false when enrichment was skipped or fell back to the
    /// placeholder.
    fn on_analysis_complete(&self, name: &str, enriched: bool) {
        let _ = (name, enriched);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
