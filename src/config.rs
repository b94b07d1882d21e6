//! Configuration types for content analysis.
//!
//! All pipeline behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. The config is resolved once at process start
//! and shared read-only by every request; nothing in it is mutated while an
//! analysis runs.
//!
//! Secrets (the OpenRouter and OCR.space keys) are plain fields supplied by
//! the caller. No key is compiled into the crate.

use crate::credentials::{resolve_api_key, Credential};
use crate::error::AnalyzeError;
use crate::pipeline::llm::{ChatTransport, RetryPolicy};
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default OCR.space endpoint.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Default OpenRouter chat-completions endpoint.
pub const DEFAULT_ENRICHMENT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model fallback list.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528:free";

/// Configuration for an analysis run.
///
/// Built via [`AnalysisConfig::builder()`] or using [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_content_analyzer::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .models(["deepseek/deepseek-r1-0528:free", "meta-llama/llama-3.3-70b-instruct:free"])
///     .max_attempts(3)
///     .api_key("sk-or-...")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Largest accepted upload in bytes. Default: 10 MiB.
    pub max_file_size: u64,

    /// OCR.space-compatible endpoint. Default: [`DEFAULT_OCR_ENDPOINT`].
    pub ocr_endpoint: String,

    /// OCR.space API key. When `None` the OCR call is skipped and images go
    /// straight to the size-band fallback.
    pub ocr_api_key: Option<String>,

    /// Per-OCR-call timeout in seconds. Default: 30.
    pub ocr_timeout_secs: u64,

    /// OpenAI-compatible chat-completions endpoint. Default: OpenRouter.
    pub enrichment_endpoint: String,

    /// Model identifiers tried in order, one per attempt. When there are
    /// fewer models than attempts the last one is reused. Never empty.
    pub models: Vec<String>,

    /// Total enrichment attempts, including the first. Default: 3.
    pub max_attempts: u32,

    /// Base backoff after a 429, doubled each attempt. Default: 800.
    ///
    /// With the defaults the waits are 800 ms, then 1.6 s.
    pub retry_backoff_ms: u64,

    /// Per-enrichment-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Sampling temperature for the enrichment call. Default: 0.7.
    pub temperature: f32,

    /// Completion token limit for the enrichment call. Default: 2000.
    pub max_tokens: u32,

    /// Explicit API credential. Checked before the environment.
    pub api_key: Option<String>,

    /// dotenv-style files searched for `OPENROUTER_API_KEY`, in order.
    /// Default: `[".env.local"]`.
    pub credential_files: Vec<PathBuf>,

    /// Last-resort credential injected by the host at start-up.
    pub inline_api_key: Option<String>,

    /// Sent as `HTTP-Referer`. Default: `http://localhost:3002`.
    pub site_url: String,

    /// Sent as `X-Title`. Default: `Content Analyzer AI`.
    pub app_title: String,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Turn an enrichment failure into `Err` instead of a placeholder. Default: false.
    pub strict_enrichment: bool,

    /// Pre-constructed OCR engine. Takes precedence over the HTTP engine.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Pre-constructed chat transport. Takes precedence over the HTTP transport.
    pub transport: Option<Arc<dyn ChatTransport>>,

    /// Optional progress callback for stage events.
    pub progress_callback: Option<ProgressCallback>,

    /// Enrichment credential, resolved on first use and shared by clones.
    credential: Arc<OnceCell<Credential>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            ocr_api_key: None,
            ocr_timeout_secs: 30,
            enrichment_endpoint: DEFAULT_ENRICHMENT_ENDPOINT.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            max_attempts: 3,
            retry_backoff_ms: 800,
            api_timeout_secs: 60,
            temperature: 0.7,
            max_tokens: 2000,
            api_key: None,
            credential_files: vec![PathBuf::from(".env.local")],
            inline_api_key: None,
            site_url: "http://localhost:3002".to_string(),
            app_title: "Content Analyzer AI".to_string(),
            system_prompt: None,
            strict_enrichment: false,
            ocr_engine: None,
            transport: None,
            progress_callback: None,
            credential: Arc::default(),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("max_file_size", &self.max_file_size)
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_api_key", &self.ocr_api_key.as_ref().map(|_| "<redacted>"))
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("enrichment_endpoint", &self.enrichment_endpoint)
            .field("models", &self.models)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credential_files", &self.credential_files)
            .field("inline_api_key", &self.inline_api_key.as_ref().map(|_| "<redacted>"))
            .field("strict_enrichment", &self.strict_enrichment)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("transport", &self.transport.as_ref().map(|_| "<dyn ChatTransport>"))
            .field("credential", &self.credential.get().map(Credential::source))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the enrichment credential (see [`crate::credentials`]).
    ///
    /// The first successful lookup is kept: later calls, and every clone of
    /// this config, reuse it without touching the environment or dotenv
    /// files again. A failed lookup is not kept. Editing the key fields after
    /// the first success has no effect.
    ///
    /// # Errors
    /// [`AnalyzeError::CredentialMissing`] when no layer has a key.
    pub fn resolve_credential(&self) -> Result<&Credential, AnalyzeError> {
        self.credential.get_or_try_init(|| resolve_api_key(self))
    }

    /// The enrichment retry policy described by this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_endpoint = url.into();
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn enrichment_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.enrichment_endpoint = url.into();
        self
    }

    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn credential_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.credential_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn inline_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.inline_api_key = Some(key.into());
        self
    }

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_url = url.into();
        self
    }

    pub fn app_title(mut self, title: impl Into<String>) -> Self {
        self.config.app_title = title.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn strict_enrichment(mut self, v: bool) -> Self {
        self.config.strict_enrichment = v;
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzeError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(AnalyzeError::InvalidConfig(
                "max_file_size must be ≥ 1 byte".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(AnalyzeError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.models.is_empty() || c.models.iter().any(|m| m.trim().is_empty()) {
            return Err(AnalyzeError::InvalidConfig(
                "models must list at least one non-empty model identifier".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(AnalyzeError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = AnalysisConfig::default();
        assert_eq!(c.max_file_size, 10 * 1024 * 1024);
        assert_eq!(c.ocr_timeout_secs, 30);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_backoff_ms, 800);
        assert_eq!(c.models, vec![DEFAULT_MODEL.to_string()]);
        assert!(!c.strict_enrichment);
    }

    #[test]
    fn builder_rejects_empty_models() {
        let err = AnalysisConfig::builder()
            .models(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn credential_is_resolved_once_and_shared() {
        let config = AnalysisConfig::builder()
            .api_key("sk-first")
            .credential_files(Vec::<PathBuf>::new())
            .build()
            .unwrap();
        assert_eq!(config.resolve_credential().unwrap().secret(), "sk-first");

        let mut copy = config.clone();
        copy.api_key = Some("sk-second".into());
        assert_eq!(copy.resolve_credential().unwrap().secret(), "sk-first");
        assert!(format!("{copy:?}").contains("Config"));
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        assert!(AnalysisConfig::builder().max_attempts(0).build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = AnalysisConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = AnalysisConfig::builder()
            .api_key("sk-or-secret")
            .ocr_api_key("ocr-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-or-secret"));
        assert!(!dbg.contains("ocr-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn retry_policy_follows_config() {
        let c = AnalysisConfig::builder()
            .max_attempts(5)
            .retry_backoff_ms(10)
            .build()
            .unwrap();
        let p = c.retry_policy();
        assert_eq!(p.max_attempts(), 5);
        assert_eq!(p.delay_for(2), Duration::from_millis(40));
    }
}
