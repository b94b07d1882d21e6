//! Enrichment orchestration: one prompt, a bounded number of chat calls.
//!
//! This module turns extracted text into the raw reply of a chat-completion
//! model. Parsing that reply is [`crate::pipeline::normalize`]'s job; prompt
//! wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! The upstream service is shared and rate-limited, so HTTP 429 is expected
//! and treated as transient: wait `retry_backoff_ms * 2^attempt`, then retry
//! with the next model in the fallback list (the last one is reused once the
//! list runs out). With the defaults (3 attempts, 800 ms) the waits are
//! 800 ms then 1.6 s. A call that hits the request timeout counts as a failed
//! attempt in the same way. Every other status, and every other transport
//! failure, ends the loop at once. Once attempts run out, any 429 seen along
//! the way is what gets reported, with its body.
//!
//! The HTTP side sits behind [`ChatTransport`] so the policy can be exercised
//! with scripted replies and no network.

use crate::config::AnalysisConfig;
use crate::credentials::Credential;
use crate::error::EnrichmentError;
use crate::pipeline::input::MediaKind;
use crate::prompts::{build_enrichment_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// HTTP status the upstream uses for rate limiting.
pub const RATE_LIMITED: u16 = 429;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(800))
    }
}

impl RetryPolicy {
    /// `max_attempts` is raised to 1 if zero.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failed attempt `attempt` (0-indexed): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Only rate limiting is worth retrying.
    pub fn is_retryable_status(status: u16) -> bool {
        status == RATE_LIMITED
    }

    /// Model for attempt `attempt` (0-indexed); the last model is reused.
    ///
    /// Returns `None` only for an empty list, which config validation rules out.
    pub fn model_for<'a>(&self, attempt: u32, models: &'a [String]) -> Option<&'a str> {
        let last = models.len().checked_sub(1)?;
        models
            .get((attempt as usize).min(last))
            .map(String::as_str)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Body of one chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

impl ChatRequest {
    fn new(model: &str, system: &str, prompt: &str, config: &AnalysisConfig) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

/// Status and body of an upstream reply, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub status: u16,
    pub body: String,
}

/// The request never produced a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

/// Sends one chat request and returns the raw reply.
///
/// Non-2xx statuses are replies, not errors: the orchestrator decides what
/// they mean.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest, api_key: &str) -> Result<ChatReply, TransportError>;
}

/// OpenRouter (or any OpenAI-compatible) chat-completions endpoint.
pub struct OpenRouterTransport {
    client: reqwest::Client,
    endpoint: String,
    site_url: String,
    app_title: String,
}

impl OpenRouterTransport {
    pub fn new(
        endpoint: impl Into<String>,
        site_url: impl Into<String>,
        app_title: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            site_url: site_url.into(),
            app_title: app_title.into(),
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, TransportError> {
        Self::new(
            config.enrichment_endpoint.clone(),
            config.site_url.clone(),
            config.app_title.clone(),
            Duration::from_secs(config.api_timeout_secs),
        )
    }
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl ChatTransport for OpenRouterTransport {
    async fn send(&self, request: &ChatRequest, api_key: &str) -> Result<ChatReply, TransportError> {
        let body =
            serde_json::to_vec(request).map_err(|e| TransportError::Network(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.app_title)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest)?;
        Ok(ChatReply { status, body })
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Ask the model for an enrichment of `text` and return its raw reply.
///
/// Attempts, backoff and model fallback follow [`AnalysisConfig::retry_policy`].
/// The returned string is the first choice's message content, unparsed.
pub async fn request_enrichment(
    transport: &dyn ChatTransport,
    credential: &Credential,
    text: &str,
    file_name: &str,
    kind: MediaKind,
    config: &AnalysisConfig,
) -> Result<String, EnrichmentError> {
    let policy = config.retry_policy();
    let timeout = Duration::from_secs(config.api_timeout_secs);
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let prompt = build_enrichment_prompt(text, file_name, kind);
    let progress = config.progress_callback.as_ref();

    // Body of the most recent 429; kept even when later attempts time out.
    let mut rate_limit_body: Option<String> = None;

    for attempt in 0..policy.max_attempts() {
        let model = policy
            .model_for(attempt, &config.models)
            .unwrap_or(crate::config::DEFAULT_MODEL);
        debug!(
            "{}: enrichment attempt {}/{} with {}",
            file_name,
            attempt + 1,
            policy.max_attempts(),
            model
        );
        if let Some(cb) = progress {
            cb.on_enrichment_attempt(file_name, attempt + 1, model);
        }

        let request = ChatRequest::new(model, system, &prompt, config);
        let outcome = tokio::time::timeout(timeout, transport.send(&request, credential.secret()))
            .await
            .unwrap_or(Err(TransportError::Timeout));

        let status = match outcome {
            Ok(reply) if (200..300).contains(&reply.status) => {
                info!("{}: enrichment reply from {}", file_name, model);
                return completion_content(&reply.body);
            }
            Ok(reply) if RetryPolicy::is_retryable_status(reply.status) => {
                rate_limit_body = Some(reply.body);
                reply.status
            }
            Ok(reply) => {
                warn!("{}: enrichment failed with status {}", file_name, reply.status);
                return Err(EnrichmentError::Upstream {
                    status: reply.status,
                    body: reply.body,
                });
            }
            Err(TransportError::Timeout) => 0,
            Err(TransportError::Network(detail)) => {
                warn!("{}: enrichment request failed: {}", file_name, detail);
                return Err(EnrichmentError::Network { detail });
            }
        };

        if attempt + 1 < policy.max_attempts() {
            let delay = policy.delay_for(attempt);
            let delay_ms = delay.as_millis() as u64;
            if status == 0 {
                warn!(
                    "{}: enrichment timed out, retrying in {}ms (attempt {}/{})",
                    file_name,
                    delay_ms,
                    attempt + 1,
                    policy.max_attempts()
                );
            } else {
                warn!(
                    "{}: rate limited ({}), retrying in {}ms (attempt {}/{})",
                    file_name,
                    status,
                    delay_ms,
                    attempt + 1,
                    policy.max_attempts()
                );
            }
            if let Some(cb) = progress {
                cb.on_enrichment_retry(file_name, attempt + 1, delay_ms, status);
            }
            sleep(delay).await;
        }
    }

    let err = match rate_limit_body {
        Some(body) => EnrichmentError::RetriesExhausted {
            attempts: policy.max_attempts(),
            status: RATE_LIMITED,
            body,
        },
        None => EnrichmentError::Timeout {
            secs: config.api_timeout_secs,
        },
    };
    warn!("{}: {}", file_name, err);
    Err(err)
}

/// `choices[0].message.content` of a completion body.
fn completion_content(body: &str) -> Result<String, EnrichmentError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| EnrichmentError::EmptyCompletion)?;
    value
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .ok_or(EnrichmentError::EmptyCompletion)
}
