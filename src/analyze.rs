//! Single-document analysis entry points and result aggregation.
//!
//! [`analyze`] is the one pipeline every caller goes through, whether it
//! wants the heuristic score only or the AI enrichment too: the `enrich`
//! flag is the only difference. Use [`crate::stream::analyze_stream`] to run
//! many files at once.

use crate::config::AnalysisConfig;
use crate::credentials::Credential;
use crate::error::{AnalyzeError, EnrichmentError};
use crate::output::{AnalysisReport, AnalysisResult, EnrichmentResult};
use crate::pipeline::extract::extract_text;
use crate::pipeline::input::{load_file, SourceDocument};
use crate::pipeline::llm::{request_enrichment, ChatTransport, OpenRouterTransport};
use crate::pipeline::normalize::normalize_reply;
use crate::pipeline::ocr::{OcrEngine, OcrSpaceEngine};
use crate::pipeline::score::score;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Analyse one uploaded document.
///
/// # Arguments
/// * `doc` — the upload; consumed by the pipeline
/// * `enrich` — also run the AI enrichment step
/// * `config` — analysis configuration
///
/// # Returns
/// `Ok(AnalysisResult)` whenever the input was acceptable. OCR failures
/// degrade to a size-band note and enrichment failures to a placeholder
/// record plus [`AnalysisResult::enrichment_error`], so both still return
/// `Ok`.
///
/// # Errors
/// - bad input: empty or oversized upload
/// - `CredentialMissing` when `enrich` is set and no API key resolves
/// - `EnrichmentFailed` when enrichment fails and `strict_enrichment` is set
pub async fn analyze(
    doc: SourceDocument,
    enrich: bool,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalyzeError> {
    let start = Instant::now();
    doc.validate(config.max_file_size)?;
    info!(
        "Analysing {} ({}, {} bytes, enrich={})",
        doc.name(),
        doc.kind(),
        doc.size(),
        enrich
    );

    // Credential and transport are settled before any network call.
    let enrichment = if enrich {
        let credential = config.resolve_credential()?;
        let transport = resolve_transport(config)?;
        Some((credential, transport))
    } else {
        None
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(doc.name(), doc.size(), enrich);
    }

    // ── Extract ──────────────────────────────────────────────────────────
    let engine = resolve_ocr_engine(config);
    let extraction = extract_text(
        &doc,
        engine.as_deref(),
        Duration::from_secs(config.ocr_timeout_secs),
    )
    .await;
    debug!("{}: extracted via {:?}", doc.name(), extraction.method);
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(doc.name(), extraction.method, extraction.text.chars().count());
    }

    // ── Score ────────────────────────────────────────────────────────────
    let analysis = score(&extraction.text);

    // ── Enrich ───────────────────────────────────────────────────────────
    let (deep_analysis, enrichment_error) = match enrichment {
        None => (None, None),
        Some((credential, transport)) => {
            match enrich_text(transport.as_ref(), credential, &extraction.text, &doc, config).await
            {
                Ok(result) => (Some(result), None),
                Err(e) if config.strict_enrichment => return Err(e.into()),
                Err(e) => {
                    warn!("{}: deep analysis unavailable: {}", doc.name(), e);
                    (Some(EnrichmentResult::unavailable()), Some(e))
                }
            }
        }
    };

    let enriched = deep_analysis.is_some() && enrichment_error.is_none();
    info!(
        "Analysis of {} complete: {} words, readability {}, enriched={}, {}ms",
        doc.name(),
        analysis.word_count,
        analysis.readability_score,
        enriched,
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(doc.name(), enriched);
    }

    Ok(AnalysisResult {
        extracted_text: extraction.text,
        analysis,
        file_type: doc.kind(),
        file_name: doc.name().to_string(),
        deep_analysis,
        enrichment_error,
    })
}

/// Load `path` from disk and analyse it.
///
/// The media kind comes from the file extension; the size limit is checked
/// before the file is read.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    enrich: bool,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalyzeError> {
    let doc = load_file(path.as_ref(), config.max_file_size).await?;
    analyze(doc, enrich, config).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    doc: SourceDocument,
    enrich: bool,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalyzeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(doc, enrich, config))
}

/// Write the downloadable JSON report for `result` to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_report(
    result: &AnalysisResult,
    path: impl AsRef<Path>,
) -> Result<(), AnalyzeError> {
    let path = path.as_ref();
    let report = AnalysisReport::from_result(result);
    let json = serde_json::to_vec_pretty(&report)
        .map_err(|e| AnalyzeError::Internal(format!("report serialisation: {e}")))?;

    let write_err = |e: std::io::Error| AnalyzeError::ReportWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Report written to {}", path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run the enrichment step over already-extracted text.
async fn enrich_text(
    transport: &dyn ChatTransport,
    credential: &Credential,
    text: &str,
    doc: &SourceDocument,
    config: &AnalysisConfig,
) -> Result<EnrichmentResult, EnrichmentError> {
    if text.trim().is_empty() {
        return Err(EnrichmentError::NoText);
    }
    let reply = request_enrichment(transport, credential, text, doc.name(), doc.kind(), config).await?;
    Ok(normalize_reply(&reply))
}

/// The configured OCR engine, else OCR.space when a key is set, else none.
fn resolve_ocr_engine(config: &AnalysisConfig) -> Option<Arc<dyn OcrEngine>> {
    if let Some(ref engine) = config.ocr_engine {
        return Some(Arc::clone(engine));
    }

    let key = config
        .ocr_api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())?;
    match OcrSpaceEngine::new(config.ocr_endpoint.clone(), key, config.ocr_timeout_secs) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            warn!("OCR engine unavailable: {}", e);
            None
        }
    }
}

/// The configured transport, else the OpenRouter HTTP transport.
fn resolve_transport(config: &AnalysisConfig) -> Result<Arc<dyn ChatTransport>, AnalyzeError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    let transport = OpenRouterTransport::from_config(config)
        .map_err(|e| AnalyzeError::Internal(format!("HTTP client: {e}")))?;
    Ok(Arc::new(transport))
}
