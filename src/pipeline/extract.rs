//! Extraction strategy selection: document → best-effort text.
//!
//! Images go to the OCR collaborator; PDFs are classified by size alone. No
//! PDF parsing happens here: the "text" for a PDF is a size-band note about
//! what such a document is good for. Every OCR failure falls back to the same
//! kind of note, so extraction never fails.
//!
//! ## Temporary file
//!
//! OCR engines read from disk. The upload is written to a [`tempfile::NamedTempFile`]
//! owned by this function; the file is removed when it drops, which covers
//! success, OCR failure and cancellation of the surrounding future alike.

use crate::pipeline::input::{MediaKind, SourceDocument};
use crate::pipeline::ocr::{OcrEngine, OcrError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound (exclusive) of the small band, in bytes.
pub const SMALL_BAND_LIMIT: u64 = 100_000;

/// Upper bound (exclusive) of the medium band, in bytes.
pub const MEDIUM_BAND_LIMIT: u64 = 500_000;

/// Size bands used when no real text is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBand {
    Small,
    Medium,
    Large,
}

impl SizeBand {
    pub fn of(size: u64) -> Self {
        if size < SMALL_BAND_LIMIT {
            SizeBand::Small
        } else if size < MEDIUM_BAND_LIMIT {
            SizeBand::Medium
        } else {
            SizeBand::Large
        }
    }

    /// Suitability note for a document of this band and kind.
    pub fn message(self, kind: MediaKind) -> &'static str {
        match (kind, self) {
            (MediaKind::Pdf, SizeBand::Small) => {
                "This appears to be a concise PDF document. Small PDFs often contain focused content \
                 like quick tips, checklists, or brief reports. This type of content works well for \
                 social media when you want to share key points or create quick, digestible posts."
            }
            (MediaKind::Pdf, SizeBand::Medium) => {
                "Your PDF contains a well-structured document with moderate content. This is perfect \
                 for creating multiple social media posts or a content series. You could break this \
                 down into several engaging posts that build on each other."
            }
            (MediaKind::Pdf, SizeBand::Large) => {
                "This is a comprehensive document with substantial content! Large PDFs often contain \
                 detailed reports, whitepapers, or comprehensive guides. This material is excellent \
                 for creating a content strategy across multiple social media platforms over several \
                 weeks or months."
            }
            (MediaKind::Image, SizeBand::Small) => {
                "OCR processing failed, but I can see this is a small image. Small images often work \
                 well for quick social media updates and announcements."
            }
            (MediaKind::Image, SizeBand::Medium) => {
                "OCR processing failed, but this appears to be a medium-sized image. Medium images are \
                 great for Instagram posts and Twitter content."
            }
            (MediaKind::Image, SizeBand::Large) => {
                "OCR processing failed, but this appears to be a large image with substantial content. \
                 Large images work well for detailed posts on LinkedIn or Facebook."
            }
        }
    }
}

/// How the extracted text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Text recognised by the OCR collaborator.
    Ocr,
    /// Size-band note, because the document is a PDF or OCR failed.
    SizeHeuristic(SizeBand),
}

/// Text recovered from a document plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
}

impl Extraction {
    fn heuristic(doc: &SourceDocument) -> Self {
        let band = SizeBand::of(doc.size());
        Self {
            text: band.message(doc.kind()).to_string(),
            method: ExtractionMethod::SizeHeuristic(band),
        }
    }
}

/// Produce text for `doc`. Never fails.
///
/// `ocr` is `None` when no OCR engine is configured; images then go straight
/// to the size-band note. `timeout` bounds the OCR call regardless of engine.
pub async fn extract_text(
    doc: &SourceDocument,
    ocr: Option<&dyn OcrEngine>,
    timeout: Duration,
) -> Extraction {
    match doc.kind() {
        MediaKind::Pdf => {
            debug!("{}: PDF classified by size ({} bytes)", doc.name(), doc.size());
            Extraction::heuristic(doc)
        }
        MediaKind::Image => {
            let Some(engine) = ocr else {
                info!("{}: no OCR engine configured; using size heuristic", doc.name());
                return Extraction::heuristic(doc);
            };
            match run_ocr(doc, engine, timeout).await {
                Ok(text) => {
                    info!(
                        "{}: OCR via {} recovered {} chars",
                        doc.name(),
                        engine.name(),
                        text.chars().count()
                    );
                    Extraction {
                        text,
                        method: ExtractionMethod::Ocr,
                    }
                }
                Err(e) => {
                    warn!("{}: OCR failed ({}); using size heuristic", doc.name(), e);
                    Extraction::heuristic(doc)
                }
            }
        }
    }
}

/// Write the upload to a request-scoped temp file and run OCR on it.
async fn run_ocr(
    doc: &SourceDocument,
    engine: &dyn OcrEngine,
    timeout: Duration,
) -> Result<String, OcrError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("content-analyzer-")
        .suffix(&temp_suffix(doc.name()))
        .tempfile()?;
    tmp.write_all(doc.bytes())?;
    tmp.flush()?;

    let text = tokio::time::timeout(timeout, engine.recognize(tmp.path()))
        .await
        .map_err(|_| OcrError::Timeout {
            secs: timeout.as_secs(),
        })??;
    if text.trim().is_empty() {
        return Err(OcrError::NoText);
    }
    Ok(text)
}

/// Keep the upload's extension on the temp file; some engines sniff by name.
fn temp_suffix(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Records the path it was handed and whether the file existed at that time.
    struct RecordingOcr {
        reply: Result<&'static str, &'static str>,
        seen: Mutex<Option<(PathBuf, bool)>>,
    }

    impl RecordingOcr {
        fn new(reply: Result<&'static str, &'static str>) -> Self {
            Self {
                reply,
                seen: Mutex::new(None),
            }
        }

        fn seen(&self) -> (PathBuf, bool) {
            self.seen.lock().unwrap().clone().expect("engine was called")
        }
    }

    #[async_trait]
    impl OcrEngine for RecordingOcr {
        fn name(&self) -> &str {
            "recording"
        }

        async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
            *self.seen.lock().unwrap() = Some((image.to_path_buf(), image.exists()));
            match self.reply {
                Ok(t) => Ok(t.to_string()),
                Err(m) => Err(OcrError::Request(m.to_string())),
            }
        }
    }

    const SECS_30: Duration = Duration::from_secs(30);

    fn image(size: usize) -> SourceDocument {
        SourceDocument::new(vec![7u8; size], MediaKind::Image, "post.png")
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(SizeBand::of(0), SizeBand::Small);
        assert_eq!(SizeBand::of(99_999), SizeBand::Small);
        assert_eq!(SizeBand::of(100_000), SizeBand::Medium);
        assert_eq!(SizeBand::of(499_999), SizeBand::Medium);
        assert_eq!(SizeBand::of(500_000), SizeBand::Large);
    }

    #[test]
    fn band_messages_are_distinct() {
        for kind in [MediaKind::Pdf, MediaKind::Image] {
            let s = SizeBand::Small.message(kind);
            let m = SizeBand::Medium.message(kind);
            let l = SizeBand::Large.message(kind);
            assert_ne!(s, m);
            assert_ne!(m, l);
            assert_ne!(s, l);
        }
    }

    #[tokio::test]
    async fn pdf_uses_size_band_without_ocr() {
        let engine = RecordingOcr::new(Ok("never"));
        let doc = SourceDocument::new(vec![0u8; 600 * 1024], MediaKind::Pdf, "report.pdf");
        let out = extract_text(&doc, Some(&engine), SECS_30).await;
        assert_eq!(out.method, ExtractionMethod::SizeHeuristic(SizeBand::Large));
        assert!(out.text.contains("comprehensive document"));
        assert!(engine.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn image_ocr_success_and_temp_file_removed() {
        let engine = RecordingOcr::new(Ok("Launch day is here! Are you ready?"));
        let out = extract_text(&image(2048), Some(&engine), SECS_30).await;
        assert_eq!(out.method, ExtractionMethod::Ocr);
        assert_eq!(out.text, "Launch day is here! Are you ready?");

        let (path, existed) = engine.seen();
        assert!(existed, "temp file must exist while OCR runs");
        assert!(path.to_string_lossy().ends_with(".png"));
        assert!(!path.exists(), "temp file must be removed afterwards");
    }

    #[tokio::test]
    async fn image_ocr_outage_falls_back_to_small_band() {
        let engine = RecordingOcr::new(Err("connection refused"));
        let out = extract_text(&image(50 * 1024), Some(&engine), SECS_30).await;
        assert_eq!(out.method, ExtractionMethod::SizeHeuristic(SizeBand::Small));
        assert!(out.text.contains("small image"));

        let (path, _) = engine.seen();
        assert!(!path.exists(), "temp file must be removed on failure too");
    }

    #[tokio::test]
    async fn blank_ocr_text_falls_back() {
        let engine = RecordingOcr::new(Ok("   "));
        let out = extract_text(&image(200_000), Some(&engine), SECS_30).await;
        assert_eq!(out.method, ExtractionMethod::SizeHeuristic(SizeBand::Medium));
    }

    #[tokio::test]
    async fn no_engine_uses_size_band() {
        let out = extract_text(&image(10), None, SECS_30).await;
        assert_eq!(out.method, ExtractionMethod::SizeHeuristic(SizeBand::Small));
    }

    struct HangingOcr;

    #[async_trait]
    impl OcrEngine for HangingOcr {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn recognize(&self, _image: &Path) -> Result<String, OcrError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn hung_ocr_times_out_into_fallback() {
        let out = extract_text(&image(600_000), Some(&HangingOcr), Duration::from_millis(20)).await;
        assert_eq!(out.method, ExtractionMethod::SizeHeuristic(SizeBand::Large));
    }

    #[test]
    fn temp_suffix_sanitised() {
        assert_eq!(temp_suffix("a.PNG"), ".PNG");
        assert_eq!(temp_suffix("noext"), "");
        assert_eq!(temp_suffix("weird.p/g"), "");
    }
}
