//! Batch analysis API: emit results as documents complete.
//!
//! [`analyze_stream`] runs [`crate::analyze::analyze_file`] over many paths
//! with bounded concurrency and yields each `(path, result)` pair as soon as
//! it is ready. Results arrive in completion order, not input order.
//!
//! Every document is independent: one file failing validation or enrichment
//! shows up as that item's `Err` and never stops the others.

use crate::analyze::analyze_file;
use crate::config::AnalysisConfig;
use crate::error::AnalyzeError;
use crate::output::AnalysisResult;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// One finished document: its path and the outcome.
pub type AnalysisItem = (PathBuf, Result<AnalysisResult, AnalyzeError>);

/// A boxed stream of per-document outcomes.
pub type AnalysisStream = Pin<Box<dyn Stream<Item = AnalysisItem> + Send>>;

/// Analyse many files, streaming results as they are ready.
///
/// At most `concurrency` documents are in flight at once (a value of 0 is
/// treated as 1).
///
/// # Errors
/// `Err(AnalyzeError::NoFile)` when `paths` is empty.
pub fn analyze_stream(
    paths: Vec<PathBuf>,
    enrich: bool,
    config: &AnalysisConfig,
    concurrency: usize,
) -> Result<AnalysisStream, AnalyzeError> {
    if paths.is_empty() {
        return Err(AnalyzeError::NoFile);
    }
    let concurrency = concurrency.max(1);
    info!(
        "Starting batch analysis: {} files, concurrency {}",
        paths.len(),
        concurrency
    );

    let config = config.clone();
    let s = stream::iter(paths.into_iter().map(move |path| {
        let cfg = config.clone();
        async move {
            let result = analyze_file(&path, enrich, &cfg).await;
            (path, result)
        }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_no_file() {
        let config = AnalysisConfig::default();
        assert!(matches!(
            analyze_stream(Vec::new(), false, &config, 4),
            Err(AnalyzeError::NoFile)
        ));
    }

    #[tokio::test]
    async fn each_file_gets_its_own_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.pdf");
        let large = dir.path().join("large.pdf");
        std::fs::write(&small, vec![0u8; 1_000]).unwrap();
        std::fs::write(&large, vec![0u8; 600_000]).unwrap();
        let missing = dir.path().join("missing.png");
        let unsupported = dir.path().join("notes.txt");
        std::fs::write(&unsupported, b"hello").unwrap();

        let config = AnalysisConfig::default();
        let s = analyze_stream(
            vec![small.clone(), large.clone(), missing.clone(), unsupported.clone()],
            false,
            &config,
            2,
        )
        .unwrap();
        let mut items: Vec<AnalysisItem> = s.collect().await;
        items.sort_by(|a, b| a.0.cmp(&b.0));

        let outcome = |p: &PathBuf| {
            items
                .iter()
                .find(|(path, _)| path == p)
                .map(|(_, r)| r)
                .unwrap()
        };
        assert!(outcome(&small).as_ref().unwrap().extracted_text.contains("concise PDF"));
        assert!(outcome(&large)
            .as_ref()
            .unwrap()
            .extracted_text
            .contains("comprehensive document"));
        assert!(matches!(outcome(&missing), Err(AnalyzeError::FileNotFound { .. })));
        assert!(matches!(
            outcome(&unsupported),
            Err(AnalyzeError::UnsupportedMediaType { .. })
        ));
        assert_eq!(items.len(), 4);
    }
}
