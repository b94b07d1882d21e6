//! Output types returned by the analysis pipeline.
//!
//! Every type here serialises with camelCase keys so the JSON a web layer
//! hands to its front-end keeps the shape the UI already renders
//! (`extractedText`, `analysis`, `deepAnalysis`, …).

use crate::error::EnrichmentError;
use crate::pipeline::input::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Literal used for every text field the enrichment step could not fill.
pub const UNAVAILABLE: &str = "Unavailable";

/// Deterministic, offline scoring of the extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicAnalysis {
    /// Whitespace-delimited, non-empty tokens.
    pub word_count: usize,
    /// Length of the text in characters, no normalisation.
    pub character_count: usize,
    /// 0–100; 100 means ~15 words per sentence.
    pub readability_score: u8,
    /// Tips in rule-declaration order.
    pub suggestions: Vec<String>,
}

/// Per-platform recommendations. Always holds all four platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRecommendations {
    pub twitter: String,
    pub instagram: String,
    pub linkedin: String,
    pub facebook: String,
}

impl PlatformRecommendations {
    /// Every platform set to the same text.
    pub fn uniform(text: &str) -> Self {
        Self {
            twitter: text.to_string(),
            instagram: text.to_string(),
            linkedin: text.to_string(),
            facebook: text.to_string(),
        }
    }
}

impl Default for PlatformRecommendations {
    fn default() -> Self {
        Self::uniform(UNAVAILABLE)
    }
}

/// LLM-generated strategic assessment in a fixed, total shape.
///
/// Produced only by [`crate::pipeline::normalize::normalize_reply`] or one of
/// the constructors below, so no field is ever missing: scores default to 0,
/// text to [`UNAVAILABLE`], lists to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub content_quality_score: u8,
    pub engagement_potential_score: u8,
    pub brand_voice: String,
    pub target_audience: String,
    pub platform_recommendations: PlatformRecommendations,
    pub hashtag_strategy: Vec<String>,
    pub optimal_posting_times: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub competitive_analysis: String,
    pub roi_potential: String,
    /// The model's unparsed reply, set only when no JSON object could be
    /// recovered from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
}

impl Default for EnrichmentResult {
    fn default() -> Self {
        Self {
            content_quality_score: 0,
            engagement_potential_score: 0,
            brand_voice: UNAVAILABLE.to_string(),
            target_audience: UNAVAILABLE.to_string(),
            platform_recommendations: PlatformRecommendations::default(),
            hashtag_strategy: Vec::new(),
            optimal_posting_times: Vec::new(),
            improvement_suggestions: Vec::new(),
            competitive_analysis: UNAVAILABLE.to_string(),
            roi_potential: UNAVAILABLE.to_string(),
            raw_analysis: None,
        }
    }
}

impl EnrichmentResult {
    /// Placeholder attached when enrichment was requested but failed.
    ///
    /// Structurally identical to a real result, but labelled so a UI can
    /// tell the user the deep analysis did not run.
    pub fn unavailable() -> Self {
        Self {
            platform_recommendations: PlatformRecommendations::uniform("Deep analysis unavailable"),
            improvement_suggestions: vec![
                "Deep analysis temporarily unavailable. Please try again.".to_string(),
            ],
            ..Self::default()
        }
    }

    /// True when this is the [`EnrichmentResult::unavailable`] placeholder.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::unavailable()
    }
}

/// Aggregate returned for one analysed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Best-effort text; may be empty but is never absent.
    pub extracted_text: String,
    pub analysis: HeuristicAnalysis,
    pub file_type: MediaKind,
    pub file_name: String,
    /// Present iff enrichment was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<EnrichmentResult>,
    /// Why `deep_analysis` holds the placeholder, when it does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<EnrichmentError>,
}

/// The downloadable JSON report for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub file_name: String,
    pub file_type: MediaKind,
    pub generated_at: DateTime<Utc>,
    pub extracted_text: String,
    pub basic_analysis: HeuristicAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<EnrichmentResult>,
}

impl AnalysisReport {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            file_name: result.file_name.clone(),
            file_type: result.file_type,
            generated_at: Utc::now(),
            extracted_text: result.extracted_text.clone(),
            basic_analysis: result.analysis.clone(),
            deep_analysis: result.deep_analysis.clone(),
        }
    }

    /// Suggested file name: the upload's stem plus `-analysis.json`.
    pub fn suggested_file_name(&self) -> String {
        let stem = match self.file_name.rfind('.') {
            Some(idx) if idx > 0 => &self.file_name[..idx],
            _ => self.file_name.as_str(),
        };
        if stem.is_empty() {
            "report-analysis.json".to_string()
        } else {
            format!("{stem}-analysis.json")
        }
    }
}
