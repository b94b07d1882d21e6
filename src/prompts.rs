//! Prompts for the enrichment model.
//!
//! Every prompt lives here so the wording can change without touching the
//! retry or parsing code, and so tests can inspect it directly. Callers can
//! override the system prompt via
//! [`crate::config::AnalysisConfigBuilder::system_prompt`]; the user prompt
//! is always built by [`build_enrichment_prompt`] because the response
//! normaliser depends on its key schema.

use crate::pipeline::input::MediaKind;

/// Default system prompt, used when `AnalysisConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert social media content analyst and \
strategist. Provide detailed, actionable insights for content optimization.";

/// JSON shape the model is asked to answer with. The keys are the ones
/// [`crate::pipeline::normalize::normalize_reply`] reads.
pub const RESPONSE_SCHEMA: &str = r#"{
  "contentQualityScore": number,
  "engagementPotentialScore": number,
  "brandVoice": string,
  "targetAudience": string,
  "platformRecommendations": {
    "twitter": string,
    "instagram": string,
    "linkedin": string,
    "facebook": string
  },
  "hashtagStrategy": string[],
  "optimalPostingTimes": string[],
  "improvementSuggestions": string[],
  "competitiveAnalysis": string,
  "roiPotential": string
}"#;

const DIMENSIONS: &str = "\
1. **Content Quality Assessment** (0-100 score)
2. **Engagement Potential** (0-100 score)
3. **Brand Voice Analysis** (Professional, Casual, Friendly, etc.)
4. **Target Audience Identification**
5. **Platform-Specific Recommendations** (Twitter, Instagram, LinkedIn, Facebook)
6. **Hashtag Strategy** (suggest 5-10 relevant hashtags)
7. **Optimal Posting Time Suggestions**
8. **Content Improvement Suggestions** (3-5 specific recommendations)
9. **Competitive Analysis** (how it compares to similar content)
10. **ROI Potential** (estimated engagement rates)";

/// Build the user message for one document.
///
/// `text` is embedded verbatim between double quotes; the model copes with
/// embedded quotes and newlines.
pub fn build_enrichment_prompt(text: &str, file_name: &str, kind: MediaKind) -> String {
    format!(
        "Analyze this social media content for deep insights and optimization:\n\n\
         Content: \"{text}\"\n\
         File: {file_name} ({kind})\n\n\
         Please provide a comprehensive analysis including:\n\n\
         {DIMENSIONS}\n\n\
         Format the response as JSON with these exact keys:\n\
         {RESPONSE_SCHEMA}"
    )
}
