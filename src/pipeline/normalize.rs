//! Response normalisation: arbitrary model reply → total [`EnrichmentResult`].
//!
//! Models asked for JSON still answer with prose, wrap the object in a code
//! fence, or add a sentence before and after it. [`normalize_reply`] tries a
//! fixed list of pure parse strategies, keeps the first JSON object any of
//! them recovers, and coerces it field by field. Nothing here can fail: the
//! worst case is the all-default record with the reply kept as
//! `raw_analysis`.
//!
//! ## Strategy order
//!
//! 1. the whole reply as JSON
//! 2. the body of the first fenced code block
//! 3. the span from the first `{` to the last `}`

use crate::output::{EnrichmentResult, PlatformRecommendations, UNAVAILABLE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

type JsonObject = Map<String, Value>;

/// A parse strategy: the recovered object, or `None` to try the next one.
type Strategy = fn(&str) -> Option<JsonObject>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("braced", parse_braced),
];

static RE_FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Coerce a model reply into the fixed enrichment schema.
pub fn normalize_reply(reply: &str) -> EnrichmentResult {
    for (name, strategy) in STRATEGIES {
        if let Some(obj) = strategy(reply) {
            debug!("Enrichment reply parsed by '{}' strategy", name);
            return from_object(&obj);
        }
    }

    debug!("Enrichment reply is not JSON ({} chars); keeping raw text", reply.len());
    EnrichmentResult {
        raw_analysis: (!reply.trim().is_empty()).then(|| reply.to_string()),
        ..EnrichmentResult::default()
    }
}

// ── Strategies ───────────────────────────────────────────────────────────────

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn parse_direct(reply: &str) -> Option<JsonObject> {
    parse_object(reply)
}

fn parse_fenced(reply: &str) -> Option<JsonObject> {
    RE_FENCED
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_object(m.as_str()))
}

fn parse_braced(reply: &str) -> Option<JsonObject> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&reply[start..=end])
}

// ── Coercion ─────────────────────────────────────────────────────────────────

fn from_object(obj: &JsonObject) -> EnrichmentResult {
    let empty = JsonObject::new();
    let platforms = match obj.get("platformRecommendations") {
        Some(Value::Object(p)) => p,
        _ => &empty,
    };

    EnrichmentResult {
        content_quality_score: score_field(obj.get("contentQualityScore")),
        engagement_potential_score: score_field(obj.get("engagementPotentialScore")),
        brand_voice: text_field(obj.get("brandVoice")),
        target_audience: text_field(obj.get("targetAudience")),
        platform_recommendations: PlatformRecommendations {
            twitter: text_field(platforms.get("twitter")),
            instagram: text_field(platforms.get("instagram")),
            linkedin: text_field(platforms.get("linkedin")),
            facebook: text_field(platforms.get("facebook")),
        },
        hashtag_strategy: list_field(obj.get("hashtagStrategy")),
        optimal_posting_times: list_field(obj.get("optimalPostingTimes")),
        improvement_suggestions: list_field(obj.get("improvementSuggestions")),
        competitive_analysis: text_field(obj.get("competitiveAnalysis")),
        roi_potential: text_field(obj.get("roiPotential")),
        raw_analysis: None,
    }
}

/// Number or numeric string → rounded integer in 0..=100. Anything else is 0.
fn score_field(v: Option<&Value>) -> u8 {
    let n = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn text_field(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        _ => UNAVAILABLE.to_string(),
    }
}

/// Arrays keep their string elements; any other value becomes empty.
fn list_field(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r##"{
        "contentQualityScore": 150,
        "engagementPotentialScore": "87.6",
        "brandVoice": "Upbeat and direct",
        "targetAudience": "Early-stage founders",
        "platformRecommendations": {
            "twitter": "Thread it",
            "instagram": "Carousel",
            "linkedin": "Long-form post",
            "facebook": "Group share"
        },
        "hashtagStrategy": ["#startup", "#launch"],
        "optimalPostingTimes": ["Tue 9am"],
        "improvementSuggestions": ["Shorter hook"],
        "competitiveAnalysis": "Stands out on tone",
        "roiPotential": "High"
    }"##;

    #[test]
    fn full_object_is_coerced() {
        let r = normalize_reply(FULL);
        assert_eq!(r.content_quality_score, 100);
        assert_eq!(r.engagement_potential_score, 88);
        assert_eq!(r.brand_voice, "Upbeat and direct");
        assert_eq!(r.platform_recommendations.linkedin, "Long-form post");
        assert_eq!(r.hashtag_strategy, vec!["#startup", "#launch"]);
        assert_eq!(r.optimal_posting_times, vec!["Tue 9am"]);
        assert_eq!(r.roi_potential, "High");
        assert!(r.raw_analysis.is_none());
    }

    #[test]
    fn empty_reply_is_all_defaults() {
        let r = normalize_reply("");
        assert_eq!(r, EnrichmentResult::default());
        assert_eq!(normalize_reply("   \n"), EnrichmentResult::default());
    }

    #[test]
    fn prose_is_kept_raw() {
        let r = normalize_reply("I think this post is great.");
        assert_eq!(r.raw_analysis.as_deref(), Some("I think this post is great."));
        assert_eq!(r.brand_voice, UNAVAILABLE);
        assert_eq!(r.platform_recommendations, PlatformRecommendations::default());
    }

    #[test]
    fn fenced_json() {
        let reply = format!("Here you go:\n```json\n{FULL}\n```\nHope that helps!");
        let r = normalize_reply(&reply);
        assert_eq!(r.content_quality_score, 100);
        assert_eq!(r.target_audience, "Early-stage founders");
    }

    #[test]
    fn bare_fence_without_language() {
        let r = normalize_reply("```\n{\"brandVoice\": \"Calm\"}\n```");
        assert_eq!(r.brand_voice, "Calm");
    }

    #[test]
    fn braced_span_with_surrounding_text() {
        let r = normalize_reply("Analysis: {\"roiPotential\": \"Medium\"} -- end");
        assert_eq!(r.roi_potential, "Medium");
        assert!(r.raw_analysis.is_none());
    }

    #[test]
    fn truncated_json_falls_back_to_raw() {
        let reply = "{\"brandVoice\": \"Calm\", \"targetAud";
        let r = normalize_reply(reply);
        assert_eq!(r.brand_voice, UNAVAILABLE);
        assert_eq!(r.raw_analysis.as_deref(), Some(reply));
    }

    #[test]
    fn partial_object_defaults_missing_fields() {
        let r = normalize_reply(r#"{"contentQualityScore": 72, "platformRecommendations": {"twitter": "Short"}}"#);
        assert_eq!(r.content_quality_score, 72);
        assert_eq!(r.engagement_potential_score, 0);
        assert_eq!(r.platform_recommendations.twitter, "Short");
        assert_eq!(r.platform_recommendations.facebook, UNAVAILABLE);
        assert!(r.hashtag_strategy.is_empty());
    }

    #[test]
    fn wrong_types_are_dropped() {
        let r = normalize_reply(
            r##"{
                "contentQualityScore": "high",
                "engagementPotentialScore": -12,
                "brandVoice": 42,
                "platformRecommendations": "everywhere",
                "hashtagStrategy": "#one #two",
                "improvementSuggestions": ["keep", 3, null, "this"]
            }"##,
        );
        assert_eq!(r.content_quality_score, 0);
        assert_eq!(r.engagement_potential_score, 0);
        assert_eq!(r.brand_voice, UNAVAILABLE);
        assert_eq!(r.platform_recommendations, PlatformRecommendations::default());
        assert!(r.hashtag_strategy.is_empty());
        assert_eq!(r.improvement_suggestions, vec!["keep", "this"]);
    }

    #[test]
    fn non_object_json_is_raw() {
        let r = normalize_reply("[1, 2, 3]");
        assert_eq!(r.raw_analysis.as_deref(), Some("[1, 2, 3]"));
    }

    #[test]
    fn score_coercion() {
        assert_eq!(score_field(Some(&Value::from(49.5))), 50);
        assert_eq!(score_field(Some(&Value::from(" 12 "))), 12);
        assert_eq!(score_field(Some(&Value::from("NaN"))), 0);
        assert_eq!(score_field(Some(&Value::from(true))), 0);
        assert_eq!(score_field(None), 0);
    }
}
