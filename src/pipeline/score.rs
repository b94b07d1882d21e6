//! Heuristic content scoring: extracted text → counts, readability, tips.
//!
//! [`score`] is a pure, total function. It makes no network calls, reads no
//! configuration and holds no state, so identical input always produces an
//! identical [`HeuristicAnalysis`].
//!
//! ## Rule order
//!
//! Suggestions come from independent rules evaluated in declaration order
//! (see [`RULES`]). Several rules can fire for the same text; the output is
//! never re-sorted by relevance.

use crate::output::HeuristicAnalysis;
use once_cell::sync::Lazy;
use regex::Regex;

/// Average sentence length (in words) that scores a perfect 100.
pub const OPTIMAL_WORDS_PER_SENTENCE: f64 = 15.0;

/// Sentences longer than this on average trigger the brevity tip.
pub const LONG_SENTENCE_WORDS: f64 = 25.0;

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Measurements shared by every rule.
#[derive(Debug, Clone, Copy)]
struct TextStats {
    words: usize,
    sentences: usize,
    avg_words_per_sentence: f64,
}

impl TextStats {
    fn of(text: &str) -> Self {
        let words = count_words(text);
        let sentences = count_sentences(text);
        let avg_words_per_sentence = if sentences == 0 {
            0.0
        } else {
            words as f64 / sentences as f64
        };
        Self {
            words,
            sentences,
            avg_words_per_sentence,
        }
    }
}

/// A suggestion rule: returns the tip to append, if it fires.
type Rule = fn(&str, &TextStats) -> Option<&'static str>;

/// Suggestion rules, in the order their tips appear in the output.
const RULES: &[Rule] = &[
    length_band_tip,
    long_sentence_tip,
    exclamation_tip,
    question_tip,
    hashtag_tip,
    call_to_action_tip,
    visual_format_tip,
];

/// Score `text`.
pub fn score(text: &str) -> HeuristicAnalysis {
    let stats = TextStats::of(text);
    let suggestions = RULES
        .iter()
        .filter_map(|rule| rule(text, &stats))
        .map(str::to_string)
        .collect();

    HeuristicAnalysis {
        word_count: stats.words,
        character_count: text.chars().count(),
        readability_score: readability(&stats),
        suggestions,
    }
}

/// Whitespace-delimited, non-empty tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Non-empty segments between runs of `.`, `!` and `?`.
pub fn count_sentences(text: &str) -> usize {
    RE_SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
}

/// `100 - |avg - 15| * 2`, clamped to 0..=100 and rounded.
///
/// Text with no sentence at all has nothing to penalise and scores 100.
fn readability(stats: &TextStats) -> u8 {
    if stats.sentences == 0 {
        return 100;
    }
    let raw = 100.0 - (stats.avg_words_per_sentence - OPTIMAL_WORDS_PER_SENTENCE).abs() * 2.0;
    raw.clamp(0.0, 100.0).round() as u8
}

// ── Rules ────────────────────────────────────────────────────────────────────

fn length_band_tip(_text: &str, stats: &TextStats) -> Option<&'static str> {
    match stats.words {
        0..=29 => Some(
            "Perfect for Twitter/X! Your concise content fits the character limit perfectly. \
             Consider adding relevant hashtags to increase reach.",
        ),
        30..=99 => Some(
            "Great for Instagram captions! This length allows for engaging storytelling while \
             keeping your audience's attention. Add emojis to make it more visually appealing.",
        ),
        100..=199 => Some(
            "Excellent for LinkedIn! This length provides enough substance to demonstrate \
             expertise while remaining scannable for busy professionals.",
        ),
        // 200..=300 has no band tip.
        n if n > 300 => Some(
            "This content is comprehensive and perfect for Facebook or LinkedIn articles. \
             Consider breaking it into a series of posts to maintain engagement across multiple days.",
        ),
        _ => None,
    }
}

fn long_sentence_tip(_text: &str, stats: &TextStats) -> Option<&'static str> {
    (stats.avg_words_per_sentence > LONG_SENTENCE_WORDS).then_some(
        "Some sentences are quite long for social media. Try breaking them into shorter, \
         punchier statements that are easier to read on mobile devices.",
    )
}

fn exclamation_tip(text: &str, _stats: &TextStats) -> Option<&'static str> {
    (text.matches('!').count() > 2).then_some(
        "Consider reducing exclamation marks for a more professional tone that builds trust \
         and credibility with your audience.",
    )
}

fn question_tip(text: &str, _stats: &TextStats) -> Option<&'static str> {
    if text.contains('?') {
        Some(
            "Excellent use of questions! This encourages audience interaction and increases \
             comment engagement. Questions are proven to boost social media performance.",
        )
    } else {
        Some(
            "Add a compelling question at the end to encourage comments and discussion. \
             Questions like 'What do you think?' or 'Have you experienced this?' drive engagement.",
        )
    }
}

fn hashtag_tip(_text: &str, stats: &TextStats) -> Option<&'static str> {
    (stats.words > 50).then_some(
        "Your content has good substance. Add 3-5 relevant hashtags to increase \
         discoverability. Research trending hashtags in your niche for maximum reach.",
    )
}

fn call_to_action_tip(text: &str, _stats: &TextStats) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let has_cta = ["share", "comment", "like"].iter().any(|k| lower.contains(k));
    (!has_cta).then_some(
        "Include a clear call-to-action! Phrases like 'Share this with someone who needs to \
         see it' or 'Drop a ❤️ if you agree' can significantly boost engagement.",
    )
}

fn visual_format_tip(_text: &str, stats: &TextStats) -> Option<&'static str> {
    (stats.words > 150).then_some(
        "Consider creating an infographic or carousel post to break down this content \
         visually. Visual content typically gets 40% more engagement than text-only posts.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `n` sentences of exactly `words` words each.
    fn sentences(n: usize, words: usize) -> String {
        (0..n)
            .map(|_| {
                let body = vec!["word"; words].join(" ");
                format!("{body}.")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_input() {
        let a = score("");
        assert_eq!(a.word_count, 0);
        assert_eq!(a.character_count, 0);
        assert_eq!(a.readability_score, 100);
        // Length band + question prompt + CTA always fire for empty text.
        assert_eq!(a.suggestions.len(), 3);
        assert!(a.suggestions[0].starts_with("Perfect for Twitter/X!"));
    }

    #[test]
    fn punctuation_only_has_no_sentences() {
        assert_eq!(count_sentences("...!!!???"), 0);
        assert_eq!(score("?!.").readability_score, 100);
    }

    #[test]
    fn word_count_matches_whitespace_tokens() {
        for text in ["one", "  two  words ", "tab\tand\nnewline separated  text", "a  b   c"] {
            assert_eq!(
                score(text).word_count,
                text.split_whitespace().filter(|t| !t.is_empty()).count()
            );
        }
    }

    #[test]
    fn character_count_is_unnormalised() {
        assert_eq!(score("  hi  ").character_count, 6);
        assert_eq!(score("héllo").character_count, 5);
    }

    #[test]
    fn sentence_splitting_collapses_runs() {
        assert_eq!(count_sentences("Wait... what?! Really."), 3);
        assert_eq!(count_sentences("No terminator"), 1);
    }

    #[test]
    fn readability_optimum_is_100() {
        assert_eq!(score(&sentences(4, 15)).readability_score, 100);
    }

    #[test]
    fn readability_clamps_at_zero() {
        // 65 words per sentence: |65 - 15| * 2 = 100 → 0.
        assert_eq!(score(&sentences(1, 65)).readability_score, 0);
        assert_eq!(score(&sentences(1, 120)).readability_score, 0);
    }

    #[test]
    fn readability_linear_penalty() {
        // 10 words per sentence: 100 - 5 * 2 = 90.
        assert_eq!(score(&sentences(3, 10)).readability_score, 90);
    }

    #[test]
    fn score_is_pure() {
        let text = "Launch day! Are you ready? Share this with your team.";
        assert_eq!(score(text), score(text));
    }

    #[test]
    fn suggestion_order_follows_declaration() {
        // 160 words in one sentence with many exclamations and no CTA.
        let text = format!("{}!!! no question here", vec!["word"; 157].join(" "));
        let a = score(&text);
        assert_eq!(a.word_count, 160);
        let heads: Vec<&str> = a
            .suggestions
            .iter()
            .map(|s| s.split_whitespace().next().unwrap_or(""))
            .collect();
        assert_eq!(
            heads,
            vec!["Excellent", "Some", "Consider", "Add", "Your", "Include", "Consider"]
        );
        assert!(a.suggestions[0].contains("LinkedIn"));
        assert!(a.suggestions[6].contains("infographic"));
    }

    #[test]
    fn question_and_cta_detected() {
        let a = score("What do you think? Comment below.");
        assert!(a.suggestions.iter().any(|s| s.starts_with("Excellent use of questions")));
        assert!(!a.suggestions.iter().any(|s| s.starts_with("Include a clear call-to-action")));
    }

    #[test]
    fn gap_band_has_no_length_tip() {
        let a = score(&sentences(10, 25));
        assert_eq!(a.word_count, 250);
        assert!(a.suggestions[0].starts_with("Add a compelling question"));
    }

    #[test]
    fn two_exclamations_are_fine() {
        let a = score("Great! Amazing!");
        assert!(!a.suggestions.iter().any(|s| s.contains("exclamation")));
        let a = score("Great! Amazing! Wow!");
        assert!(a.suggestions.iter().any(|s| s.contains("exclamation")));
    }
}
