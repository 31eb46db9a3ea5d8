// Keyword heuristic scorer.
//
// Sums the weights of the toxic keywords that appear in the text and maps
// the total onto a coarse score. Deterministic, no model files, no network, so
// it doubles as the classifier's safety net when a model-based scorer fails.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::traits::{ToxicityResult, ToxicityScorer};
use crate::output::truncate_chars;

/// Keywords matched as case-insensitive substrings, with how many hits a
/// match is worth. "hate", "stupid" and "dumb" count double, so a single
/// "you're stupid" is already over the default threshold.
const TOXIC_KEYWORDS: &[(&str, usize)] = &[
    ("idiot", 1),
    ("stupid", 2),
    ("dumb", 2),
    ("moron", 1),
    ("hate", 2),
    ("kill", 1),
    ("murder", 1),
    ("awful", 1),
    ("terrible", 1),
    ("worst", 1),
    ("ugly", 1),
    ("fuck", 1),
    ("shit", 1),
    ("bitch", 1),
    ("asshole", 1),
    ("dick", 1),
    ("pussy", 1),
    ("cunt", 1),
    ("nigger", 1),
    ("fag", 1),
];

/// Deterministic keyword-matching scorer.
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    /// Score synchronously. Never fails.
    pub fn score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let hits = TOXIC_KEYWORDS
            .iter()
            .filter(|(keyword, _)| lower.contains(keyword))
            .map(|(_, weight)| weight)
            .sum();
        score_for_hits(hits)
    }
}

/// Map a keyword hit count onto a toxicity score.
///
/// A single hit stays under the default 0.5 threshold on purpose: one
/// "terrible" in a sentence is usually not an insult.
fn score_for_hits(hits: usize) -> f64 {
    match hits {
        0 => 0.0,
        1 => 0.4,
        2 => 0.6,
        3 => 0.7,
        n => (0.6 + n as f64 * 0.1).min(0.9),
    }
}

#[async_trait]
impl ToxicityScorer for KeywordScorer {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn score_text(&self, text: &str) -> Result<ToxicityResult> {
        let toxicity = self.score(text);
        debug!(
            toxicity,
            text_preview = %truncate_chars(text, 50),
            "Keyword scored text"
        );
        Ok(ToxicityResult::from_score(toxicity))
    }
}
