// Toxicity scorer trait: the swap-ready abstraction.
//
// Every scoring strategy (keyword heuristic, local ONNX model, Perspective
// API) implements this trait. The ToxicityClassifier wraps whichever one is
// configured and turns its failures into a conservative score.

use anyhow::Result;
use async_trait::async_trait;

/// The result of scoring a single piece of text for toxicity.
#[derive(Debug, Clone)]
pub struct ToxicityResult {
    /// Overall toxicity score from 0.0 (benign) to 1.0 (very toxic)
    pub toxicity: f64,
    /// Breakdown of specific attributes (if the provider supports them)
    pub attributes: ToxicityAttributes,
}

impl ToxicityResult {
    /// A result carrying only the overall score.
    pub fn from_score(toxicity: f64) -> Self {
        Self {
            toxicity,
            attributes: ToxicityAttributes::default(),
        }
    }
}

/// Detailed toxicity attribute scores (all 0.0 to 1.0).
/// Not all providers will populate every field.
#[derive(Debug, Clone, Default)]
pub struct ToxicityAttributes {
    pub severe_toxicity: Option<f64>,
    pub identity_attack: Option<f64>,
    pub insult: Option<f64>,
    pub profanity: Option<f64>,
    pub threat: Option<f64>,
}

/// Trait for scoring text toxicity. Implementations are async because
/// model inference and HTTP providers both suspend.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Short name used in logs and the status endpoint.
    fn name(&self) -> &'static str;

    /// Score a single text for toxicity.
    async fn score_text(&self, text: &str) -> Result<ToxicityResult>;
}
