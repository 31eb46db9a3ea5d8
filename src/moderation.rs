// Moderation pipeline: score, decide, rephrase if needed.
//
// `moderate` is the single operation the rest of the system depends on.
// It has no error channel: the classifier degrades to a conservative score
// and the chain always ends on the fallback phrase.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{Config, ScorerBackend};
use crate::rephrase::build_chain;
use crate::rephrase::chain::{RephraseChain, UsedProvider};
use crate::toxicity::classifier::ToxicityClassifier;
use crate::toxicity::heuristic::KeywordScorer;
use crate::toxicity::onnx::OnnxToxicityScorer;
use crate::toxicity::perspective::PerspectiveScorer;
use crate::toxicity::traits::ToxicityScorer;

/// The verdict for one message.
///
/// Not toxic: `delivered_text == original_text` and `used_provider` is
/// `None`. Toxic: `delivered_text` came from the first provider that
/// succeeded, or from the fallback phrase.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub is_toxic: bool,
    pub original_text: String,
    pub delivered_text: String,
    pub used_provider: UsedProvider,
    pub score: f64,
    #[serde(rename = "scoring_latency_ms", serialize_with = "as_millis")]
    pub scoring_latency: Duration,
    #[serde(rename = "rephrase_latency_ms", serialize_with = "as_millis")]
    pub rephrase_latency: Duration,
}

impl Decision {
    /// Whether the receiver sees something other than what was sent.
    pub fn altered(&self) -> bool {
        self.delivered_text != self.original_text
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

pub struct ModerationPipeline {
    classifier: ToxicityClassifier,
    chain: RephraseChain,
    threshold: f64,
}

impl ModerationPipeline {
    pub fn new(classifier: ToxicityClassifier, chain: RephraseChain, threshold: f64) -> Self {
        Self {
            classifier,
            chain,
            threshold,
        }
    }

    /// Build the pipeline described by `config`. Fails only when the chosen
    /// scorer cannot be constructed (e.g. ONNX model files missing).
    pub fn from_config(config: &Config) -> Result<Self> {
        let scorer = create_scorer(config)?;
        let classifier = ToxicityClassifier::new(scorer, config.heuristic_fallback)
            .with_timeout(config.scorer_timeout);
        Ok(Self::new(classifier, build_chain(config), config.threshold))
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scorer_name(&self) -> &'static str {
        self.classifier.scorer_name()
    }

    pub fn scorer_timeout(&self) -> Duration {
        self.classifier.timeout()
    }

    pub fn chain(&self) -> &RephraseChain {
        &self.chain
    }

    /// Moderate one message. Takes at most the scorer timeout plus the
    /// chain's worst-case latency.
    pub async fn moderate(&self, text: &str) -> Decision {
        let text = text.trim();

        let started = Instant::now();
        let score = self.classifier.score(text).await;
        let scoring_latency = started.elapsed();

        if score <= self.threshold {
            debug!(score, threshold = self.threshold, "Message allowed");
            return Decision {
                is_toxic: false,
                original_text: text.to_string(),
                delivered_text: text.to_string(),
                used_provider: UsedProvider::None,
                score,
                scoring_latency,
                rephrase_latency: Duration::ZERO,
            };
        }

        let started = Instant::now();
        let rephrasing = self.chain.rephrase(text).await;
        let rephrase_latency = started.elapsed();

        info!(
            score,
            threshold = self.threshold,
            provider = %rephrasing.provider,
            failed_providers = rephrasing.failures.len(),
            rephrase_ms = rephrase_latency.as_millis() as u64,
            "Toxic message rephrased"
        );

        Decision {
            is_toxic: true,
            original_text: text.to_string(),
            delivered_text: rephrasing.text,
            used_provider: rephrasing.provider,
            score,
            scoring_latency,
            rephrase_latency,
        }
    }
}

/// Create a toxicity scorer based on the configured backend.
fn create_scorer(config: &Config) -> Result<Arc<dyn ToxicityScorer>> {
    config.require_scorer()?;
    match config.scorer_backend {
        ScorerBackend::Keyword => {
            info!("Using keyword toxicity scorer");
            Ok(Arc::new(KeywordScorer))
        }
        ScorerBackend::Onnx => {
            info!("Using local ONNX toxicity scorer");
            Ok(Arc::new(OnnxToxicityScorer::load(&config.model_dir)?))
        }
        ScorerBackend::Perspective => {
            info!("Using Perspective API toxicity scorer");
            Ok(Arc::new(PerspectiveScorer::new(
                config.perspective_api_key.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rephrase::fallback::LocalFallback;

    fn keyword_pipeline(threshold: f64) -> ModerationPipeline {
        ModerationPipeline::new(
            ToxicityClassifier::keyword(),
            RephraseChain::new(LocalFallback::default()),
            threshold,
        )
    }

    #[tokio::test]
    async fn test_clean_text_passes_through() {
        let decision = keyword_pipeline(0.5).moderate("  Good morning ").await;
        assert!(!decision.is_toxic);
        assert_eq!(decision.delivered_text, "Good morning");
        assert_eq!(decision.used_provider, UsedProvider::None);
        assert!(!decision.altered());
        assert_eq!(decision.rephrase_latency, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_allowed() {
        // Two single-weight keywords score exactly 0.6
        let decision = keyword_pipeline(0.6).moderate("you idiot moron").await;
        assert!(!decision.is_toxic);
    }

    #[tokio::test]
    async fn test_toxic_text_gets_fallback() {
        let decision = keyword_pipeline(0.5).moderate("you dumb moron").await;
        assert!(decision.is_toxic);
        assert!(decision.altered());
        assert_eq!(decision.used_provider, UsedProvider::Fallback);
    }

    #[tokio::test]
    async fn test_single_stupid_is_rephrased() {
        let decision = keyword_pipeline(0.5).moderate("you're stupid").await;
        assert!(decision.is_toxic);
        assert!((decision.score - 0.6).abs() < 1e-10);
        assert_ne!(decision.delivered_text, "you're stupid");
    }

    #[tokio::test]
    async fn test_decision_json_shape() {
        let decision = keyword_pipeline(0.5).moderate("Good morning").await;
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["used_provider"], "none");
        assert_eq!(value["is_toxic"], false);
        assert!(value["scoring_latency_ms"].is_u64());
    }

    #[test]
    fn test_from_config_keyword_default() {
        let config = Config::from_lookup(|_| None).unwrap();
        let pipeline = ModerationPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.scorer_name(), "keyword");
        assert_eq!(pipeline.threshold(), 0.5);
    }

    #[test]
    fn test_from_config_applies_scorer_timeout() {
        let config = Config::from_lookup(|key| {
            (key == "POLITELY_SCORER_TIMEOUT_MS").then(|| "1234".to_string())
        })
        .unwrap();
        let pipeline = ModerationPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.scorer_timeout(), Duration::from_millis(1234));
    }
}
