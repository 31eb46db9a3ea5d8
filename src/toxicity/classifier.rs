// ToxicityClassifier: the infallible face of whichever scorer is configured.
//
// Scorers return Result; the classifier never does. A failing model-based
// scorer degrades to the keyword heuristic, and if that is switched off the
// score becomes 0.0 so the message passes through unmodified rather than
// blocking delivery. A scorer that does not answer within the timeout counts
// as failed, so one stalled call cannot hold up a sender's later messages.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::heuristic::KeywordScorer;
use super::traits::ToxicityScorer;

/// Score assumed when scoring fails and no heuristic fallback is enabled.
pub const DEFAULT_SCORE_ON_ERROR: f64 = 0.0;

/// How long a scorer gets before its answer is abandoned.
pub const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ToxicityClassifier {
    scorer: Arc<dyn ToxicityScorer>,
    heuristic_fallback: Option<KeywordScorer>,
    timeout: Duration,
}

impl ToxicityClassifier {
    /// Wrap a scorer. When `heuristic_fallback` is true, scorer errors are
    /// answered by the keyword heuristic instead of the default score.
    pub fn new(scorer: Arc<dyn ToxicityScorer>, heuristic_fallback: bool) -> Self {
        Self {
            scorer,
            heuristic_fallback: heuristic_fallback.then_some(KeywordScorer),
            timeout: DEFAULT_SCORER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classifier backed only by the keyword heuristic.
    pub fn keyword() -> Self {
        Self::new(Arc::new(KeywordScorer), false)
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Score `text`, always returning a value in [0, 1].
    pub async fn score(&self, text: &str) -> f64 {
        let outcome = match tokio::time::timeout(self.timeout, self.scorer.score_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "no answer within {} ms",
                self.timeout.as_millis()
            )),
        };

        let raw = match outcome {
            Ok(result) => result.toxicity,
            Err(e) => match &self.heuristic_fallback {
                Some(heuristic) => {
                    warn!(
                        scorer = self.scorer.name(),
                        error = %e,
                        "Toxicity scorer failed, using keyword heuristic"
                    );
                    heuristic.score(text)
                }
                None => {
                    warn!(
                        scorer = self.scorer.name(),
                        error = %e,
                        "Toxicity scorer failed, treating text as non-toxic"
                    );
                    DEFAULT_SCORE_ON_ERROR
                }
            },
        };

        let score = sanitize(raw);
        debug!(scorer = self.scorer.name(), score, "Classified text");
        score
    }
}

/// Clamp into [0, 1]; NaN and infinities become the default score.
fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        DEFAULT_SCORE_ON_ERROR
    }
}
