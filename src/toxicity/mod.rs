// Toxicity scoring: trait-based abstraction for swappable strategies.
//
// ToxicityScorer is the fallible strategy interface (keyword heuristic,
// local ONNX model, Perspective API). ToxicityClassifier wraps one of them
// and is what the moderation pipeline calls; it never fails.

pub mod classifier;
pub mod download;
pub mod heuristic;
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod traits;
