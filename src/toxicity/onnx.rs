// Local ONNX toxicity scorer (Detoxify unbiased-toxic-roberta).
//
// This is the model-based strategy: more accurate than the keyword
// heuristic, no network, but it needs the model files on disk and can fail
// at inference time. The classifier falls back to the heuristic when it does.
//
// Model: protectai/unbiased-toxic-roberta-onnx (quantized)
// Output: 7 toxicity categories, raw logits, sigmoid applied here.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::download::{TOXICITY_MODEL_FILE, TOXICITY_TOKENIZER_FILE};
use super::traits::{ToxicityAttributes, ToxicityResult, ToxicityScorer};
use crate::output::truncate_chars;

/// Labels output by unbiased-toxic-roberta, in the order the model returns them.
const LABEL_ORDER: [&str; 7] = [
    "toxicity",
    "severe_toxicity",
    "obscene",
    "identity_attack",
    "insult",
    "threat",
    "sexual_explicit",
];

/// Local ONNX-based toxicity scorer.
pub struct OnnxToxicityScorer {
    // ort::Session::run takes &mut self and inference runs on spawn_blocking,
    // so the session lives behind Arc<Mutex>.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxToxicityScorer {
    /// Load the ONNX model and tokenizer from `model_dir`.
    ///
    /// Run `politely download-model` first if the files are missing.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(TOXICITY_MODEL_FILE);
        let tokenizer_path = model_dir.join(TOXICITY_TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `politely download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `politely download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ToxicityScorer for OnnxToxicityScorer {
    fn name(&self) -> &'static str {
        "onnx"
    }

    /// Tokenize, run one forward pass and sigmoid the logits. The CPU-bound
    /// work runs on spawn_blocking so socket tasks keep moving.
    async fn score_text(&self, text: &str) -> Result<ToxicityResult> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();

            // Shape: [1, seq_len]
            let shape = [1_i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7], raw logits
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            if logits.len() < LABEL_ORDER.len() {
                anyhow::bail!(
                    "Model returned {} logits, expected {}",
                    logits.len(),
                    LABEL_ORDER.len()
                );
            }

            let scores: Vec<f64> = logits[..LABEL_ORDER.len()]
                .iter()
                .map(|&logit| sigmoid(logit as f64))
                .collect();
            let result = map_scores_to_result(&scores);

            debug!(
                toxicity = result.toxicity,
                insult = ?result.attributes.insult,
                text_preview = %truncate_chars(&text, 50),
                "ONNX scored text"
            );

            Ok(result)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Map the 7 model output scores onto ToxicityResult.
///
/// "obscene" becomes profanity; sexual_explicit has no field and is dropped.
fn map_scores_to_result(scores: &[f64]) -> ToxicityResult {
    ToxicityResult {
        toxicity: scores[0],
        attributes: ToxicityAttributes {
            severe_toxicity: Some(scores[1]),
            identity_attack: Some(scores[3]),
            insult: Some(scores[4]),
            profanity: Some(scores[2]),
            threat: Some(scores[5]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_map_scores_to_result() {
        let scores = vec![0.9, 0.1, 0.8, 0.3, 0.7, 0.05, 0.4];
        let result = map_scores_to_result(&scores);

        assert!((result.toxicity - 0.9).abs() < 1e-10);
        assert!((result.attributes.profanity.unwrap() - 0.8).abs() < 1e-10);
        assert!((result.attributes.insult.unwrap() - 0.7).abs() < 1e-10);
        assert!((result.attributes.threat.unwrap() - 0.05).abs() < 1e-10);
    }

    #[test]
    fn test_load_fails_without_model_files() {
        let dir = std::env::temp_dir().join("politely-onnx-missing");
        let err = OnnxToxicityScorer::load(&dir).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }
}
