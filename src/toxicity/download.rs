// Model download helper for the ONNX toxicity scorer.
//
// Fetches Detoxify unbiased-toxic-roberta from HuggingFace into a
// platform-appropriate directory (~/.local/share/politely/models/ on Linux)
// so it persists across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the toxicity model.
const TOXICITY_HF_URL: &str =
    "https://huggingface.co/protectai/unbiased-toxic-roberta-onnx/resolve/main";

pub const TOXICITY_MODEL_FILE: &str = "model_quantized.onnx";
pub const TOXICITY_TOKENIZER_FILE: &str = "tokenizer.json";

/// Default directory for model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("politely")
        .join("models")
}

/// Check whether both toxicity model files exist.
pub fn model_files_present(dir: &Path) -> bool {
    dir.join(TOXICITY_MODEL_FILE).exists() && dir.join(TOXICITY_TOKENIZER_FILE).exists()
}

/// Download the toxicity model and tokenizer, skipping files already present.
pub async fn download_model(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    for (file, show_progress) in [(TOXICITY_TOKENIZER_FILE, false), (TOXICITY_MODEL_FILE, true)] {
        let path = dir.join(file);
        if path.exists() {
            info!(file, "Model file already exists, skipping");
            println!("  {file} (already exists)");
            continue;
        }
        println!("  Downloading {file}...");
        download_file(&format!("{TOXICITY_HF_URL}/{file}"), &path, show_progress).await?;
    }

    Ok(())
}

/// Download a single file, optionally with a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .context("Invalid progress template")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .context("Invalid progress template")?,
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(pb) = pb {
        pb.set_position(bytes.len() as u64);
        pb.finish_and_clear();
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_politely() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("politely") && path_str.contains("models"),
            "Expected path containing politely/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("politely-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_true_when_files_exist() {
        let dir = std::env::temp_dir().join("politely-model-present-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(TOXICITY_MODEL_FILE), b"fake").unwrap();
        std::fs::write(dir.join(TOXICITY_TOKENIZER_FILE), b"fake").unwrap();

        assert!(model_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
