// Google Gemini provider (generateContent API).
//
// API docs: https://ai.google.dev/api/generate-content

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::text::{clean_rephrased_text, is_valid_rephrasing, user_prompt, SYSTEM_PROMPT};
use super::traits::{RephraseError, RephraseProvider};
use crate::output::truncate_chars;

pub struct GeminiProvider {
    id: String,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiProvider {
    pub fn new(id: &str, base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            id: id.to_string(),
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl RephraseProvider for GeminiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn rephrase(&self, text: &str) -> Result<String, RephraseError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RephraseError::Unavailable(format!("{} has no API key", self.id)));
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            system_instruction: Content::text(SYSTEM_PROMPT.to_string()),
            contents: vec![Content::text(user_prompt(text))],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 150,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RephraseError::Transport(format!(
                "Gemini returned {}: {}",
                status,
                truncate_chars(&body, 200)
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let content = extract_text(parsed)
            .ok_or_else(|| RephraseError::InvalidResponse("no candidates in response".into()))?;

        let cleaned = clean_rephrased_text(&content);
        if !is_valid_rephrasing(text, &cleaned) {
            return Err(RephraseError::InvalidResponse(format!(
                "rejected rewrite: {}",
                truncate_chars(&cleaned, 80)
            )));
        }

        debug!(provider = %self.id, model = %self.model, "Gemini rephrased text");
        Ok(cleaned)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    let text: String = candidate
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    (!text.is_empty()).then_some(text)
}

// --- generateContent request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "Let's "}, {"text": "pause."}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("Let's pause."));
    }

    #[test]
    fn test_extract_text_blocked_candidate() {
        // Safety-blocked candidates come back without content
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(extract_text(response).is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let provider = GeminiProvider::new("gemini", "http://127.0.0.1:9/v1beta", None, "m");
        let err = provider.rephrase("you idiot").await.unwrap_err();
        assert!(matches!(err, RephraseError::Unavailable(_)), "got {err:?}");
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = GenerateRequest {
            system_instruction: Content::text("sys".into()),
            contents: vec![Content::text("hi".into())],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 150,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 150);
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
    }
}
