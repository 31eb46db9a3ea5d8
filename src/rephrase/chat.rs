// OpenAI-compatible chat completions provider.
//
// Groq, AI/ML API and local model servers (Ollama, llama.cpp server, vLLM)
// all speak the same `/chat/completions` dialect, so one client covers the
// remote APIs and the local model-based rewrite. Only the base URL, model
// name and optional bearer key differ.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::text::{clean_rephrased_text, is_valid_rephrasing, user_prompt, SYSTEM_PROMPT};
use super::traits::{RephraseError, RephraseProvider};
use crate::output::truncate_chars;

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 150;

pub struct ChatCompletionsProvider {
    id: String,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    key_required: bool,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(id: &str, base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            id: id.to_string(),
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            key_required: false,
            model: model.to_string(),
        }
    }

    /// Hosted APIs refuse unauthenticated calls; fail fast instead of
    /// sending one.
    pub fn key_required(mut self, required: bool) -> Self {
        self.key_required = required;
        self
    }

    fn request_body<'a>(&'a self, text: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(text),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl RephraseProvider for ChatCompletionsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn rephrase(&self, text: &str) -> Result<String, RephraseError> {
        if self.key_required && self.api_key.is_none() {
            return Err(RephraseError::Unavailable(format!("{} has no API key", self.id)));
        }
        let url = format!("{}/chat/completions", self.base_url);

        let mut request = self.client.post(&url).json(&self.request_body(text));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RephraseError::Transport(format!(
                "{} returned {}: {}",
                self.id,
                status,
                truncate_chars(&body, 200)
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = extract_content(parsed)
            .ok_or_else(|| RephraseError::InvalidResponse("no choices in response".into()))?;

        let cleaned = clean_rephrased_text(&content);
        if !is_valid_rephrasing(text, &cleaned) {
            return Err(RephraseError::InvalidResponse(format!(
                "rejected rewrite: {}",
                truncate_chars(&cleaned, 80)
            )));
        }

        debug!(provider = %self.id, model = %self.model, "Chat completion rephrased text");
        Ok(cleaned)
    }
}

fn extract_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
}

// --- OpenAI-compatible request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = ChatCompletionsProvider::new(
            "groq",
            "https://api.groq.com/openai/v1/",
            None,
            "llama-3.3-70b-versatile",
        );
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(provider.id(), "groq");
    }

    #[test]
    fn test_request_body_shape() {
        let provider = ChatCompletionsProvider::new("groq", "http://x", None, "m");
        let value = serde_json::to_value(provider.request_body("shut up")).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_tokens"], 150);
    }

    #[test]
    fn test_extract_content_first_choice() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "Please stop."}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_content(response).as_deref(), Some("Please stop."));
    }

    #[test]
    fn test_extract_content_empty_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_content(response).is_none());
    }

    #[tokio::test]
    async fn test_missing_required_key_is_unavailable() {
        let provider =
            ChatCompletionsProvider::new("groq", "http://127.0.0.1:9/v1", None, "m").key_required(true);
        let err = provider.rephrase("you idiot").await.unwrap_err();
        assert!(matches!(err, RephraseError::Unavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let provider = ChatCompletionsProvider::new("local", "http://127.0.0.1:9/v1", None, "m");
        let err = provider.rephrase("you idiot").await.unwrap_err();
        assert!(matches!(err, RephraseError::Transport(_)), "got {err:?}");
    }
}
