use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Threshold used when POLITELY_THRESHOLD is unset.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 10_000;

/// Provider order used when POLITELY_PROVIDERS is unset.
pub const DEFAULT_PROVIDER_ORDER: &str = "groq,gemini,aiml,local,keyword";

/// Which toxicity scoring strategy to use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScorerBackend {
    /// Keyword heuristic (default): no files, no network
    Keyword,
    /// Local ONNX model: requires `politely download-model`
    Onnx,
    /// Google Perspective API: requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
}

impl ScorerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerBackend::Keyword => "keyword",
            ScorerBackend::Onnx => "onnx",
            ScorerBackend::Perspective => "perspective",
        }
    }
}

/// Wire protocol spoken by a rephrasing backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions`
    ChatCompletions,
    /// Google `generateContent`
    Gemini,
    /// Built-in keyword templates
    Keyword,
}

/// One entry of the rephrasing chain.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub enabled: bool,
    /// Remote APIs need a key; local servers and templates do not.
    pub requires_key: bool,
}

impl ProviderConfig {
    /// Enabled and has everything it needs to make a call.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.missing().is_none()
    }

    /// What is missing for this provider to be callable, if anything.
    pub fn missing(&self) -> Option<&'static str> {
        if self.kind != ProviderKind::Keyword && self.endpoint.is_empty() {
            return Some("endpoint");
        }
        if self.requires_key && self.api_key.is_none() {
            return Some("API key");
        }
        None
    }
}

/// Central configuration, loaded once at startup and read-only afterwards.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Scores strictly above this are toxic
    pub threshold: f64,
    pub scorer_backend: ScorerBackend,
    /// Fall back to the keyword heuristic when a model-based scorer errors
    /// or does not answer within `scorer_timeout`
    pub heuristic_fallback: bool,
    pub scorer_timeout: Duration,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
    /// Rephrasing providers in priority order, including disabled ones
    pub providers: Vec<ProviderConfig>,
    /// Static phrase used when every provider fails
    pub fallback_phrase: Option<String>,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let threshold = match get("POLITELY_THRESHOLD") {
            Some(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("POLITELY_THRESHOLD is not a number: {raw}"))?,
            None => DEFAULT_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("POLITELY_THRESHOLD must be between 0 and 1, got {threshold}");
        }

        let scorer_backend = match get("POLITELY_SCORER").as_deref() {
            None | Some("keyword") => ScorerBackend::Keyword,
            Some("onnx") => ScorerBackend::Onnx,
            Some("perspective") => ScorerBackend::Perspective,
            Some(other) => anyhow::bail!(
                "Unknown POLITELY_SCORER '{other}' (expected keyword, onnx or perspective)"
            ),
        };

        let heuristic_fallback = match get("POLITELY_HEURISTIC_FALLBACK") {
            Some(raw) => parse_bool("POLITELY_HEURISTIC_FALLBACK", &raw)?,
            None => true,
        };

        let scorer_timeout_ms = match get("POLITELY_SCORER_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("POLITELY_SCORER_TIMEOUT_MS is not a number: {raw}"))?,
            None => DEFAULT_SCORER_TIMEOUT_MS,
        };
        if scorer_timeout_ms == 0 {
            anyhow::bail!("POLITELY_SCORER_TIMEOUT_MS must be greater than zero");
        }

        let model_dir = get("POLITELY_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::toxicity::download::default_model_dir);

        let order = get("POLITELY_PROVIDERS").unwrap_or_else(|| DEFAULT_PROVIDER_ORDER.to_string());
        let mut providers: Vec<ProviderConfig> = Vec::new();
        for id in order.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id = id.to_lowercase();
            if providers.iter().any(|p| p.id == id) {
                anyhow::bail!("Provider '{id}' listed twice in POLITELY_PROVIDERS");
            }
            providers.push(provider_config(&id, &get)?);
        }

        let port = match get("POLITELY_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("POLITELY_PORT is not a valid port: {raw}"))?,
            None => 8000,
        };

        Ok(Self {
            threshold,
            scorer_backend,
            heuristic_fallback,
            scorer_timeout: Duration::from_millis(scorer_timeout_ms),
            model_dir,
            perspective_api_key: get("PERSPECTIVE_API_KEY").unwrap_or_default(),
            providers,
            fallback_phrase: get("POLITELY_FALLBACK_PHRASE"),
            bind: get("POLITELY_BIND").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        })
    }

    /// Providers that will actually be placed in the chain, in order.
    pub fn usable_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.is_usable())
    }

    /// Validate that the chosen scorer backend has what it needs.
    /// For ONNX: model files must exist (or user should run download-model).
    /// For Perspective: API key must be set.
    pub fn require_scorer(&self) -> Result<()> {
        match self.scorer_backend {
            ScorerBackend::Keyword => Ok(()),
            ScorerBackend::Onnx => {
                if !crate::toxicity::download::model_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "ONNX model files not found in {}\n\
                         Run `politely download-model` to download them.\n\
                         Or set POLITELY_SCORER=keyword to use the keyword heuristic instead.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            ScorerBackend::Perspective => {
                if self.perspective_api_key.is_empty() {
                    anyhow::bail!(
                        "PERSPECTIVE_API_KEY not set. Add it to your .env file.\n\
                         See .env.example for the required variables."
                    );
                }
                Ok(())
            }
        }
    }
}

/// Defaults for the known provider ids, overridable per provider via
/// `POLITELY_<ID>_ENABLED`, `POLITELY_<ID>_TIMEOUT_MS` and the
/// provider-specific key/model variables.
fn provider_config<G>(id: &str, get: &G) -> Result<ProviderConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let (kind, endpoint, key_var, model_var, default_model, default_timeout_ms, requires_key) =
        match id {
            "groq" => (
                ProviderKind::ChatCompletions,
                Some("https://api.groq.com/openai/v1".to_string()),
                Some("GROQ_API_KEY"),
                "GROQ_MODEL",
                "llama-3.3-70b-versatile",
                5_000,
                true,
            ),
            "gemini" => (
                ProviderKind::Gemini,
                Some("https://generativelanguage.googleapis.com/v1beta".to_string()),
                Some("GEMINI_API_KEY"),
                "GEMINI_MODEL",
                "gemini-1.5-flash",
                5_000,
                true,
            ),
            "aiml" => (
                ProviderKind::ChatCompletions,
                Some("https://api.aimlapi.com/v1".to_string()),
                Some("AIMLAPI_KEY"),
                "AIMLAPI_MODEL",
                "gpt-4o-mini",
                5_000,
                true,
            ),
            // Local model server; unconfigured until a URL is given
            "local" => (
                ProviderKind::ChatCompletions,
                get("POLITELY_LOCAL_LLM_URL"),
                None,
                "POLITELY_LOCAL_LLM_MODEL",
                "llama3.2",
                10_000,
                false,
            ),
            "keyword" => (ProviderKind::Keyword, None, None, "", "", 100, false),
            other => anyhow::bail!(
                "Unknown provider '{other}' in POLITELY_PROVIDERS \
                 (expected groq, gemini, aiml, local or keyword)"
            ),
        };

    let upper = id.to_uppercase();

    let enabled = match get(&format!("POLITELY_{upper}_ENABLED")) {
        Some(raw) => parse_bool(&format!("POLITELY_{upper}_ENABLED"), &raw)?,
        None => true,
    };

    let timeout_ms = match get(&format!("POLITELY_{upper}_TIMEOUT_MS")) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("POLITELY_{upper}_TIMEOUT_MS is not a number: {raw}"))?,
        None => default_timeout_ms,
    };
    if timeout_ms == 0 {
        anyhow::bail!("POLITELY_{upper}_TIMEOUT_MS must be greater than zero");
    }

    let model = if model_var.is_empty() {
        String::new()
    } else {
        get(model_var).unwrap_or_else(|| default_model.to_string())
    };

    Ok(ProviderConfig {
        id: id.to_string(),
        kind,
        endpoint: endpoint.unwrap_or_default(),
        api_key: key_var.and_then(get),
        model,
        timeout: Duration::from_millis(timeout_ms),
        enabled,
        requires_key,
    })
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{name} must be true or false, got {raw}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.scorer_backend, ScorerBackend::Keyword);
        assert!(config.heuristic_fallback);
        let ids: Vec<_> = config.providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["groq", "gemini", "aiml", "local", "keyword"]);
        // Without keys or a local URL only the keyword templates are usable
        let usable: Vec<_> = config.usable_providers().map(|p| p.id.as_str()).collect();
        assert_eq!(usable, vec!["keyword"]);
    }

    #[test]
    fn test_scorer_timeout() {
        assert_eq!(
            load(&[]).unwrap().scorer_timeout,
            Duration::from_millis(DEFAULT_SCORER_TIMEOUT_MS)
        );
        let config = load(&[("POLITELY_SCORER_TIMEOUT_MS", "750")]).unwrap();
        assert_eq!(config.scorer_timeout, Duration::from_millis(750));
        assert!(load(&[("POLITELY_SCORER_TIMEOUT_MS", "0")]).is_err());
        assert!(load(&[("POLITELY_SCORER_TIMEOUT_MS", "soon")]).is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(load(&[("POLITELY_THRESHOLD", "1.5")]).is_err());
        assert!(load(&[("POLITELY_THRESHOLD", "abc")]).is_err());
        let config = load(&[("POLITELY_THRESHOLD", "0.75")]).unwrap();
        assert_eq!(config.threshold, 0.75);
    }

    #[test]
    fn test_key_makes_provider_usable() {
        let config = load(&[("GROQ_API_KEY", "gsk_test")]).unwrap();
        let groq = &config.providers[0];
        assert!(groq.is_usable());
        assert_eq!(groq.model, "llama-3.3-70b-versatile");
        assert_eq!(groq.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = load(&[("GROQ_API_KEY", "   ")]).unwrap();
        assert_eq!(config.providers[0].missing(), Some("API key"));
    }

    #[test]
    fn test_disable_flag_and_timeout_override() {
        let config = load(&[
            ("POLITELY_PROVIDERS", "gemini, keyword"),
            ("GEMINI_API_KEY", "k"),
            ("POLITELY_GEMINI_TIMEOUT_MS", "1200"),
            ("POLITELY_KEYWORD_ENABLED", "false"),
        ])
        .unwrap();
        assert_eq!(config.providers[0].timeout, Duration::from_millis(1200));
        assert!(!config.providers[1].is_usable());
        let usable: Vec<_> = config.usable_providers().map(|p| p.id.as_str()).collect();
        assert_eq!(usable, vec!["gemini"]);
    }

    #[test]
    fn test_local_provider_needs_url_not_key() {
        let config = load(&[
            ("POLITELY_PROVIDERS", "local"),
            ("POLITELY_LOCAL_LLM_URL", "http://localhost:11434/v1"),
        ])
        .unwrap();
        assert!(config.providers[0].is_usable());
        assert_eq!(config.providers[0].model, "llama3.2");
    }

    #[test]
    fn test_unknown_and_duplicate_providers_rejected() {
        assert!(load(&[("POLITELY_PROVIDERS", "groq,openai")]).is_err());
        assert!(load(&[("POLITELY_PROVIDERS", "groq,GROQ")]).is_err());
    }

    #[test]
    fn test_empty_provider_list_allowed() {
        let config = load(&[("POLITELY_PROVIDERS", " , ")]).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_unknown_scorer_rejected() {
        assert!(load(&[("POLITELY_SCORER", "magic")]).is_err());
    }

    #[test]
    fn test_require_scorer_perspective_needs_key() {
        let config = load(&[("POLITELY_SCORER", "perspective")]).unwrap();
        assert!(config.require_scorer().is_err());
    }
}
