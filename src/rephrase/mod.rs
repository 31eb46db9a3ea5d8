// Rephrasing: ordered fallback across rewrite backends.
//
// RephraseProvider is the per-backend interface. RephraseChain orders the
// configured providers and ends on LocalFallback, which cannot fail.

pub mod chain;
pub mod chat;
pub mod fallback;
pub mod gemini;
pub mod keyword;
pub mod text;
pub mod traits;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, ProviderConfig, ProviderKind};
use chain::RephraseChain;
use fallback::LocalFallback;
use traits::RephraseProvider;

/// Build the chain from configuration, skipping disabled and unconfigured
/// providers.
pub fn build_chain(config: &Config) -> RephraseChain {
    let mut chain = RephraseChain::new(LocalFallback::new(config.fallback_phrase.as_deref()));

    for provider in config.providers.iter().filter(|p| !p.is_usable()) {
        if !provider.enabled {
            info!(provider = %provider.id, "Rephrase provider disabled, skipping");
        } else if let Some(missing) = provider.missing() {
            info!(provider = %provider.id, missing, "Rephrase provider not configured, skipping");
        }
    }

    for provider in config.usable_providers() {
        chain = chain.with_provider(create_provider(provider), provider.timeout);
    }

    info!(
        providers = ?chain.provider_ids(),
        worst_case_ms = chain.worst_case_latency().as_millis() as u64,
        "Rephrase chain ready"
    );
    chain
}

fn create_provider(config: &ProviderConfig) -> Arc<dyn RephraseProvider> {
    match config.kind {
        ProviderKind::ChatCompletions => Arc::new(chat::ChatCompletionsProvider::new(
            &config.id,
            &config.endpoint,
            config.api_key.clone(),
            &config.model,
        )
        .key_required(config.requires_key)),
        ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(
            &config.id,
            &config.endpoint,
            config.api_key.clone(),
            &config.model,
        )),
        ProviderKind::Keyword => Arc::new(keyword::KeywordRephraser::new(&config.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_unconfigured_providers_are_skipped() {
        let chain = build_chain(&config(&[]));
        assert_eq!(chain.provider_ids(), vec!["keyword"]);
    }

    #[test]
    fn test_configured_order_is_preserved() {
        let chain = build_chain(&config(&[
            ("POLITELY_PROVIDERS", "aiml,groq,keyword"),
            ("GROQ_API_KEY", "a"),
            ("AIMLAPI_KEY", "b"),
        ]));
        assert_eq!(chain.provider_ids(), vec!["aiml", "groq", "keyword"]);
    }

    #[tokio::test]
    async fn test_remote_providers_without_keys_report_unavailable() {
        let config = config(&[("POLITELY_PROVIDERS", "groq,gemini,aiml")]);
        for provider in &config.providers {
            let err = create_provider(provider).rephrase("you idiot").await.unwrap_err();
            assert!(
                matches!(err, traits::RephraseError::Unavailable(_)),
                "{}: {err:?}",
                provider.id
            );
        }
    }

    #[tokio::test]
    async fn test_everything_disabled_resolves_to_fallback_phrase() {
        let chain = build_chain(&config(&[
            ("POLITELY_KEYWORD_ENABLED", "false"),
            ("POLITELY_FALLBACK_PHRASE", "Let's keep it kind."),
        ]));
        assert!(chain.provider_ids().is_empty());
        let out = chain.rephrase("you idiot").await;
        assert_eq!(out.provider, chain::UsedProvider::Fallback);
        assert_eq!(out.text, "Let's keep it kind.");
    }
}
