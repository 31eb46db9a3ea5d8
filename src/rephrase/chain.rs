// RephraseChain: ordered providers with a fallback that cannot fail.
//
// Providers are tried strictly in priority order, each under its own
// timeout. The first non-empty rewrite wins. Failures are recorded and the
// chain moves on; nothing is retried within a call. When every provider
// has failed (or none are configured) the static fallback phrase is used,
// so `rephrase` is total: it always returns non-empty text and never
// takes longer than the sum of the provider timeouts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use super::fallback::LocalFallback;
use super::traits::{RephraseError, RephraseProvider};

/// Which source produced the text a receiver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsedProvider {
    /// Text was not toxic and passed through untouched.
    None,
    /// A configured provider, by id.
    Provider(String),
    /// The static fallback phrase.
    Fallback,
}

impl UsedProvider {
    pub fn as_str(&self) -> &str {
        match self {
            UsedProvider::None => "none",
            UsedProvider::Provider(id) => id,
            UsedProvider::Fallback => "fallback",
        }
    }
}

impl fmt::Display for UsedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UsedProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One failed provider attempt.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider_id: String,
    pub error: RephraseError,
}

/// Result of running the chain for one message.
#[derive(Debug, Clone)]
pub struct Rephrasing {
    pub text: String,
    pub provider: UsedProvider,
    /// Providers that were tried and failed before `provider`, in order.
    pub failures: Vec<ProviderFailure>,
}

struct ChainLink {
    provider: Arc<dyn RephraseProvider>,
    timeout: Duration,
}

pub struct RephraseChain {
    links: Vec<ChainLink>,
    fallback: LocalFallback,
}

impl RephraseChain {
    /// A chain with no providers: every call resolves to the fallback.
    pub fn new(fallback: LocalFallback) -> Self {
        Self {
            links: Vec::new(),
            fallback,
        }
    }

    /// Append a provider at the lowest priority so far.
    pub fn with_provider(mut self, provider: Arc<dyn RephraseProvider>, timeout: Duration) -> Self {
        self.links.push(ChainLink { provider, timeout });
        self
    }

    /// Provider ids in the order they are tried.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.provider.id()).collect()
    }

    pub fn fallback_phrase(&self) -> &str {
        self.fallback.phrase()
    }

    /// Upper bound on how long `rephrase` can take.
    pub fn worst_case_latency(&self) -> Duration {
        self.links.iter().map(|link| link.timeout).sum()
    }

    /// Rewrite `text`. Never fails.
    pub async fn rephrase(&self, text: &str) -> Rephrasing {
        let mut failures = Vec::new();

        for link in &self.links {
            let id = link.provider.id();
            let attempt = match tokio::time::timeout(link.timeout, link.provider.rephrase(text)).await
            {
                Ok(Ok(rewritten)) if rewritten.trim().is_empty() => Err(
                    RephraseError::InvalidResponse("empty rewrite".to_string()),
                ),
                Ok(result) => result,
                Err(_) => Err(RephraseError::Timeout(link.timeout)),
            };

            match attempt {
                Ok(rewritten) => {
                    debug!(provider = id, failed = failures.len(), "Rephrased text");
                    return Rephrasing {
                        text: rewritten,
                        provider: UsedProvider::Provider(id.to_string()),
                        failures,
                    };
                }
                Err(error) => {
                    warn!(provider = id, error = %error, "Rephrase provider failed, trying next");
                    failures.push(ProviderFailure {
                        provider_id: id.to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            attempted = failures.len(),
            "All rephrase providers failed, using fallback phrase"
        );
        Rephrasing {
            text: self.fallback.rephrase(text),
            provider: UsedProvider::Fallback,
            failures,
        }
    }
}
