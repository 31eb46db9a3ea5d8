// Rephrase provider trait and its failure taxonomy.
//
// A provider turns toxic text into a polite rewrite or reports why it could
// not. Every failure is recoverable: the chain logs it and moves on to the
// next provider, so nothing here ever reaches a chat participant.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single provider attempt failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RephraseError {
    /// The provider did not answer within its configured budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Network failure or a non-success HTTP status (quota, auth, 5xx).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered but the rewrite is empty, malformed, a refusal,
    /// or just the original text again.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The provider is not usable at all (e.g. missing credentials).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RephraseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RephraseError::InvalidResponse(e.to_string())
        } else {
            RephraseError::Transport(e.to_string())
        }
    }
}

/// A backend capable of rewriting toxic text.
#[async_trait]
pub trait RephraseProvider: Send + Sync {
    /// Stable identifier reported in `Decision::used_provider`.
    fn id(&self) -> &str;

    /// Attempt one rewrite. Implementations must not retry internally; the
    /// chain owns timeouts and ordering.
    async fn rephrase(&self, text: &str) -> Result<String, RephraseError>;
}
