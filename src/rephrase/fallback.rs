// The last link of every chain: a fixed neutral phrase.
//
// Deliberately not a RephraseProvider. It has no error channel and ignores
// its input, so the chain can always end on it.

pub const DEFAULT_FALLBACK_PHRASE: &str = "I'd like to express this in a more constructive way.";

#[derive(Debug, Clone)]
pub struct LocalFallback {
    phrase: String,
}

impl LocalFallback {
    /// Use `phrase` when it has visible content, otherwise the built-in default.
    pub fn new(phrase: Option<&str>) -> Self {
        let phrase = phrase
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_FALLBACK_PHRASE);
        Self {
            phrase: phrase.to_string(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn rephrase(&self, _text: &str) -> String {
        self.phrase.clone()
    }
}

impl Default for LocalFallback {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_phrase_uses_default() {
        assert_eq!(LocalFallback::new(Some("   ")).phrase(), DEFAULT_FALLBACK_PHRASE);
        assert_eq!(LocalFallback::new(None).phrase(), DEFAULT_FALLBACK_PHRASE);
    }

    #[test]
    fn test_output_ignores_input() {
        let fallback = LocalFallback::new(Some("Let's keep it civil."));
        assert_eq!(fallback.rephrase("you idiot"), "Let's keep it civil.");
        assert_eq!(fallback.rephrase("I hate this"), "Let's keep it civil.");
    }
}
