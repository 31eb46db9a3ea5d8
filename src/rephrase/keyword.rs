// Context-aware template rewrite.
//
// Picks a canned polite phrase based on which family of insult the message
// contains. No network and effectively instant, but it only knows a handful
// of categories; anything it does not recognise is reported as a failure so
// the chain falls through to the static fallback phrase.

use async_trait::async_trait;

use super::traits::{RephraseError, RephraseProvider};

/// (keywords, replacement) in priority order. First category with a match wins.
const TEMPLATES: &[(&[&str], &str)] = &[
    (
        &["stupid", "idiot", "dumb", "moron"],
        "I respectfully disagree with that perspective.",
    ),
    (
        &["hate", "disgusting", "terrible", "awful", "worst"],
        "I understand there may be strong feelings about this, but let's keep the discussion respectful.",
    ),
    (
        &["shut up", "be quiet", "be silent"],
        "I'd prefer if we could have a constructive conversation.",
    ),
    (
        &["ugly", "gross", "hideous", "trash"],
        "I don't think that kind of comment is helpful here.",
    ),
    (
        &["loser", "failure", "worthless"],
        "Everyone has value and deserves to be treated with respect.",
    ),
];

const QUESTION_TEMPLATE: &str = "Could you help me understand this better?";

pub struct KeywordRephraser {
    id: String,
}

impl KeywordRephraser {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// Find the template for `text`, if any category applies.
pub fn template_for(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    TEMPLATES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, phrase)| *phrase)
        .or_else(|| text.contains('?').then_some(QUESTION_TEMPLATE))
}

#[async_trait]
impl RephraseProvider for KeywordRephraser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn rephrase(&self, text: &str) -> Result<String, RephraseError> {
        template_for(text)
            .map(str::to_string)
            .ok_or_else(|| RephraseError::InvalidResponse("no template matches".into()))
    }
}
