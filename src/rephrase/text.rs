// Prompting and post-processing shared by the LLM-backed providers.
//
// Chat models like to wrap their answer in quotes, prefix it with
// "Here's a polite version:", or refuse outright. clean_rephrased_text strips
// the decoration and is_valid_rephrasing rejects refusals and echoes so the
// chain can move on to the next provider.

use std::sync::OnceLock;

use regex_lite::Regex;

pub const SYSTEM_PROMPT: &str = "You are a text moderation assistant. Your task is to rephrase \
toxic, offensive, or inappropriate messages into polite, respectful versions while preserving \
the core meaning and context. Output ONLY the rephrased text without any explanations, \
prefixes, or additional commentary.";

/// Minimum length, in characters, of an acceptable rewrite.
pub const MIN_REPHRASE_CHARS: usize = 5;

const ASSISTANT_PREFIXES: &[&str] = &[
    "Here's a polite version:",
    "Here's the polite version:",
    "Here is a polite version:",
    "Here is the polite version:",
    "Here is the rewritten text:",
    "The rewritten message is:",
    "Rewritten text:",
    "Rewritten:",
    "Polite version:",
    "Polite:",
    "Rephrased:",
];

const REFUSAL_PATTERNS: &[&str] = &[
    "i cannot",
    "i can't",
    "i'm unable",
    "i am unable",
    "unable to",
    "sorry",
    "i apologize",
    "inappropriate",
    "not appropriate",
    "against policy",
    "i don't feel comfortable",
];

/// Build the user turn sent to chat models.
pub fn user_prompt(text: &str) -> String {
    format!(
        "Rewrite the following message to be polite and respectful while keeping its \
         meaning and context. Output only the rewritten text:\n\n{text}"
    )
}

fn edge_quotes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^["']|["']$"#).expect("valid regex"))
}

fn edge_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*\*|!?\*\*$").expect("valid regex"))
}

fn leading_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[:;\-—]\s*").expect("valid regex"))
}

/// Strip quotes, markdown bold and assistant prefixes from model output.
pub fn clean_rephrased_text(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    cleaned = edge_quotes().replace_all(&cleaned, "").into_owned();
    cleaned = edge_bold().replace_all(&cleaned, "").trim().to_string();

    for prefix in ASSISTANT_PREFIXES {
        if starts_with_ignore_case(&cleaned, prefix) {
            cleaned = cleaned[prefix.len()..].trim().to_string();
            cleaned = leading_separator().replace(&cleaned, "").into_owned();
        }
    }

    cleaned = edge_quotes().replace_all(cleaned.trim(), "").into_owned();
    cleaned.trim().to_string()
}

/// Reject rewrites that are too short, refuse the task, or echo the input.
pub fn is_valid_rephrasing(original: &str, rephrased: &str) -> bool {
    if rephrased.chars().count() < MIN_REPHRASE_CHARS {
        return false;
    }

    let lower = rephrased.to_lowercase();
    if REFUSAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }

    original.trim().to_lowercase() != rephrased.trim().to_lowercase()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
