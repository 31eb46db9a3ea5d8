// Output formatting: terminal display for the CLI, plus the preview helper
// used wherever message text ends up in a log line.

pub mod terminal;

/// Shorten `text` to `max_chars` characters for display, appending "..."
/// when anything was cut. Counts chars, not bytes, so emoji are safe.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn test_long_text_cut_on_char_boundary() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll...");
        assert_eq!(truncate_chars("🙂🙂🙂", 2), "🙂🙂...");
    }
}
