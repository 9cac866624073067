use std::sync::OnceLock;

use regex::Regex;

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_text(s: &str) -> String {
    whitespace().replace_all(s, " ").trim().to_string()
}

/// First `max_chars` characters of `s` (char boundary safe).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
