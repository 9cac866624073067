use std::sync::OnceLock;

use regex::Regex;

use crate::util::text::normalize_text;

const MAX_TAG_WORDS: usize = 3;

fn tag_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[#\-\*\d\.\)\s]+").expect("static regex"))
}

pub fn tags_prompt(text: &str, n: usize) -> String {
    format!(
        "Extract topical keywords from the article. \
         Return EXACTLY {n} short tags, lowercased, no hashtags, no emojis. \
         Prefer domain terms (e.g., 'diffusion models', 'rag', 'inference'). \
         Output as comma-separated list only.\n\n\
         Article:\n{text}"
    )
}

/// Comma/line separated tags: markers stripped, lowercase, at most three words,
/// deduplicated in first-seen order, at most `n`.
pub fn parse_tags(raw: &str, n: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split([',', '\n']) {
        if out.len() >= n {
            break;
        }
        let tag = tag_marker().replace(&normalize_text(part), "").to_lowercase();
        if tag.is_empty() || tag.split_whitespace().count() > MAX_TAG_WORDS {
            continue;
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
