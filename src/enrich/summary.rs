use std::sync::OnceLock;

use regex::Regex;

use crate::util::text::normalize_text;

const MIN_SENTENCE_CHARS: usize = 40;
const MAX_SENTENCE_CHARS: usize = 400;

fn bullet_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*\d\.\)\s]+").expect("static regex"))
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("static regex"))
}

/// Where a set of bullets came from.
#[derive(Clone, Debug, PartialEq)]
pub enum Bullets {
    Remote(Vec<String>),
    Heuristic(Vec<String>),
    Disabled,
}

impl Bullets {
    pub fn source(&self) -> &'static str {
        match self {
            Bullets::Remote(_) => "remote",
            Bullets::Heuristic(_) => "heuristic",
            Bullets::Disabled => "disabled",
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            Bullets::Remote(b) | Bullets::Heuristic(b) => b,
            Bullets::Disabled => Vec::new(),
        }
    }
}

pub fn summary_prompt(text: &str, k: usize) -> String {
    format!(
        "Summarize this article into exactly {k} concise bullet points. \
         Each bullet should be a full sentence (max 30 words), no emojis, no markdown.\n\n\
         Article:\n{text}"
    )
}

/// One bullet per non-empty line, list markers stripped, at most `k`.
pub fn parse_bullets(raw: &str, k: usize) -> Vec<String> {
    raw.lines()
        .map(|line| bullet_marker().replace(&normalize_text(line), "").into_owned())
        .filter(|line| !line.is_empty())
        .take(k)
        .collect()
}

/// First `k` sentences of reasonable length, in text order.
pub fn heuristic_bullets(text: &str, k: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in sentence_end().find_iter(text) {
        // keep the punctuation, drop the whitespace after it
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| (MIN_SENTENCE_CHARS..=MAX_SENTENCE_CHARS).contains(&s.chars().count()))
        .take(k)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_markers_are_stripped_and_blank_lines_dropped() {
        let raw = "- First point here.\n\n* Second point.\n1. Third point.\n2) Fourth point.\n   \nFifth.";
        assert_eq!(
            parse_bullets(raw, 10),
            ["First point here.", "Second point.", "Third point.", "Fourth point.", "Fifth."]
        );
        assert_eq!(parse_bullets(raw, 2).len(), 2);
        assert!(parse_bullets("\n - \n", 5).is_empty());
    }

    #[test]
    fn heuristic_keeps_only_mid_length_sentences_in_order() {
        let a = "The new model halves inference cost on commodity GPUs today.";
        let b = "Researchers expect the technique to spread to other open models soon!";
        let text = format!("Short one. {a} Tiny? {b} {}.", "x".repeat(450));
        assert_eq!(heuristic_bullets(&text, 5), [a, b]);
        assert_eq!(heuristic_bullets(&text, 1), [a]);
    }

    #[test]
    fn heuristic_on_empty_text_is_empty() {
        assert!(heuristic_bullets("", 3).is_empty());
    }

    #[test]
    fn prompt_asks_for_exact_count() {
        let p = summary_prompt("body", 5);
        assert!(p.contains("exactly 5 concise bullet points"));
        assert!(p.ends_with("Article:\nbody"));
    }
}
