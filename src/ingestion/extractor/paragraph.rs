use scraper::{Html, Selector};

use super::ExtractStage;
use super::dom::{inside_stripped, visible_text};
use crate::util::text::normalize_text;

/// All `<p>` text outside script/style/nav/header/footer/form/aside, joined with spaces.
pub struct ParagraphStage;

impl ExtractStage for ParagraphStage {
    fn name(&self) -> &'static str {
        "paragraphs"
    }

    fn extract(&self, doc: &Html, _raw: &str) -> Option<String> {
        let p = Selector::parse("p").ok()?;
        let joined = doc
            .select(&p)
            .filter(|el| !inside_stripped(el))
            .map(|el| normalize_text(&visible_text(el)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

/// Last resort: the whole response body, whitespace-normalised.
pub struct RawBodyStage;

impl ExtractStage for RawBodyStage {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn extract(&self, _doc: &Html, raw: &str) -> Option<String> {
        let text = normalize_text(raw);
        (!text.is_empty()).then_some(text)
    }
}
