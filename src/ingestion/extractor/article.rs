use scraper::{Html, Selector};

use super::ExtractStage;
use super::dom::visible_text;
use crate::util::text::normalize_text;

/// Shorter container text is treated as navigation chrome, not an article body.
const MIN_ARTICLE_CHARS: usize = 200;

// likely article containers, most specific first
const CANDIDATES: &[&str] = &[
    "[itemprop=articleBody]",
    "article",
    "main",
    "[role=main]",
    "#content",
    ".post-content",
    ".entry-content",
];

/// Boilerplate removal: text of the first recognised article container.
pub struct ArticleStage;

impl ExtractStage for ArticleStage {
    fn name(&self) -> &'static str {
        "article"
    }

    fn extract(&self, doc: &Html, _raw: &str) -> Option<String> {
        CANDIDATES.iter().find_map(|sel| {
            let sel = Selector::parse(sel).ok()?;
            let node = doc.select(&sel).next()?;
            let text = normalize_text(&visible_text(node));
            (text.chars().count() >= MIN_ARTICLE_CHARS).then_some(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "Transformers keep getting cheaper to serve as quantization improves. ".repeat(5)
    }

    #[test]
    fn takes_article_container_and_drops_chrome() {
        let html = format!(
            "<html><body><header>Site</header><article><h1>Title</h1><p>{}</p><aside>Related</aside></article></body></html>",
            long_text()
        );
        let out = ArticleStage.extract(&Html::parse_document(&html), &html).unwrap();
        assert!(out.starts_with("Title Transformers"));
        assert!(!out.contains("Related"));
        assert!(!out.contains("Site"));
    }

    #[test]
    fn short_containers_do_not_count() {
        let html = "<html><body><main>Too short</main></body></html>";
        assert_eq!(ArticleStage.extract(&Html::parse_document(html), html), None);
    }
}
