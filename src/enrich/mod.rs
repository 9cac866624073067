//! Bullet summaries and topic tags for one article.
//!
//! Two independent chains over the same truncated text. Summaries try the
//! remote model first and fall back to a sentence heuristic; tags are remote
//! only. Neither chain ever fails: problems resolve to fewer (or no) results.

use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::http::until_cancelled;
use crate::llm::{ChatCompletionRequest, LlmClient};
use crate::util::text::truncate_chars;

mod summary;
mod tags;

pub use summary::{Bullets, heuristic_bullets, parse_bullets};
pub use tags::parse_tags;

const SUMMARY_MAX_TOKENS: u32 = 512;
const TAGS_MAX_TOKENS: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Remote language model, heuristic fallback for summaries.
    Remote,
    /// Heuristic summaries only; no tags.
    Local,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnrichConfig {
    pub summary_enabled: bool,
    pub bullets: usize,
    pub tags_enabled: bool,
    pub tags_max: usize,
    pub max_chars: usize,
    pub backend: Backend,
}

impl EnrichConfig {
    /// Article text is only worth fetching when at least one chain is on.
    pub fn wants_text(&self) -> bool {
        self.summary_enabled || self.tags_enabled
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EnrichmentResult {
    pub bullets: Vec<String>,
    pub tags: Vec<String>,
}

pub struct Enricher {
    cfg: EnrichConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl Enricher {
    /// The remote capability is fixed here: `Local` ignores any client it is given.
    pub fn new(cfg: EnrichConfig, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let llm = match cfg.backend {
            Backend::Remote => llm,
            Backend::Local => None,
        };
        Self { cfg, llm }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.cfg
    }

    pub fn has_remote(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn enrich(&self, text: &str, cancel: &CancellationToken) -> EnrichmentResult {
        let text = truncate_chars(text.trim(), self.cfg.max_chars);
        if text.is_empty() {
            return EnrichmentResult::default();
        }
        let bullets = self.summarize(text, cancel).await;
        debug!(source = bullets.source(), "summary");
        EnrichmentResult { bullets: bullets.into_vec(), tags: self.tag(text, cancel).await }
    }

    pub async fn summarize(&self, text: &str, cancel: &CancellationToken) -> Bullets {
        let k = self.cfg.bullets;
        if !self.cfg.summary_enabled || k == 0 {
            return Bullets::Disabled;
        }
        if let Some(raw) = self.ask(summary::summary_prompt(text, k), SUMMARY_MAX_TOKENS, cancel).await {
            let bullets = parse_bullets(&raw, k);
            if !bullets.is_empty() {
                return Bullets::Remote(bullets);
            }
            debug!("model returned no usable bullets, using heuristic");
        }
        Bullets::Heuristic(heuristic_bullets(text, k))
    }

    pub async fn tag(&self, text: &str, cancel: &CancellationToken) -> Vec<String> {
        let n = self.cfg.tags_max;
        if !self.cfg.tags_enabled || n == 0 {
            return Vec::new();
        }
        match self.ask(tags::tags_prompt(text, n), TAGS_MAX_TOKENS, cancel).await {
            Some(raw) => parse_tags(&raw, n),
            None => Vec::new(),
        }
    }

    // None covers: no remote client, call error, cancellation.
    async fn ask(&self, prompt: String, max_tokens: u32, cancel: &CancellationToken) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let req = ChatCompletionRequest::user(prompt, max_tokens);
        match until_cancelled(cancel, llm.chat_completion(req)).await? {
            Ok(completion) => Some(completion.content),
            Err(e) => {
                warn!(error = %e, "remote enrichment failed");
                None
            }
        }
    }
}
