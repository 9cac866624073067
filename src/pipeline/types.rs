use serde::Serialize;

use crate::enrich::Backend;
use crate::ingestion::{FeedItem, FeedSource};
use crate::publish::PublishDecision;

#[derive(Serialize)]
pub struct RunPlan {
    pub feeds: Vec<FeedSource>,
    pub days_back: i64,
    pub max_per_feed: usize,
    pub total_limit: usize,
    pub summary_enabled: bool,
    pub summary_bullets: usize,
    pub tags_enabled: bool,
    pub tags_max: usize,
    pub summarizer: Backend,
    pub remote_available: bool,
    pub store_configured: bool,
    pub concurrency: usize,
    pub cache_path: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Fetched,
    NotModified,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeedReport {
    pub name: String,
    pub url: String,
    pub status: FeedStatus,
    pub received: usize,
    pub kept: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome {
    Published(PublishDecision),
    Error(String),
    Cancelled,
}

impl ItemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Published(d) => d.as_str(),
            ItemOutcome::Error(_) => "error",
            ItemOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemReport {
    pub uid: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub extraction: &'static str,
    pub bullets: usize,
    pub tags: usize,
    #[serde(skip)]
    pub result: ItemOutcome,
}

impl ItemReport {
    pub fn new(item: &FeedItem, result: ItemOutcome) -> Self {
        let error = match &result {
            ItemOutcome::Error(e) => Some(e.clone()),
            _ => None,
        };
        Self {
            uid: item.uid.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            source: item.source.clone(),
            outcome: result.label(),
            error,
            extraction: "skipped",
            bullets: 0,
            tags: 0,
            result,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub considered: usize,
    pub created: usize,
    pub skipped_exists: usize,
    pub skipped_uncertain: usize,
    pub errors: usize,
    pub cancelled: usize,
}

impl RunTotals {
    pub fn tally(items: &[ItemReport]) -> Self {
        let mut t = RunTotals { considered: items.len(), ..Default::default() };
        for it in items {
            match it.result {
                ItemOutcome::Published(PublishDecision::Created) => t.created += 1,
                ItemOutcome::Published(PublishDecision::SkippedExists) => t.skipped_exists += 1,
                ItemOutcome::Published(PublishDecision::SkippedUncertain) => t.skipped_uncertain += 1,
                ItemOutcome::Error(_) => t.errors += 1,
                ItemOutcome::Cancelled => t.cancelled += 1,
            }
        }
        t
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub feeds: Vec<FeedReport>,
    pub totals: RunTotals,
    pub items: Vec<ItemReport>,
}
