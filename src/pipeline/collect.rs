use std::collections::HashSet;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::Pipeline;
use super::types::{FeedReport, FeedStatus};
use crate::http::FetchError;
use crate::ingestion::{ConditionalFeedFetcher, FeedItem, FeedSource, filter_entries, sort_newest_first};
use crate::telemetry::ops::run::Phase as RunPhase;

impl Pipeline {
    /// Fetch every feed in order, filter each, then merge newest-first and cap.
    /// A failing feed is reported and skipped.
    pub async fn collect(&self, feeds: &[FeedSource], cancel: &CancellationToken) -> (Vec<FeedItem>, Vec<FeedReport>) {
        let fetcher = ConditionalFeedFetcher::new(&self.http, &self.cache).with_min_delay(self.feed_delay);
        let mut items = Vec::new();
        let mut reports = Vec::with_capacity(feeds.len());

        for feed in feeds {
            let mut report = FeedReport {
                name: feed.name.clone(),
                url: feed.url.clone(),
                status: FeedStatus::Fetched,
                received: 0,
                kept: 0,
                error: None,
            };
            let span = self.log.span_kv(&RunPhase::Feed, [("feed", feed.name.clone()), ("url", feed.url.clone())]);
            match fetcher.fetch(&feed.url, cancel).instrument(span).await {
                Ok(fetched) if fetched.not_modified => {
                    report.status = FeedStatus::NotModified;
                }
                Ok(fetched) => {
                    let kept = filter_entries(
                        &feed.name,
                        &fetched.entries,
                        self.settings.days_back,
                        self.settings.max_per_feed,
                        Utc::now(),
                    );
                    report.received = fetched.entries.len();
                    report.kept = kept.len();
                    items.extend(kept);
                }
                Err(FetchError::Cancelled) => {
                    report.status = FeedStatus::Cancelled;
                    reports.push(report);
                    break;
                }
                Err(e) => {
                    self.log.warn_kv(
                        &format!("⚠️  [FEED] {} failed: {}", feed.name, e),
                        [("feed", feed.url.clone()), ("error", e.to_string())],
                    );
                    report.status = FeedStatus::Failed;
                    report.error = Some(e.to_string());
                }
            }
            self.log.feed_summary(&feed.name, report.received, report.kept);
            reports.push(report);
        }

        let mut items = dedupe_by_uid(sort_newest_first(items));
        items.truncate(self.settings.total_limit);
        (items, reports)
    }
}

// The same article can appear in several feeds; keep its first (newest) occurrence.
fn dedupe_by_uid(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|it| seen.insert(it.uid.clone())).collect()
}
