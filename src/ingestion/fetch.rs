use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::parse::parse_entries;
use super::types::RawEntry;
use crate::cache::{CacheEntry, FeedCacheStore};
use crate::http::{FetchError, HttpClient, until_cancelled};

pub const FEED_TIMEOUT: Duration = Duration::from_secs(20);
/// Pause after every fresh download, independent of retries.
pub const FEED_MIN_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct FeedFetch {
    pub entries: Vec<RawEntry>,
    pub not_modified: bool,
}

/// Conditional GET of a feed using the validators remembered in the cache.
pub struct ConditionalFeedFetcher<'a> {
    http: &'a HttpClient,
    cache: &'a FeedCacheStore,
    timeout: Duration,
    min_delay: Duration,
}

impl<'a> ConditionalFeedFetcher<'a> {
    pub fn new(http: &'a HttpClient, cache: &'a FeedCacheStore) -> Self {
        Self { http, cache, timeout: FEED_TIMEOUT, min_delay: FEED_MIN_DELAY }
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    // 304 -> no entries, cache untouched (success).
    // 200 -> parsed entries; cache replaced with whatever validators came back.
    // anything else -> FetchError::Status, feed-level failure.
    pub async fn fetch(&self, feed_url: &str, cancel: &CancellationToken) -> Result<FeedFetch, FetchError> {
        let mut req = self.http.client().get(feed_url).timeout(self.timeout);
        if let Some(cached) = self.cache.get(feed_url).filter(|c| !c.is_empty()) {
            debug!(feed = %feed_url, "conditional request");
            if let Some(etag) = &cached.etag {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(modified) = &cached.modified {
                req = req.header(IF_MODIFIED_SINCE, modified);
            }
        }

        let resp = until_cancelled(cancel, self.http.send(req, true)).await.ok_or(FetchError::Cancelled)??;
        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            info!(feed = %feed_url, "[FEED] 304 Not Modified (cache)");
            return Ok(FeedFetch { entries: Vec::new(), not_modified: true });
        }
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        let header = |name: reqwest::header::HeaderName| resp.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let validators = CacheEntry { etag: header(ETAG), modified: header(LAST_MODIFIED) };
        let body = until_cancelled(cancel, resp.bytes()).await.ok_or(FetchError::Cancelled)??;
        let entries = parse_entries(&body)?;
        debug!(feed = %feed_url, bytes = body.len(), entries = entries.len(), "feed parsed");

        if let Err(e) = self.cache.put(feed_url, validators) {
            warn!(feed = %feed_url, error = %e, "could not persist feed cache");
        }

        until_cancelled(cancel, tokio::time::sleep(self.min_delay)).await;
        Ok(FeedFetch { entries, not_modified: false })
    }
}
