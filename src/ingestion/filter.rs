use chrono::{DateTime, Utc};
use tracing::debug;

use super::parse::entry_published_at;
use super::types::{FeedItem, RawEntry};
use crate::util::text::normalize_text;
use crate::util::time::within_days;
use crate::util::url::{canonicalize, stable_id};

/// Why an entry did not become a `FeedItem`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    NoLink,
    TooOld,
}

// Turn raw entries into items: drop link-less and out-of-window entries,
// stop after `max_per_feed` kept items. Undated entries are kept.
pub fn filter_entries(
    source: &str,
    entries: &[RawEntry],
    since_days: i64,
    max_per_feed: usize,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let mut items = Vec::new();
    for entry in entries {
        if items.len() >= max_per_feed {
            break;
        }
        match to_item(source, entry, since_days, now) {
            Ok(item) => items.push(item),
            Err(reason) => debug!(?reason, title = ?entry.title, "[DROP]"),
        }
    }
    items
}

fn to_item(source: &str, entry: &RawEntry, since_days: i64, now: DateTime<Utc>) -> Result<FeedItem, DropReason> {
    let link = entry.link.as_deref().unwrap_or_default().trim();
    let url = canonicalize(link);
    if url.is_empty() {
        return Err(DropReason::NoLink);
    }
    let published_at = entry_published_at(entry);
    if !within_days(published_at, since_days, now) {
        return Err(DropReason::TooOld);
    }
    Ok(FeedItem {
        source: source.to_string(),
        title: normalize_text(entry.title.as_deref().unwrap_or_default()),
        uid: stable_id(&url),
        url,
        link: link.to_string(),
        published_at,
    })
}

/// Newest first; undated items sort after every dated one. Stable for ties.
pub fn sort_newest_first(mut items: Vec<FeedItem>) -> Vec<FeedItem> {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items
}
