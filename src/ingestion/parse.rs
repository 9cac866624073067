use bytes::Bytes;
use chrono::{DateTime, Utc};
use rss::{Channel, Item};

use super::types::RawEntry;
use crate::http::FetchError;
use crate::util::time::parse_feed_date;

// RSS 2.0 first; Atom and RSS 1.0 documents go through feed-rs.
pub fn parse_entries(body: &Bytes) -> Result<Vec<RawEntry>, FetchError> {
    match Channel::read_from(&body[..]) {
        Ok(channel) => Ok(channel.items().iter().map(from_rss_item).collect()),
        Err(rss_err) => match feed_rs::parser::parse(&body[..]) {
            Ok(feed) => Ok(feed.entries.into_iter().map(from_feed_rs_entry).collect()),
            Err(e) => Err(FetchError::Parse(format!("rss: {rss_err}; atom: {e}"))),
        },
    }
}

fn from_rss_item(item: &Item) -> RawEntry {
    let dc_date = item
        .dublin_core_ext()
        .and_then(|dc| dc.dates().first().cloned());
    RawEntry {
        title: item.title().map(str::to_string),
        link: item.link().map(str::to_string),
        published: item.pub_date().map(str::to_string),
        updated: None,
        dc_date,
    }
}

fn from_feed_rs_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone());
    RawEntry {
        title: entry.title.map(|t| t.content),
        link,
        published: entry.published.map(|d| d.to_rfc3339()),
        updated: entry.updated.map(|d| d.to_rfc3339()),
        dc_date: None,
    }
}

/// First parseable date among published, updated and dc:date.
pub fn entry_published_at(entry: &RawEntry) -> Option<DateTime<Utc>> {
    [&entry.published, &entry.updated, &entry.dc_date]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_feed_date(raw))
}
