use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry as read from a syndication document, before any normalization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub dc_date: Option<String>,
}

/// A kept feed entry. `uid` is always `stable_id(url)` and `url` is canonical.
/// `link` is the entry's link as published, used to fetch the article.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedItem {
    pub source: String,
    pub title: String,
    pub url: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub uid: String,
}

/// A configured feed: display name + URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl std::str::FromStr for FeedSource {
    type Err = String;

    // "Name=https://..." or a bare URL (named after its host)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, url) = match s.split_once('=') {
            Some((name, url)) if !name.contains("://") && !name.trim().is_empty() => (name.trim().to_string(), url.trim().to_string()),
            _ => {
                let host = url::Url::parse(s).ok().and_then(|u| u.host_str().map(str::to_string));
                (host.unwrap_or_default(), s.to_string())
            }
        };
        if url::Url::parse(&url).is_err() {
            return Err(format!("invalid feed url: {url}"));
        }
        Ok(FeedSource { name, url })
    }
}
