//! Feed fetch, parse, filter and article extraction.

pub mod extractor;
mod fetch;
mod filter;
mod parse;
pub mod robots;
pub mod types;

pub use extractor::{ContentExtractor, Extraction};
pub use fetch::{ConditionalFeedFetcher, FEED_MIN_DELAY};
pub use filter::{filter_entries, sort_newest_first};
pub use robots::HttpRobotsGate;
pub use types::{FeedItem, FeedSource};
