use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::telemetry::{self};
use crate::telemetry::ops::cache::Phase as CachePhase;

mod store;
pub mod types;

pub use store::{CacheEntry, FeedCacheStore};

pub const DEFAULT_CACHE_PATH: &str = ".cache/feeds.json";

/// news-agent cache ls/clear
#[derive(Args)]
pub struct CacheCmd {
    #[arg(long, env = "FEED_CACHE_PATH", default_value = DEFAULT_CACHE_PATH, global = true)]
    pub cache_path: PathBuf,
    #[command(subcommand)]
    pub cmd: CacheSub,
}

#[derive(Subcommand)]
pub enum CacheSub {
    /// List cached validators per feed
    Ls,
    /// Forget validators (plan-only by default; use --apply to write)
    Clear {
        /// Only this feed URL; omit to clear every feed
        #[arg(long)]
        feed: Option<String>,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

pub async fn run(args: CacheCmd) -> Result<()> {
    let store = FeedCacheStore::load(&args.cache_path);
    match args.cmd {
        CacheSub::Ls => ls_cache(&store),
        CacheSub::Clear { feed, apply } => clear_cache(&store, feed, apply),
    }
}

fn ls_cache(store: &FeedCacheStore) -> Result<()> {
    let log = telemetry::cache();
    let _g = log.root_span_kv([("path", store.path().display().to_string())]).entered();
    let _s = log.span(&CachePhase::List).entered();

    let feeds: Vec<types::CacheRow> = store
        .entries()
        .into_iter()
        .map(|(feed_url, e)| types::CacheRow { feed_url, etag: e.etag, modified: e.modified })
        .collect();
    log.info(format!("🗂️  Cached feeds: {}", feeds.len()));
    for row in &feeds {
        log.info(format!("  {} etag={:?} modified={:?}", row.feed_url, row.etag, row.modified));
    }
    if telemetry::config::json_mode() {
        log.result(&types::CacheList { path: store.path().display().to_string(), feeds })?;
    }
    Ok(())
}

fn clear_cache(store: &FeedCacheStore, feed: Option<String>, apply: bool) -> Result<()> {
    let log = telemetry::cache();
    let _g = log.root_span_kv([
        ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
        ("feed", format!("{:?}", feed)),
    ]).entered();
    let path = store.path().display().to_string();

    if !apply {
        let _s = log.span(&CachePhase::Plan).entered();
        let matching = match &feed {
            Some(url) => usize::from(store.get(url).is_some()),
            None => store.entries().len(),
        };
        log.info(format!("📝 Cache plan — clear feed={:?} matching={}", feed, matching));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::CacheClearPlan { path, feed_url: feed, matching })?;
        }
        return Ok(());
    }

    let _s = log.span(&CachePhase::Clear).entered();
    let removed = match &feed {
        Some(url) => usize::from(store.remove(url).context("remove cache entry")?),
        None => store.clear().context("clear feed cache")?,
    };
    log.info(format!("🧹 Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" }));
    if telemetry::config::json_mode() {
        log.result(&types::CacheClearResult { path, removed })?;
    }
    Ok(())
}
