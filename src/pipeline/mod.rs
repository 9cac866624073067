use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use clap::builder::BoolishValueParser;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cache::{DEFAULT_CACHE_PATH, FeedCacheStore};
use crate::enrich::{Backend, EnrichConfig, Enricher};
use crate::http::host::HostGate;
use crate::http::{HttpClient, RetryPolicy};
use crate::ingestion::{ContentExtractor, FeedSource, HttpRobotsGate};
use crate::llm::{LlmClient, OpenAiClient, OpenAiClientConfig};
use crate::output::types::Meta;
use crate::publish::{NotionConfig, NotionStore, Publisher};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::run::{Phase as RunPhase, Run};
use crate::telemetry::{self};

mod collect;
mod item;
pub mod types;

use types::{RunPlan, RunReport, RunTotals};

pub const DEFAULT_FEED: &str = "AI News=https://artificialintelligence-news.com/feed/";
/// Requests per second allowed against any single origin.
const PER_HOST_RPS: u32 = 1;

/// news-agent run: fetch feeds, enrich new items, publish them once
#[derive(Args, Debug)]
pub struct RunCmd {
    /// Feed as NAME=URL (or a bare URL); repeatable
    #[arg(long = "feed", env = "FEEDS", value_delimiter = ',', default_value = DEFAULT_FEED)]
    pub feeds: Vec<FeedSource>,
    /// Recency window in days (inclusive)
    #[arg(long, env = "DAYS_BACK", default_value_t = 3, value_parser = clap::value_parser!(i64).range(0..))]
    pub days_back: i64,
    #[arg(long, env = "MAX_PER_FEED", default_value_t = 10)]
    pub max_per_feed: usize,
    #[arg(long, env = "TOTAL_LIMIT", default_value_t = 50)]
    pub total_limit: usize,
    #[arg(long, env = "ENABLE_SUMMARY", default_value_t = true, action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_summary: bool,
    #[arg(long, env = "SUMMARY_BULLETS", default_value_t = 5)]
    pub summary_bullets: usize,
    /// Characters of article text fed to enrichment
    #[arg(long, env = "SUMMARY_MAX_CHARS", default_value_t = 6000)]
    pub summary_max_chars: usize,
    #[arg(long, env = "SUMMARIZER", value_enum, default_value_t = Backend::Remote)]
    pub summarizer: Backend,
    #[arg(long, env = "TAGS_ENABLED", default_value_t = true, action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub tags_enabled: bool,
    #[arg(long, env = "TAGS_MAX", default_value_t = 4)]
    pub tags_max: usize,
    #[arg(long, env = "FEED_CACHE_PATH", default_value = DEFAULT_CACHE_PATH)]
    pub cache_path: PathBuf,
    /// Items processed concurrently
    #[arg(long, env = "CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,
    /// Cancel outstanding work after this many seconds
    #[arg(long, env = "RUN_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,
    /// Contact the network and publish (default: plan only)
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

impl RunCmd {
    fn enrich_config(&self) -> EnrichConfig {
        EnrichConfig {
            summary_enabled: self.enable_summary,
            bullets: self.summary_bullets,
            tags_enabled: self.tags_enabled,
            tags_max: self.tags_max,
            max_chars: self.summary_max_chars,
            backend: self.summarizer,
        }
    }

    fn settings(&self) -> RunSettings {
        RunSettings {
            days_back: self.days_back,
            max_per_feed: self.max_per_feed,
            total_limit: self.total_limit,
            concurrency: self.concurrency.max(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunSettings {
    pub days_back: i64,
    pub max_per_feed: usize,
    pub total_limit: usize,
    pub concurrency: usize,
}

/// One pass over the configured feeds with all collaborators wired in.
pub struct Pipeline {
    settings: RunSettings,
    http: HttpClient,
    cache: FeedCacheStore,
    extractor: ContentExtractor,
    enricher: Enricher,
    publisher: Publisher,
    feed_delay: Duration,
    log: LogCtx<Run>,
}

impl Pipeline {
    pub fn new(
        settings: RunSettings,
        http: HttpClient,
        cache: FeedCacheStore,
        extractor: ContentExtractor,
        enricher: Enricher,
        publisher: Publisher,
    ) -> Self {
        Self {
            settings,
            http,
            cache,
            extractor,
            enricher,
            publisher,
            feed_delay: crate::ingestion::FEED_MIN_DELAY,
            log: telemetry::run(),
        }
    }

    pub fn with_feed_delay(mut self, delay: Duration) -> Self {
        self.feed_delay = delay;
        self
    }

    pub async fn execute(&self, feeds: &[FeedSource], cancel: &CancellationToken) -> RunReport {
        let (items, feed_reports) = self.collect(feeds, cancel).await;
        if items.is_empty() {
            self.log.warn("No new items found.");
            return RunReport { feeds: feed_reports, totals: RunTotals::default(), items: Vec::new() };
        }
        self.log.info_kv(
            &format!("🔎 {} item(s) to process", items.len()),
            [
                ("items", items.len().to_string()),
                ("concurrency", self.settings.concurrency.to_string()),
                ("remote", self.enricher.has_remote().to_string()),
            ],
        );

        // buffered keeps results in sorted order whatever the completion order
        let mut results = stream::iter(items)
            .map(|item| {
                let span = self.log.span_kv(&RunPhase::Item, [("uid", item.uid.clone())]);
                self.process(item, cancel).instrument(span)
            })
            .buffered(self.settings.concurrency.max(1));

        let mut reports = Vec::new();
        while let Some(report) = results.next().await {
            self.log.item_outcome(&report.title, report.outcome, report.bullets, report.tags);
            reports.push(report);
        }

        let totals = RunTotals::tally(&reports);
        self.log.totals(&totals);
        RunReport { feeds: feed_reports, totals, items: reports }
    }
}

pub async fn run(args: RunCmd) -> Result<()> {
    let log = telemetry::run();
    let started = Instant::now();
    let _g = log
        .root_span_kv([
            ("feeds", args.feeds.len().to_string()),
            ("days_back", args.days_back.to_string()),
            ("total_limit", args.total_limit.to_string()),
            ("summarizer", format!("{:?}", args.summarizer)),
            ("concurrency", args.concurrency.to_string()),
            ("apply", args.apply.to_string()),
        ])
        .entered();

    let enrich_cfg = args.enrich_config();
    let llm_cfg = match enrich_cfg.backend {
        Backend::Remote => OpenAiClientConfig::from_env(),
        Backend::Local => None,
    };
    let store_cfg = NotionConfig::from_env();

    if !args.apply {
        let _s = log.span(&RunPhase::Plan).entered();
        let plan = RunPlan {
            feeds: args.feeds.clone(),
            days_back: args.days_back,
            max_per_feed: args.max_per_feed,
            total_limit: args.total_limit,
            summary_enabled: enrich_cfg.summary_enabled,
            summary_bullets: enrich_cfg.bullets,
            tags_enabled: enrich_cfg.tags_enabled,
            tags_max: enrich_cfg.tags_max,
            summarizer: enrich_cfg.backend,
            remote_available: llm_cfg.is_some(),
            store_configured: store_cfg.is_ok(),
            concurrency: args.concurrency,
            cache_path: args.cache_path.display().to_string(),
        };
        if telemetry::config::json_mode() {
            log.plan(&plan)?;
        } else {
            log.info(format!(
                "📝 Run plan — feeds={} days_back={} max_per_feed={} total_limit={} summarizer={:?} remote={} store={}",
                plan.feeds.len(), plan.days_back, plan.max_per_feed, plan.total_limit,
                plan.summarizer, plan.remote_available, plan.store_configured
            ));
            for f in &plan.feeds {
                log.info(format!("  feed {} url={}", f.name, f.url));
            }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let store_cfg = store_cfg.context("record store credentials are required with --apply")?;
    let http = HttpClient::new(RetryPolicy::default()).context("build http client")?;
    let llm: Option<Arc<dyn LlmClient>> = match llm_cfg {
        Some(cfg) => {
            let client = OpenAiClient::new(cfg).context("build llm client")?;
            log.info_kv(&format!("🤖 Remote enrichment via {}", client.model()), [("model", client.model().to_string())]);
            Some(Arc::new(client))
        }
        None if enrich_cfg.backend == Backend::Remote => {
            log.warn("⚠️  OPENAI_API_KEY not set: heuristic summaries only, no tags");
            None
        }
        None => None,
    };

    let hosts = Arc::new(HostGate::new(PER_HOST_RPS));
    let robots = Arc::new(HttpRobotsGate::new(http.clone(), hosts.clone()));
    let pipeline = Pipeline::new(
        args.settings(),
        http.clone(),
        FeedCacheStore::load(&args.cache_path),
        ContentExtractor::new(http.clone(), hosts, robots),
        Enricher::new(enrich_cfg, llm),
        Publisher::new(Arc::new(NotionStore::new(http, store_cfg))),
    );

    let cancel = CancellationToken::new();
    if let Some(secs) = args.deadline_secs {
        let c = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            c.cancel();
        });
    }
    let c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            c.cancel();
        }
    });

    let report = pipeline.execute(&args.feeds, &cancel).await;
    if cancel.is_cancelled() {
        log.warn_kv("⏱️  Run cancelled before completion", [("cancelled", report.totals.cancelled.to_string())]);
    }
    if telemetry::config::json_mode() {
        let meta = Meta { duration_ms: Some(started.elapsed().as_millis()), run_id: None };
        log.result_meta(&report, meta)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockClient;
    use crate::publish::mock::MockStore;
    use crate::testutil::{StubResponse, StubServer};
    use crate::util::url::{canonicalize, stable_id};
    use chrono::Utc;

    const ARTICLE: &str = "<html><body><nav><p>Home</p></nav>\
        <p>Open models now match closed ones on several coding benchmarks.</p>\
        <p>The gap closed faster than most analysts predicted last year. Short.</p>\
        <footer><p>Copyright</p></footer></body></html>";

    fn rss(items: &[(&str, &str, Option<String>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date)| {
                let link = if link.is_empty() { String::new() } else { format!("<link>{link}</link>") };
                let date = date.as_ref().map(|d| format!("<pubDate>{d}</pubDate>")).unwrap_or_default();
                format!("<item><title>{title}</title>{link}{date}</item>")
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>{body}</channel></rss>"#
        )
    }

    fn hours_ago(h: i64) -> Option<String> {
        Some((Utc::now() - chrono::Duration::hours(h)).to_rfc2822())
    }

    fn settings() -> RunSettings {
        RunSettings { days_back: 3, max_per_feed: 10, total_limit: 50, concurrency: 2 }
    }

    fn pipeline(store: Arc<MockStore>, llm: Arc<MockClient>, cache_path: PathBuf) -> Pipeline {
        let http = HttpClient::new(RetryPolicy { max_attempts: 2, backoff_factor: Duration::from_millis(1) }).unwrap();
        let hosts = Arc::new(HostGate::new(1000));
        let robots = Arc::new(HttpRobotsGate::new(http.clone(), hosts.clone()));
        let enrich = EnrichConfig {
            summary_enabled: true,
            bullets: 5,
            tags_enabled: true,
            tags_max: 4,
            max_chars: 6000,
            backend: Backend::Remote,
        };
        Pipeline::new(
            settings(),
            http.clone(),
            FeedCacheStore::load(cache_path),
            ContentExtractor::new(http, hosts, robots),
            Enricher::new(enrich, Some(llm as Arc<dyn LlmClient>)),
            Publisher::new(store),
        )
        .with_feed_delay(Duration::ZERO)
    }

    fn feed(server: &StubServer, path: &str) -> FeedSource {
        FeedSource { name: "AI News".into(), url: server.url(path) }
    }

    #[tokio::test]
    async fn full_pass_publishes_new_items_once_in_sorted_order() {
        let server = StubServer::start(vec![
            ("/a1", vec![StubResponse::ok(ARTICLE)]),
            ("/a2", vec![StubResponse::status(404)]),
        ])
        .await;
        let (a1, a2, old) = (server.url("/a1"), server.url("/a2"), server.url("/old"));
        server.route(
            "/feed",
            vec![StubResponse::ok(rss(&[
                ("Undated", &a2, None),
                ("Too old", &old, hours_ago(24 * 5)),
                ("No link", "", hours_ago(1)),
                ("Fresh", &a1, hours_ago(1)),
            ]))],
        );

        let store = Arc::new(MockStore::new());
        store.insert_existing(&stable_id(&canonicalize(&a2)));
        let llm = Arc::new(MockClient::new());
        llm.push_reply("- Open models caught up.\n- Faster than expected.");
        llm.push_reply("open models, benchmarks");
        let dir = tempfile::tempdir().unwrap();

        let p = pipeline(store.clone(), llm, dir.path().join("feeds.json"));
        let report = p.execute(&[feed(&server, "/feed")], &CancellationToken::new()).await;

        let order: Vec<&str> = report.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(order, ["Fresh", "Undated"]);
        assert_eq!(report.items[0].outcome, "created");
        assert_eq!(report.items[0].bullets, 2);
        assert_eq!(report.items[0].tags, 2);
        assert_eq!(report.items[1].outcome, "skipped_exists");
        assert_eq!(report.totals, RunTotals { considered: 2, created: 1, skipped_exists: 1, ..Default::default() });
        assert_eq!(report.feeds[0].received, 4);
        assert_eq!(report.feeds[0].kept, 2);
        assert_eq!(store.created_titles(), ["Fresh"]);
    }

    #[tokio::test]
    async fn articles_are_fetched_by_their_published_link() {
        let server = StubServer::start(vec![("/Posts/Mixed-Case", vec![StubResponse::ok(ARTICLE)])]).await;
        let link = server.url("/Posts/Mixed-Case");
        server.route("/feed", vec![StubResponse::ok(rss(&[("Cased", &link, hours_ago(1))]))]);
        let store = Arc::new(MockStore::new());
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(store.clone(), Arc::new(MockClient::new()), dir.path().join("feeds.json"));

        let report = p.execute(&[feed(&server, "/feed")], &CancellationToken::new()).await;
        assert_eq!(server.hits("/Posts/Mixed-Case"), 1);
        assert_eq!(report.items[0].url, canonicalize(&link));
        assert_eq!(report.items[0].extraction, "paragraphs");
        assert_eq!(report.items[0].bullets, 2);
        assert_eq!(store.creates(), 1);
    }

    #[tokio::test]
    async fn unchanged_feed_means_no_items_and_no_store_calls() {
        let server = StubServer::start(vec![("/feed", vec![StubResponse::status(304)])]).await;
        let store = Arc::new(MockStore::new());
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(store.clone(), Arc::new(MockClient::new()), dir.path().join("feeds.json"));

        let report = p.execute(&[feed(&server, "/feed")], &CancellationToken::new()).await;
        assert!(report.items.is_empty());
        assert_eq!(report.feeds[0].status, types::FeedStatus::NotModified);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn failing_feed_is_skipped_and_create_failures_do_not_stop_the_run() {
        let server = StubServer::start(vec![(
            "/feed",
            vec![StubResponse::ok(rss(&[
                ("One", "https://news.invalid/one", hours_ago(1)),
                ("Two", "https://news.invalid/two", hours_ago(2)),
            ]))],
        )])
        .await;
        let store = Arc::new(MockStore::new());
        store.fail_create(true);
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(store.clone(), Arc::new(MockClient::new()), dir.path().join("feeds.json"));
        p.enricher = Enricher::new(
            EnrichConfig {
                summary_enabled: false,
                bullets: 0,
                tags_enabled: false,
                tags_max: 0,
                max_chars: 0,
                backend: Backend::Local,
            },
            None,
        );

        let feeds = [feed(&server, "/missing"), feed(&server, "/feed")];
        let report = p.execute(&feeds, &CancellationToken::new()).await;
        assert_eq!(report.feeds[0].status, types::FeedStatus::Failed);
        assert_eq!(report.feeds[1].status, types::FeedStatus::Fetched);
        assert_eq!(report.totals.errors, 2);
        assert_eq!(store.creates(), 2);
        assert!(report.items.iter().all(|i| i.extraction == "empty"));
    }

    #[tokio::test]
    async fn total_limit_caps_after_sorting() {
        let server = StubServer::start(vec![(
            "/feed",
            vec![StubResponse::ok(rss(&[
                ("Older", "https://news.invalid/older", hours_ago(5)),
                ("Newest", "https://news.invalid/newest", hours_ago(1)),
                ("Middle", "https://news.invalid/middle", hours_ago(3)),
            ]))],
        )])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(Arc::new(MockStore::new()), Arc::new(MockClient::new()), dir.path().join("feeds.json"));
        p.settings.total_limit = 2;
        let (items, _) = p.collect(&[feed(&server, "/feed")], &CancellationToken::new()).await;
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Newest", "Middle"]);
    }

    #[tokio::test]
    async fn items_not_started_before_cancellation_are_cancelled() {
        let store = Arc::new(MockStore::new());
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(store.clone(), Arc::new(MockClient::new()), dir.path().join("feeds.json"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let item = crate::ingestion::FeedItem {
            source: "AI News".into(),
            title: "t".into(),
            url: "https://news.invalid/x".into(),
            link: "https://news.invalid/x".into(),
            published_at: None,
            uid: "x".into(),
        };
        let report = p.process(item, &cancel).await;
        assert_eq!(report.outcome, "cancelled");
        assert!(store.calls().is_empty());
    }
}
