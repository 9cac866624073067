use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::robots::RobotsGate;
use crate::http::host::HostGate;
use crate::http::{AGENT_NAME, HttpClient, until_cancelled};

mod article;
mod dom;
mod paragraph;

pub use article::ArticleStage;
pub use paragraph::{ParagraphStage, RawBodyStage};

pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(20);

/// One step of the extraction chain. `None` hands over to the next stage.
pub trait ExtractStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, doc: &Html, raw: &str) -> Option<String>;
}

/// Outcome of extracting one article. Only `Text` carries usable content.
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction {
    Text { stage: &'static str, text: String },
    Blocked,
    Failed(String),
    Empty,
}

impl Extraction {
    pub fn into_text(self) -> String {
        match self {
            Extraction::Text { text, .. } => text,
            _ => String::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Extraction::Text { stage, .. } => *stage,
            Extraction::Blocked => "robots",
            Extraction::Failed(_) => "failed",
            Extraction::Empty => "empty",
        }
    }
}

pub fn default_stages() -> Vec<Box<dyn ExtractStage>> {
    vec![Box::new(ArticleStage), Box::new(ParagraphStage), Box::new(RawBodyStage)]
}

/// Runs the stages over an already-downloaded body; first non-empty result wins.
pub fn run_stages(stages: &[Box<dyn ExtractStage>], body: &str) -> Extraction {
    let doc = Html::parse_document(body);
    stages
        .iter()
        .find_map(|stage| stage.extract(&doc, body).map(|text| Extraction::Text { stage: stage.name(), text }))
        .unwrap_or(Extraction::Empty)
}

/// Robots check, bounded article download, then the extraction chain.
pub struct ContentExtractor {
    http: HttpClient,
    hosts: Arc<HostGate>,
    robots: Arc<dyn RobotsGate>,
    stages: Vec<Box<dyn ExtractStage>>,
    timeout: Duration,
}

impl ContentExtractor {
    pub fn new(http: HttpClient, hosts: Arc<HostGate>, robots: Arc<dyn RobotsGate>) -> Self {
        Self { http, hosts, robots, stages: default_stages(), timeout: ARTICLE_TIMEOUT }
    }

    pub async fn extract(&self, url: &str, cancel: &CancellationToken) -> Extraction {
        if !self.robots.is_allowed(url, AGENT_NAME, cancel).await {
            return Extraction::Blocked;
        }
        let body = match self.download(url, cancel).await {
            Ok(body) => body,
            Err(reason) => {
                debug!(url, reason = %reason, "article download failed");
                return Extraction::Failed(reason);
            }
        };
        run_stages(&self.stages, &body)
    }

    async fn download(&self, url: &str, cancel: &CancellationToken) -> Result<String, String> {
        let _permit = until_cancelled(cancel, self.hosts.acquire(url)).await.ok_or("cancelled")?;
        let req = self.http.client().get(url).timeout(self.timeout);
        let resp = until_cancelled(cancel, self.http.send(req, true))
            .await
            .ok_or("cancelled")?
            .map_err(|e| e.to_string())?;
        if resp.status() != StatusCode::OK {
            return Err(format!("HTTP {}", resp.status()));
        }
        until_cancelled(cancel, resp.text())
            .await
            .ok_or("cancelled")?
            .map_err(|e| e.to_string())
    }
}
