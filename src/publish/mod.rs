//! Exactly-once publication of items to the record store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::enrich::EnrichmentResult;
use crate::http::until_cancelled;
use crate::ingestion::FeedItem;

#[cfg(test)]
pub mod mock;
pub mod notion;

pub use notion::{NotionConfig, NotionStore};

/// Store-side ceiling on children per append call.
pub const BULLET_BATCH: usize = 50;
pub const UNTITLED: &str = "(no title)";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("missing store configuration: {0}")]
    MissingConfig(&'static str),
    #[error("store transport error: {0}")]
    Transport(#[from] crate::http::FetchError),
    #[error("store returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("store response decode error: {0}")]
    Decode(String),
    #[error("cancelled")]
    Cancelled,
}

/// Result of the existence query. `Indeterminate` never leads to a create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Existence {
    Found,
    NotFound,
    Indeterminate(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishDecision {
    Created,
    SkippedExists,
    SkippedUncertain,
}

impl PublishDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishDecision::Created => "created",
            PublishDecision::SkippedExists => "skipped_exists",
            PublishDecision::SkippedUncertain => "skipped_uncertain",
        }
    }
}

/// Field set of a new store record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewRecord {
    pub title: String,
    pub url: String,
    pub uid: String,
    pub source: String,
    pub published: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl NewRecord {
    pub fn from_item(item: &FeedItem, tags: &[String], now: DateTime<Utc>) -> Self {
        let title = if item.title.is_empty() { UNTITLED.to_string() } else { item.title.clone() };
        Self {
            title,
            url: item.url.clone(),
            uid: item.uid.clone(),
            source: item.source.clone(),
            published: item.published_at.unwrap_or(now),
            tags: tags.to_vec(),
        }
    }
}

/// The three store operations publication needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `Some(record_id)` when a record with this uid or url exists.
    async fn find(&self, uid: &str, url: &str) -> Result<Option<String>, StoreError>;
    async fn create_record(&self, record: &NewRecord) -> Result<String, StoreError>;
    /// Appends one batch; callers keep batches within `BULLET_BATCH`.
    async fn append_bullets(&self, record_id: &str, bullets: &[String]) -> Result<(), StoreError>;
}

pub struct Publisher {
    store: Arc<dyn RecordStore>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Publisher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store, in_flight: Mutex::new(HashMap::new()) }
    }

    pub async fn existence(&self, item: &FeedItem, cancel: &CancellationToken) -> Existence {
        match until_cancelled(cancel, self.store.find(&item.uid, &item.url)).await {
            None => Existence::Indeterminate("cancelled".into()),
            Some(Ok(Some(id))) => {
                debug!(uid = %item.uid, record = %id, "already published");
                Existence::Found
            }
            Some(Ok(None)) => Existence::NotFound,
            Some(Err(e)) => Existence::Indeterminate(e.to_string()),
        }
    }

    /// Check, then create and append. Only a failed create is an error; a
    /// failed append leaves the record in place with fewer bullets.
    pub async fn publish(
        &self,
        item: &FeedItem,
        enrichment: &EnrichmentResult,
        cancel: &CancellationToken,
    ) -> Result<PublishDecision, StoreError> {
        let lock = self.uid_lock(&item.uid);
        let out = {
            let _held = lock.lock().await;
            self.publish_locked(item, enrichment, cancel).await
        };
        drop(lock);
        self.release_uid(&item.uid);
        out
    }

    async fn publish_locked(
        &self,
        item: &FeedItem,
        enrichment: &EnrichmentResult,
        cancel: &CancellationToken,
    ) -> Result<PublishDecision, StoreError> {
        match self.existence(item, cancel).await {
            Existence::Found => return Ok(PublishDecision::SkippedExists),
            Existence::Indeterminate(reason) => {
                warn!(url = %item.url, reason = %reason, "skipping publish, existence unknown");
                return Ok(PublishDecision::SkippedUncertain);
            }
            Existence::NotFound => {}
        }

        let record = NewRecord::from_item(item, &enrichment.tags, Utc::now());
        let record_id = self.store.create_record(&record).await?;
        self.append_all(&record_id, &enrichment.bullets).await;
        Ok(PublishDecision::Created)
    }

    async fn append_all(&self, record_id: &str, bullets: &[String]) {
        for (i, batch) in bullets.chunks(BULLET_BATCH).enumerate() {
            if let Err(e) = self.store.append_bullets(record_id, batch).await {
                warn!(record = %record_id, batch = i, error = %e, "failed to append bullets");
            }
        }
    }

    fn uid_lock(&self, uid: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(uid.to_string()).or_default().clone()
    }

    // Drops the uid's lock once no other publish holds or awaits it.
    fn release_uid(&self, uid: &str) {
        let mut locks = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if locks.get(uid).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(uid);
        }
    }
}
