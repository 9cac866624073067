use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::Pipeline;
use super::types::{ItemOutcome, ItemReport};
use crate::ingestion::{Extraction, FeedItem};
use crate::telemetry::ops::run::Phase as RunPhase;

impl Pipeline {
    /// Extract, enrich, publish. Never fails: errors become the item's outcome.
    pub async fn process(&self, item: FeedItem, cancel: &CancellationToken) -> ItemReport {
        if cancel.is_cancelled() {
            return ItemReport::new(&item, ItemOutcome::Cancelled);
        }

        let extraction = if self.enricher.config().wants_text() {
            self.extractor
                .extract(&item.link, cancel)
                .instrument(self.log.span(&RunPhase::Extract))
                .await
        } else {
            Extraction::Empty
        };
        let extraction_label = extraction.label();
        let enrichment = self
            .enricher
            .enrich(&extraction.into_text(), cancel)
            .instrument(self.log.span(&RunPhase::Enrich))
            .await;

        let outcome = match self
            .publisher
            .publish(&item, &enrichment, cancel)
            .instrument(self.log.span(&RunPhase::Publish))
            .await
        {
            Ok(decision) => ItemOutcome::Published(decision),
            Err(e) => {
                self.log.warn_kv(
                    &format!("❌ create failed for {}: {}", item.url, e),
                    [("uid", item.uid.clone()), ("error", e.to_string())],
                );
                ItemOutcome::Error(e.to_string())
            }
        };

        let mut report = ItemReport::new(&item, outcome);
        report.extraction = extraction_label;
        report.bullets = enrichment.bullets.len();
        report.tags = enrichment.tags.len();
        report
    }
}
