use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::util::url::origin_of;

/// Per-origin politeness: one in-flight request per host and a keyed rate limit,
/// however many items are being processed concurrently.
pub struct HostGate {
    slots: Mutex<HashMap<String, Arc<Semaphore>>>,
    limiter: DefaultKeyedRateLimiter<String>,
}

pub struct HostPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl HostGate {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            slots: Mutex::new(HashMap::new()),
            limiter: RateLimiter::keyed(Quota::per_second(rps)),
        }
    }

    fn slot(&self, origin: &str) -> Arc<Semaphore> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Wait for this URL's host slot and rate budget. Hold the permit for the request's duration.
    pub async fn acquire(&self, url: &str) -> HostPermit {
        let Some(origin) = origin_of(url) else { return HostPermit { _permit: None } };
        let permit = self.slot(&origin).acquire_owned().await.ok();
        self.limiter.until_key_ready(&origin).await;
        debug!(origin = %origin, "host permit granted");
        HostPermit { _permit: permit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_host_requests_are_serialized() {
        let gate = Arc::new(HostGate::new(1000));
        let first = gate.acquire("https://example.com/a").await;

        let g = gate.clone();
        let waiter = tokio::spawn(async move {
            let _p = g.acquire("https://example.com/b").await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn different_hosts_do_not_block_each_other() {
        let gate = HostGate::new(1000);
        let _a = gate.acquire("https://a.example.com/x").await;
        let b = tokio::time::timeout(Duration::from_millis(200), gate.acquire("https://b.example.com/y")).await;
        assert!(b.is_ok());
    }
}
