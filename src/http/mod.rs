use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod host;

pub const AGENT_NAME: &str = "AI-News-Agent";
pub const AGENT_URL: &str = "https://github.com/moniburnejko/ai-news-agent";

/// Statuses that trigger a transport-level retry.
const RETRY_STATUSES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub fn user_agent() -> String {
    format!("{}/{} (+{})", AGENT_NAME, env!("CARGO_PKG_VERSION"), AGENT_URL)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("feed parse error: {0}")]
    Parse(String),
    #[error("request could not be cloned for retry")]
    NotCloneable,
    #[error("cancelled")]
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, backoff_factor: Duration::from_millis(600) }
    }
}

impl RetryPolicy {
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.backoff_factor,
            initial_interval: self.backoff_factor,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.backoff_factor * 64,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Shared HTTP client: custom user agent plus retry on 429/5xx for idempotent requests.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(retry: RetryPolicy) -> Result<Self, FetchError> {
        let inner = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { inner, retry })
    }

    pub fn client(&self) -> &Client {
        &self.inner
    }

    // Send a request. Idempotent requests are retried on transport errors and
    // retryable statuses; once attempts run out the last response (or error)
    // is returned as-is, never a distinct "retries exhausted" error.
    pub async fn send(&self, req: RequestBuilder, idempotent: bool) -> Result<Response, FetchError> {
        if !idempotent {
            return Ok(req.send().await?);
        }
        let mut schedule = self.retry.schedule();
        let mut attempt = 1;
        loop {
            let this_try = req.try_clone().ok_or(FetchError::NotCloneable)?;
            let last = attempt >= self.retry.max_attempts;
            match this_try.send().await {
                Ok(resp) if !last && RETRY_STATUSES.contains(&resp.status()) => {
                    debug!(status = %resp.status(), attempt, "retryable status");
                }
                Ok(resp) => return Ok(resp),
                Err(err) if !last && (err.is_connect() || err.is_timeout()) => {
                    debug!(error = %err, attempt, "retryable transport error");
                }
                Err(err) => return Err(err.into()),
            }
            let delay = schedule.next_backoff().unwrap_or(self.retry.backoff_factor);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Race `fut` against the run's cancellation token.
pub async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
