//! Retrying fetch decorator for the transport edge.
//!
//! Stateless: no circuit breaker, no metrics. It injects content-negotiation
//! headers and retries 406 / 5xx / network failures with its own backoff.

use super::{HeaderMap, HttpRequest, HttpResponse, Transport, TransportError};
use crate::retry::BackoffPolicy;

#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    /// Total sends per request, including the first.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::fetch_default(),
        }
    }
}

/// Headers sent unless the caller supplies its own value.
pub fn default_headers() -> HeaderMap {
    [
        ("Accept", "application/json, text/plain, */*"),
        ("Content-Type", "application/json"),
        ("Accept-Encoding", "gzip, deflate"),
        ("Accept-Language", "en-US,en;q=0.9"),
    ]
    .into_iter()
    .collect()
}

/// Statuses worth sending again: 406 and any 5xx.
pub fn should_retry_status(status: u16) -> bool {
    status == 406 || status >= 500
}

/// Wraps a [`Transport`] and is one, so it can replace the raw transport
/// anywhere (including underneath a `RetryExecutor` operation).
#[derive(Debug, Clone)]
pub struct RetryableFetch<T> {
    inner: T,
    config: FetchConfig,
    defaults: HeaderMap,
}

impl<T: Transport> RetryableFetch<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FetchConfig::default())
    }

    pub fn with_config(inner: T, config: FetchConfig) -> Self {
        Self {
            inner,
            config: FetchConfig {
                max_retries: config.max_retries.max(1),
                ..config
            },
            defaults: default_headers(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl<T: Transport> Transport for RetryableFetch<T> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        request.headers = std::mem::take(&mut request.headers).merged_over(&self.defaults);
        let max = self.config.max_retries;

        let mut attempt = 1u32;
        loop {
            let outcome = self.inner.send(request.clone()).await;
            let retry = match &outcome {
                Ok(resp) => should_retry_status(resp.status),
                Err(_) => true,
            };
            if !retry || attempt >= max {
                return outcome;
            }

            let delay = self.config.backoff.delay(attempt);
            match &outcome {
                Ok(resp) => tracing::debug!(
                    url = %request.url,
                    status = resp.status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "fetch got retryable status"
                ),
                Err(e) => tracing::debug!(
                    url = %request.url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "fetch failed: {}",
                    e
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
