//! Retry executor: one resilient logical call per `run`.

use std::future::Future;
use std::time::{Duration, Instant};

use super::error::RemoteError;
use super::policy::BackoffPolicy;
use crate::breaker::{CircuitBreaker, CircuitBreakerState};
use crate::metrics::{ConnectionMetrics, MetricsRecorder};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Record of one try within a call. Lives only for the duration of `run`.
#[derive(Debug)]
struct Attempt {
    index: u32,
    started: Instant,
    latency: Duration,
}

impl Attempt {
    fn start(index: u32) -> Self {
        Self {
            index,
            started: Instant::now(),
            latency: Duration::ZERO,
        }
    }

    fn finish(&mut self) {
        self.latency = self.started.elapsed();
    }
}

/// Read-only health view: counters, success rate and breaker state.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub metrics: ConnectionMetrics,
    pub success_rate: f64,
    pub breaker: CircuitBreakerState,
}

/// Wraps remote operations with a circuit breaker gate, bounded retries,
/// backoff between attempts and running metrics.
///
/// One executor is meant to be shared (e.g. behind an `Arc`) by every call to
/// the same backend, so the breaker and counters see all traffic.
///
/// Errors whose `retryable` bit is false end the call after the attempt that
/// produced them. The call still counts as one failure for metrics and the
/// breaker.
#[derive(Debug)]
pub struct RetryExecutor {
    breaker: CircuitBreaker,
    metrics: MetricsRecorder,
    backoff: BackoffPolicy,
    max_retries: u32,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(CircuitBreaker::default(), BackoffPolicy::executor_default())
    }
}

impl RetryExecutor {
    pub fn new(breaker: CircuitBreaker, backoff: BackoffPolicy) -> Self {
        Self {
            breaker,
            metrics: MetricsRecorder::new(),
            backoff,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Default attempt budget used by [`RetryExecutor::run`].
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` with the executor's default attempt budget.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RemoteError>,
    {
        self.run_with_retries(self.max_retries, operation).await
    }

    /// Run `operation` up to `max_retries` times (at least once).
    ///
    /// The breaker is consulted once, before the first attempt. Attempts are
    /// strictly sequential; the only suspension between them is the backoff wait.
    pub async fn run_with_retries<T, E, F, Fut>(
        &self,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RemoteError>,
    {
        if !self.breaker.allow() {
            self.metrics.record_rejected();
            tracing::debug!("call rejected: circuit breaker open");
            return Err(RemoteError::circuit_open());
        }

        let max_retries = max_retries.max(1);
        let mut last_error: Option<RemoteError> = None;

        for index in 1..=max_retries {
            let mut attempt = Attempt::start(index);
            self.metrics.record_attempt();
            let outcome = operation().await.map_err(Into::into);
            attempt.finish();

            match outcome {
                Ok(value) => {
                    self.metrics.record_success(attempt.latency);
                    self.breaker.record_success();
                    tracing::debug!(
                        attempt = attempt.index,
                        latency_ms = attempt.latency.as_millis() as u64,
                        "remote call succeeded"
                    );
                    return Ok(value);
                }
                Err(err) => {
                    tracing::debug!(
                        attempt = attempt.index,
                        max_retries,
                        code = %err.code(),
                        retryable = err.retryable(),
                        "remote call attempt failed: {}",
                        err.message()
                    );
                    let stop = !err.retryable() || index == max_retries;
                    if stop {
                        last_error = Some(err);
                        break;
                    }
                    let delay = self.next_delay(index, &err);
                    last_error = Some(err);
                    tracing::warn!(
                        attempt = index,
                        delay_ms = delay.as_millis() as u64,
                        "retrying remote call after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.metrics.record_failure();
        self.breaker.record_failure();
        Err(last_error.unwrap_or_else(RemoteError::retries_exhausted))
    }

    /// Backoff for `attempt`, stretched to a server-advised `Retry-After` when larger.
    fn next_delay(&self, attempt: u32, err: &RemoteError) -> Duration {
        let computed = self.backoff.delay(attempt);
        match err.retry_after() {
            Some(advised) => computed.max(self.backoff.clamp(advised)),
            None => computed,
        }
    }

    pub fn health(&self) -> HealthReport {
        let metrics = self.metrics.snapshot();
        HealthReport {
            success_rate: metrics.success_rate(),
            metrics,
            breaker: self.breaker.snapshot(),
        }
    }
}
