pub mod config;
pub mod logging;

pub mod breaker;
pub mod client;
pub mod metrics;
pub mod retry;
pub mod transport;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState, CircuitState};
pub use client::RemoteClient;
pub use metrics::{ConnectionMetrics, MetricsRecorder};
pub use retry::{BackoffPolicy, ErrorKind, HealthReport, RemoteError, RetryExecutor};
pub use transport::{HttpRequest, HttpResponse, RetryableFetch, Transport, TransportError};
