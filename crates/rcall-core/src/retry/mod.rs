//! Error classification, backoff and the retry executor.
//!
//! Classification decides which failures are transient; the backoff policy
//! spaces attempts out; the executor ties both to the circuit breaker and
//! metrics so callers get one outcome per logical call.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{
    classify, classify_parse, classify_response, classify_status, classify_transport,
    is_retryable, Failure,
};
pub use error::{ErrorKind, RemoteError};
pub use policy::BackoffPolicy;
pub use run::{HealthReport, RetryExecutor, DEFAULT_MAX_RETRIES};

impl From<crate::transport::TransportError> for RemoteError {
    fn from(e: crate::transport::TransportError) -> Self {
        classify_transport(&e)
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        classify_parse(&e)
    }
}
