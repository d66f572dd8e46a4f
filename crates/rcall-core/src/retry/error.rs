//! Typed remote-call error produced by classification.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// High-level classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// 406: the server could not produce an acceptable representation.
    ContentNotAcceptable,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422
    UnprocessableEntity,
    /// 429: server asked us to slow down.
    RateLimited,
    /// Any 5xx.
    ServerError,
    /// 2xx whose body did not decode as the expected format.
    ParseError,
    /// Transport-level failure (DNS, timeout, connection reset).
    NetworkError,
    /// Status with no dedicated mapping.
    Unknown,
    /// Call rejected by an open circuit breaker; no attempt was made.
    CircuitOpen,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ContentNotAcceptable => "CONTENT_NOT_ACCEPTABLE",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
            ErrorKind::CircuitOpen => "CIRCUIT_OPEN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a remote operation after classification.
///
/// The `retryable` bit is fixed when the error is built (see
/// [`crate::retry::classify`]) and is never rewritten afterwards.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    code: ErrorKind,
    message: String,
    details: Option<Value>,
    retryable: bool,
    status: Option<u16>,
}

impl RemoteError {
    pub fn new(code: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retryable,
            status: None,
        }
    }

    /// Attach opaque details (headers of interest, server payload, ...).
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record the HTTP status the error originated from.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Rejection issued when the circuit breaker refuses a call.
    pub fn circuit_open() -> Self {
        Self::new(ErrorKind::CircuitOpen, "circuit breaker open", false)
    }

    /// Fallback when a call failed without any captured error value.
    pub fn retries_exhausted() -> Self {
        Self::new(ErrorKind::Unknown, "all retries failed", false)
    }

    pub fn code(&self) -> ErrorKind {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Server-advised wait from a `Retry-After` header, if one was captured.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        self.details
            .as_ref()?
            .get("retry_after")?
            .as_u64()
            .map(std::time::Duration::from_secs)
    }
}
