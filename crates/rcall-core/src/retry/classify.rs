//! Classify HTTP responses and transport failures into [`RemoteError`]s.

use serde_json::{json, Map, Value};

use super::error::{ErrorKind, RemoteError};
use crate::transport::{HttpResponse, TransportError};

/// Something that went wrong on the way to a usable response.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// A response was received but its status is not a success.
    Response(&'a HttpResponse),
    /// The request never produced a response (DNS, timeout, reset, ...).
    Transport(&'a TransportError),
    /// A 2xx body did not decode as the expected format.
    Parse(&'a serde_json::Error),
}

/// Map a status code to its error kind. Total: every code maps to exactly one kind.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::BadRequest,
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        406 => ErrorKind::ContentNotAcceptable,
        409 => ErrorKind::Conflict,
        422 => ErrorKind::UnprocessableEntity,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Unknown,
    }
}

/// Whether a call that failed with `kind` may succeed if repeated unchanged.
///
/// `status` is the originating HTTP status, if any; it only matters for
/// `Unknown`, which is retryable when the server side is at fault (>= 500).
pub fn is_retryable(kind: ErrorKind, status: Option<u16>) -> bool {
    match kind {
        ErrorKind::ContentNotAcceptable
        | ErrorKind::RateLimited
        | ErrorKind::ServerError
        | ErrorKind::NetworkError => true,
        ErrorKind::Unknown => status.is_some_and(|s| s >= 500),
        _ => false,
    }
}

/// Build the error for a received response.
pub fn classify_response(response: &HttpResponse) -> RemoteError {
    let status = response.status;
    let kind = classify_status(status);

    let mut details = Map::new();
    details.insert("status".into(), json!(status));
    if let Some(secs) = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        details.insert("retry_after".into(), json!(secs));
    }

    RemoteError::new(kind, response_message(response), is_retryable(kind, Some(status)))
        .with_status(status)
        .with_details(Value::Object(details))
}

/// Build the error for a transport-level failure. Always retryable.
pub fn classify_transport(error: &TransportError) -> RemoteError {
    RemoteError::new(ErrorKind::NetworkError, error.to_string(), true)
}

/// Build the error for a 2xx body that failed to decode. Never retryable.
pub fn classify_parse(error: &serde_json::Error) -> RemoteError {
    RemoteError::new(
        ErrorKind::ParseError,
        format!("malformed response body: {}", error),
        false,
    )
}

/// Classify any failure into a [`RemoteError`]. Never panics.
pub fn classify(failure: Failure<'_>) -> RemoteError {
    match failure {
        Failure::Response(r) => classify_response(r),
        Failure::Transport(e) => classify_transport(e),
        Failure::Parse(e) => classify_parse(e),
    }
}

/// Prefer the backend's own error text (`message` or `error` in a JSON body),
/// falling back to the status line.
fn response_message(response: &HttpResponse) -> String {
    let from_body = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|v| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_owned))
        });
    from_body.unwrap_or_else(|| format!("HTTP {}", response.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HeaderMap;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn status_table() {
        let table = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (406, ErrorKind::ContentNotAcceptable),
            (409, ErrorKind::Conflict),
            (422, ErrorKind::UnprocessableEntity),
            (429, ErrorKind::RateLimited),
            (500, ErrorKind::ServerError),
            (502, ErrorKind::ServerError),
            (503, ErrorKind::ServerError),
            (504, ErrorKind::ServerError),
            (599, ErrorKind::ServerError),
        ];
        for (status, kind) in table {
            assert_eq!(classify_status(status), kind, "status {}", status);
        }
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        for status in [200, 302, 402, 405, 418, 451, 600, 999] {
            assert_eq!(classify_status(status), ErrorKind::Unknown, "status {}", status);
        }
    }

    #[test]
    fn retryable_only_for_transient_classes() {
        assert!(classify_response(&response(406, "")).retryable());
        assert!(classify_response(&response(429, "")).retryable());
        assert!(classify_response(&response(503, "")).retryable());
        for status in [400, 401, 403, 404, 409, 422, 418] {
            assert!(!classify_response(&response(status, "")).retryable(), "status {}", status);
        }
    }

    #[test]
    fn unknown_retryable_only_when_server_side() {
        assert!(is_retryable(ErrorKind::Unknown, Some(500)));
        assert!(is_retryable(ErrorKind::Unknown, Some(650)));
        assert!(!is_retryable(ErrorKind::Unknown, Some(418)));
        assert!(!is_retryable(ErrorKind::Unknown, None));
    }

    #[test]
    fn transport_failures_are_retryable_network_errors() {
        let e = classify(Failure::Transport(&TransportError::Timeout));
        assert_eq!(e.code(), ErrorKind::NetworkError);
        assert!(e.retryable());
        assert_eq!(e.status(), None);
    }

    #[test]
    fn parse_failures_are_not_retryable() {
        let err = serde_json::from_str::<Value>("{not json").unwrap_err();
        let e = classify(Failure::Parse(&err));
        assert_eq!(e.code(), ErrorKind::ParseError);
        assert!(!e.retryable());
    }

    #[test]
    fn message_taken_from_json_body() {
        let e = classify_response(&response(409, r#"{"message":"duplicate key"}"#));
        assert_eq!(e.message(), "duplicate key");
        assert_eq!(e.status(), Some(409));

        let e = classify_response(&response(500, "<html>oops</html>"));
        assert_eq!(e.message(), "HTTP 500");
    }

    #[test]
    fn retry_after_header_captured() {
        let mut r = response(429, "");
        r.headers.insert("Retry-After", "3");
        let e = classify_response(&r);
        assert_eq!(e.retry_after(), Some(std::time::Duration::from_secs(3)));
        assert_eq!(e.details().and_then(|d| d.get("status")), Some(&json!(429)));
    }
}
