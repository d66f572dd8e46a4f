//! libcurl-backed transport.
//!
//! The transfer itself is blocking; it runs on tokio's blocking pool so the
//! async caller only suspends.

use std::str;
use std::time::Duration;

use curl::easy::{Easy, List};

use super::{HeaderMap, HttpRequest, HttpResponse, Method, Transport, TransportError};

#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(30))
    }
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            connect_timeout,
            timeout,
        }
    }
}

impl Transport for CurlTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.perform(&request))
            .await
            .map_err(|e| TransportError::Task(e.to_string()))?
    }
}

impl CurlTransport {
    /// Runs one transfer on the current thread. Any status is a response;
    /// only transport failures are errors.
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut easy = Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        // Attaching a body switches curl to POST, so any other verb is sent
        // as a custom request line.
        match (request.method, &request.body) {
            (Method::Get, None) => easy.get(true)?,
            (Method::Head, None) => easy.nobody(true)?,
            (Method::Post, None) => easy.post(true)?,
            (Method::Post, Some(body)) => easy.post_fields_copy(body)?,
            (Method::Head, Some(body)) => {
                easy.post_fields_copy(body)?;
                easy.nobody(true)?;
                easy.custom_request("HEAD")?;
            }
            (other, Some(body)) => {
                easy.post_fields_copy(body)?;
                easy.custom_request(other.as_str())?;
            }
            (other, None) => easy.custom_request(other.as_str())?,
        }

        let mut list = List::new();
        for (name, value) in request.headers.iter() {
            // Let curl own Accept-Encoding so it also decodes the body.
            if name == "accept-encoding" {
                easy.accept_encoding(value)?;
                continue;
            }
            list.append(&format!("{}: {}", name, value))?;
        }
        easy.http_headers(list)?;

        let mut body = Vec::new();
        let mut headers = HeaderMap::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    let line = line.trim_end();
                    // A new status line means a redirect hop; keep only the final headers.
                    if line.starts_with("HTTP/") {
                        headers = HeaderMap::new();
                    } else {
                        headers.push_raw_line(line);
                    }
                }
                true
            })?;
            transfer.perform().map_err(map_curl_error)?;
        }

        let status = easy.response_code()? as u16;
        tracing::trace!(method = request.method.as_str(), url = %request.url, status, "http transfer done");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_curl_error(e: curl::Error) -> TransportError {
    if e.is_operation_timedout() {
        return TransportError::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransportError::Connect(e.to_string());
    }
    TransportError::Curl(e)
}
