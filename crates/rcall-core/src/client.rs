//! Remote client: the surface application code talks to.
//!
//! Every call goes through one shared [`RetryExecutor`], so the circuit
//! breaker and metrics see all traffic to the backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use url::Url;

use crate::breaker::CircuitBreaker;
use crate::config::RcallConfig;
use crate::retry::{classify_parse, classify_response, ErrorKind, HealthReport, RemoteError, RetryExecutor};
use crate::transport::{CurlTransport, HttpRequest, HttpResponse, RetryableFetch, Transport};

pub struct RemoteClient<T> {
    base_url: Option<Url>,
    health_path: String,
    transport: T,
    executor: Arc<RetryExecutor>,
}

impl RemoteClient<RetryableFetch<CurlTransport>> {
    /// Client over curl with the fetch decorator, wired from config.
    pub fn from_config(cfg: &RcallConfig) -> Result<Self> {
        let transport = RetryableFetch::with_config(
            CurlTransport::new(
                Duration::from_secs(cfg.transport.connect_timeout_secs),
                Duration::from_secs(cfg.transport.timeout_secs),
            ),
            (&cfg.fetch).into(),
        );
        let executor = RetryExecutor::new(
            CircuitBreaker::new((&cfg.breaker).into()),
            cfg.retry.backoff(),
        )
        .with_max_retries(cfg.retry.max_retries);

        let mut client = RemoteClient::new(transport, Arc::new(executor));
        if let Some(base) = &cfg.base_url {
            client = client.with_base_url(base)?;
        }
        Ok(client.with_health_path(&cfg.health_path))
    }
}

impl<T: Transport> RemoteClient<T> {
    pub fn new(transport: T, executor: Arc<RetryExecutor>) -> Self {
        Self {
            base_url: None,
            health_path: "/".to_string(),
            transport,
            executor,
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let mut url = Url::parse(base).with_context(|| format!("invalid base URL {}", base))?;
        // join() drops the last segment unless the base path ends in '/'
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.health_path = path.to_string();
        self
    }

    pub fn executor(&self) -> &Arc<RetryExecutor> {
        &self.executor
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, RemoteError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        let base = self.base_url.as_ref().ok_or_else(|| {
            RemoteError::new(
                ErrorKind::BadRequest,
                format!("relative path {} without a base URL", path),
                false,
            )
        })?;
        base.join(path.trim_start_matches('/')).map_err(|e| {
            RemoteError::new(ErrorKind::BadRequest, format!("invalid path {}: {}", path, e), false)
        })
    }

    /// Single send: transport failures and non-2xx statuses become classified errors.
    async fn send_once(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(classify_response(&response))
        }
    }

    /// Send `request` through the executor and return the successful response.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.executor
            .run(|| self.send_once(request.clone()))
            .await
    }

    /// Send `request` through the executor and decode a 2xx JSON body.
    /// A body that does not decode is a non-retryable `ParseError`.
    pub async fn request_json<V: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<V, RemoteError> {
        self.executor
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self.send_once(request).await?;
                    response.json::<V>().map_err(|e| classify_parse(&e))
                }
            })
            .await
    }

    pub async fn get_json<V: DeserializeOwned>(&self, path: &str) -> Result<V, RemoteError> {
        let url = self.resolve(path)?;
        self.request_json(HttpRequest::get(url.as_str())).await
    }

    /// Minimal read of the health path with a single attempt.
    pub async fn test_connection(&self) -> bool {
        let url = match self.resolve(&self.health_path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("health probe not possible: {}", e);
                return false;
            }
        };
        let request = HttpRequest::get(url.as_str());
        match self
            .executor
            .run_with_retries(1, || self.send_once(request.clone()))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(code = %e.code(), "health probe failed: {}", e.message());
                false
            }
        }
    }

    pub fn get_metrics(&self) -> HealthReport {
        self.executor.health()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CircuitBreakerConfig;
    use crate::retry::BackoffPolicy;
    use crate::transport::scripted::{ScriptedTransport, Step};
    use serde_json::Value;

    fn client(steps: Vec<Step>) -> RemoteClient<ScriptedTransport> {
        let executor = RetryExecutor::new(
            CircuitBreaker::new(CircuitBreakerConfig::default()),
            BackoffPolicy::fetch_default(),
        );
        RemoteClient::new(ScriptedTransport::new(steps), Arc::new(executor))
            .with_base_url("http://backend.test/api/")
            .unwrap()
    }

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let c = client(vec![]);
        assert_eq!(
            c.resolve("/projects/1").unwrap().as_str(),
            "http://backend.test/api/projects/1"
        );
        assert_eq!(c.resolve("http://other.test/x").unwrap().as_str(), "http://other.test/x");

        let bare = RemoteClient::new(
            ScriptedTransport::new(vec![]),
            Arc::new(RetryExecutor::default()),
        );
        assert_eq!(bare.resolve("/x").unwrap_err().code(), ErrorKind::BadRequest);
    }

    #[test]
    fn base_without_trailing_slash_keeps_last_segment() {
        let c = RemoteClient::new(
            ScriptedTransport::new(vec![]),
            Arc::new(RetryExecutor::default()),
        )
        .with_base_url("https://x.supabase.co/rest/v1")
        .unwrap();
        assert_eq!(
            c.resolve("tasks").unwrap().as_str(),
            "https://x.supabase.co/rest/v1/tasks"
        );
        assert_eq!(
            c.resolve("/tasks?id=eq.4").unwrap().as_str(),
            "https://x.supabase.co/rest/v1/tasks?id=eq.4"
        );

        let host_only = RemoteClient::new(
            ScriptedTransport::new(vec![]),
            Arc::new(RetryExecutor::default()),
        )
        .with_base_url("http://backend.test")
        .unwrap();
        assert_eq!(host_only.resolve("health").unwrap().as_str(), "http://backend.test/health");
    }

    #[tokio::test(start_paused = true)]
    async fn get_json_retries_server_errors() {
        let c = client(vec![Step::Status(503, ""), Step::Status(200, r#"{"id":3}"#)]);
        let v: Value = c.get_json("tasks/3").await.unwrap();
        assert_eq!(v["id"], 3);
        assert_eq!(c.transport.calls(), 2);
        assert_eq!(c.get_metrics().metrics.successful_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_surfaces_immediately() {
        let c = client(vec![Step::Status(404, r#"{"message":"no such task"}"#)]);
        let err = c.get_json::<Value>("tasks/9").await.unwrap_err();
        assert_eq!(err.code(), ErrorKind::NotFound);
        assert_eq!(err.message(), "no such task");
        assert_eq!(c.transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_body_is_parse_error() {
        let c = client(vec![Step::Status(200, "<html>")]);
        let err = c.get_json::<Value>("profile").await.unwrap_err();
        assert_eq!(err.code(), ErrorKind::ParseError);
        assert!(!err.retryable());
        assert_eq!(c.transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_errors_are_retried() {
        let c = client(vec![Step::Fail, Step::Fail, Step::Fail]);
        let err = c.get_json::<Value>("profile").await.unwrap_err();
        assert_eq!(err.code(), ErrorKind::NetworkError);
        assert_eq!(c.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_connection_uses_single_attempt() {
        let ok = client(vec![Step::Status(200, "")]);
        assert!(ok.test_connection().await);

        let down = client(vec![Step::Status(503, ""), Step::Status(200, "")]);
        assert!(!down.test_connection().await);
        assert_eq!(down.transport.calls(), 1);
        let report = down.get_metrics();
        assert_eq!(report.metrics.failed_requests, 1);
        assert_eq!(report.breaker.failure_count, 1);
    }
}
