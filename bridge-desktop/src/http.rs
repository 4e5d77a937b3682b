//! `reqwest` transport for desktop and CI hosts.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client over a pooled `reqwest::Client` with rustls.
///
/// `execute` sends once. `execute_with_retry` retries connection failures
/// and 429/5xx statuses, waiting at least as long as `Retry-After` asks
/// (capped by the policy's `max_delay`). When attempts run out on a
/// retryable status the last response is handed back so the caller can
/// read the status and headers itself.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Like [`try_with_timeout`](Self::try_with_timeout), but falls back to an
    /// untuned `reqwest::Client` when the builder fails.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::try_with_timeout(timeout).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Self::with_client(Client::new())
        })
    }

    pub fn try_with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(Self::with_client)
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }

    fn prepare(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = request.headers.iter().fold(
            self.client.request(Self::method(request.method), &request.url),
            |builder, (name, value)| builder.header(name, value),
        );
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.prepare(request).send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            size = body.len(),
            "HTTP response"
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: reqwest::Error) -> BridgeError {
    let reason = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    BridgeError::OperationFailed(format!("HTTP {}: {}", reason, err))
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_once(&request).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut retry = 0;

        loop {
            let outcome = self.send_once(&request).await;
            retry += 1;

            let wait = match &outcome {
                Ok(response) if response.is_retryable() && retry < attempts => {
                    let backoff = policy.delay_for(retry);
                    warn!(status = response.status, attempt = retry, "Retryable HTTP status");
                    Some(
                        response
                            .retry_after()
                            .map_or(backoff, |asked| asked.max(backoff).min(policy.max_delay)),
                    )
                }
                Err(e) if retry < attempts => {
                    warn!(error = %e, attempt = retry, "HTTP request failed");
                    Some(policy.delay_for(retry))
                }
                _ => None,
            };
            let Some(wait) = wait else {
                return outcome;
            };

            debug!(delay_ms = wait.as_millis() as u64, url = %request.url, "Retrying");
            sleep(wait).await;
        }
    }
}
