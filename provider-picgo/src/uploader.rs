//! PicGo upload client
//!
//! The server exposes a single endpoint:
//!
//! ```text
//! POST {server}/upload   {"list": ["https://source/image.png"]}
//!   -> {"success": true, "result": ["https://cdn/image.png"]}
//! ```

use async_trait::async_trait;
use bridge_traits::content::AssetUploader;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{PicGoError, Result};

/// Uploads go through an image bed and can be slow
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    list: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    result: Vec<String>,

    #[serde(default)]
    message: Option<String>,
}

pub struct PicGoUploader {
    http_client: Arc<dyn HttpClient>,
    upload_url: String,
    retry_policy: RetryPolicy,
}

impl PicGoUploader {
    /// Create an uploader for the server at `server_url` (e.g. `http://127.0.0.1:36677`).
    pub fn new(http_client: Arc<dyn HttpClient>, server_url: &str) -> Self {
        Self {
            http_client,
            upload_url: format!("{}/upload", server_url.trim_end_matches('/')),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Ask the server to re-host `source_url`.
    ///
    /// Returns `Ok(None)` when the server reports failure or returns no URL.
    #[instrument(skip(self))]
    pub async fn rehost(&self, source_url: &str) -> Result<Option<String>> {
        let request = HttpRequest::new(HttpMethod::Post, self.upload_url.as_str())
            .header("Accept", "application/json")
            .json(&UploadRequest { list: [source_url] })?
            .timeout(UPLOAD_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        if !response.is_success() {
            return Err(PicGoError::ServerError {
                status_code: response.status,
                message: response.body_text_lossy(),
            });
        }

        let body: UploadResponse = serde_json::from_slice(&response.body)
            .map_err(|e| PicGoError::ParseError(e.to_string()))?;

        if !body.success {
            warn!(
                "PicGo rejected upload: {}",
                body.message.as_deref().unwrap_or("no message")
            );
            return Ok(None);
        }

        let uploaded = body.result.into_iter().next().filter(|url| !url.is_empty());
        debug!(uploaded = ?uploaded, "Upload finished");
        Ok(uploaded)
    }
}

#[async_trait]
impl AssetUploader for PicGoUploader {
    async fn upload(&self, source_url: &str) -> BridgeResult<Option<String>> {
        Ok(self.rehost(source_url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_returns_first_result() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.url, "http://127.0.0.1:36677/upload");

            let body: serde_json::Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body, serde_json::json!({ "list": ["https://host/a.png"] }));

            Ok(response(
                200,
                r#"{ "success": true, "result": ["https://cdn/a.png"] }"#,
            ))
        });

        let uploader = PicGoUploader::new(Arc::new(http), "http://127.0.0.1:36677/");
        let uploaded = uploader.upload("https://host/a.png").await.unwrap();

        assert_eq!(uploaded.as_deref(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn test_unsuccessful_upload_yields_none() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(response(
                200,
                r#"{ "success": false, "message": "image bed not configured" }"#,
            ))
        });

        let uploader = PicGoUploader::new(Arc::new(http), "http://localhost:36677");
        assert_eq!(uploader.upload("https://host/a.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_result_yields_none() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{ "success": true, "result": [] }"#)));

        let uploader = PicGoUploader::new(Arc::new(http), "http://localhost:36677");
        assert_eq!(uploader.upload("https://host/a.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "boom")));

        let uploader = PicGoUploader::new(Arc::new(http), "http://localhost:36677");
        let err = uploader.upload("https://host/a.png").await.unwrap_err();

        match err {
            BridgeError::OperationFailed(message) => assert!(message.contains("500")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
