//! Notion API connector implementation
//!
//! Implements `RemoteStore` and `BlockSource` over an `HttpClient`.

use async_trait::async_trait;
use bridge_traits::blocks::{Block, BlockSource};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::remote::{PropertyPatch, RecordQuery, RemoteRecord, RemoteStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::{NotionError, Result};
use crate::types::{
    filter_json, sort_json, ApiErrorBody, DatabaseQueryBody, PageUpdateBody, PaginatedList,
    RawBlock,
};

/// Notion API base URL
pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// API version sent with every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// Maximum results per page (Notion API limit)
const MAX_PAGE_SIZE: u32 = 100;

/// Notion averages three requests per second per integration
const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(334);

const DEFAULT_MAX_RETRIES: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Enforces a minimum delay between consecutive requests
struct RateLimiter {
    last_request: Option<Instant>,
    min_delay: Duration,
}

impl RateLimiter {
    fn new(min_delay: Duration) -> Self {
        Self {
            last_request: None,
            min_delay,
        }
    }

    async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Notion API connector
///
/// # Features
///
/// - Paginated database queries and block listings
/// - Exponential backoff on 429 and 5xx, honouring `Retry-After`
/// - Minimum spacing between requests shared by all callers of one connector
///
/// # Example
///
/// ```ignore
/// use provider_notion::NotionConnector;
/// use bridge_traits::remote::{RecordQuery, RemoteStore};
///
/// let connector = NotionConnector::new(http_client, secret);
/// let records = connector.query(&RecordQuery::new(database_id)).await?;
/// ```
pub struct NotionConnector {
    http_client: Arc<dyn HttpClient>,
    token: String,
    api_base: String,
    max_retries: u32,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl NotionConnector {
    /// Create a connector authenticated with an internal integration token.
    pub fn new(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: token.into(),
            api_base: NOTION_API_BASE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_MIN_REQUEST_INTERVAL))),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(interval)));
        self
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", self.api_base, path))
            .bearer_token(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    /// Send a request, retrying rate-limited and server errors.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.lock().await.wait_if_needed().await;

            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!("API request succeeded: status={}", response.status);
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() => {
                    attempt += 1;
                    let retry_after = response.retry_after();

                    if attempt >= self.max_retries {
                        warn!(
                            "API request failed after {} attempts: status={}",
                            attempt, response.status
                        );
                        return Err(if response.is_rate_limited() {
                            NotionError::RateLimitExceeded {
                                retry_after_seconds: retry_after.map_or(1, |d| d.as_secs()),
                            }
                        } else {
                            Self::api_error(&response)
                        });
                    }

                    let backoff = retry_after
                        .unwrap_or_else(|| Duration::from_millis(100 * 2u64.pow(attempt)));
                    warn!(
                        "API request failed (attempt {}/{}): status={}, retrying in {:?}",
                        attempt, self.max_retries, response.status, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(response) => {
                    warn!("API request failed: status={}", response.status);
                    return Err(match response.status {
                        401 => NotionError::Unauthorized(Self::api_error(&response).to_string()),
                        404 => NotionError::NotFound(Self::api_error(&response).to_string()),
                        _ => Self::api_error(&response),
                    });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        warn!("API request failed after {} attempts: {}", attempt, e);
                        return Err(e.into());
                    }

                    let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, self.max_retries, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn api_error(response: &HttpResponse) -> NotionError {
        let body: ApiErrorBody = serde_json::from_slice(&response.body).unwrap_or_else(|_| ApiErrorBody {
            code: "unknown".to_string(),
            message: response.body_text_lossy(),
        });

        NotionError::ApiError {
            status_code: response.status,
            code: body.code,
            message: body.message,
        }
    }

    fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| NotionError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    /// Query a database, following pagination to the last page.
    #[instrument(skip(self, query), fields(database_id = %query.database_id))]
    pub async fn query_database(&self, query: &RecordQuery) -> Result<Vec<RemoteRecord>> {
        let path = format!("/databases/{}/query", query.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = DatabaseQueryBody {
                filter: query.filter.as_ref().map(filter_json),
                sorts: query.sorts.iter().map(sort_json).collect(),
                start_cursor: cursor.take(),
                page_size: MAX_PAGE_SIZE,
            };
            let request = self.request(HttpMethod::Post, &path).json(&body)?;
            let response = self.send(request).await?;
            let page: PaginatedList<RemoteRecord> = Self::parse(&response, "database query")?;

            records.extend(page.results);
            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        info!("Queried {} records from Notion", records.len());
        Ok(records)
    }

    /// Overwrite the given properties of a page.
    #[instrument(skip(self, properties), fields(page_id = %page_id))]
    pub async fn update_page(&self, page_id: &str, properties: &PropertyPatch) -> Result<()> {
        let request = self
            .request(HttpMethod::Patch, &format!("/pages/{}", page_id))
            .json(&PageUpdateBody { properties })?;
        self.send(request).await?;

        info!("Updated {} properties", properties.len());
        Ok(())
    }

    /// List every direct child of a page or block.
    #[instrument(skip(self), fields(block_id = %block_id))]
    pub async fn block_children(&self, block_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut path = format!("/blocks/{}/children?page_size={}", block_id, MAX_PAGE_SIZE);
            if let Some(start) = cursor.take() {
                path.push_str(&format!("&start_cursor={}", urlencoding::encode(&start)));
            }

            let response = self.send(self.request(HttpMethod::Get, &path)).await?;
            let page: PaginatedList<RawBlock> = Self::parse(&response, "block children")?;

            blocks.extend(page.results.into_iter().map(Block::from));
            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} child blocks", blocks.len());
        Ok(blocks)
    }
}

#[async_trait]
impl RemoteStore for NotionConnector {
    async fn query(&self, query: &RecordQuery) -> BridgeResult<Vec<RemoteRecord>> {
        Ok(self.query_database(query).await?)
    }

    async fn update(&self, record_id: &str, properties: &PropertyPatch) -> BridgeResult<()> {
        Ok(self.update_page(record_id, properties).await?)
    }
}

#[async_trait]
impl BlockSource for NotionConnector {
    async fn list_children(&self, block_id: &str) -> BridgeResult<Vec<Block>> {
        Ok(self.block_children(block_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::remote::{PropertyValue, RecordFilter, RecordSort, SortDirection};
    use bytes::Bytes;
    use mockall::{mock, Sequence};
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

    fn connector(http: MockHttpClient) -> NotionConnector {
        NotionConnector::new(Arc::new(http), "secret_test")
            .with_min_request_interval(Duration::ZERO)
    }

    const PAGE: &str = r#"{
        "object": "page",
        "id": "p1",
        "created_time": "2023-04-12T10:00:00.000Z",
        "last_edited_time": "2023-04-13T10:00:00.000Z",
        "properties": {
            "status": { "id": "s", "type": "select", "select": { "name": "published" } }
        }
    }"#;

    #[tokio::test]
    async fn test_query_sends_filter_and_follows_cursor() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();

        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                assert_eq!(req.url, "https://api.notion.com/v1/databases/db1/query");
                assert_eq!(req.headers.get("Notion-Version"), Some(&NOTION_VERSION.to_string()));
                assert_eq!(
                    req.headers.get("Authorization"),
                    Some(&"Bearer secret_test".to_string())
                );

                let body: serde_json::Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
                assert_eq!(body["filter"]["select"]["equals"], "published");
                assert_eq!(body["sorts"][0]["direction"], "ascending");
                assert!(body.get("start_cursor").is_none());

                Ok(response(
                    200,
                    &format!(r#"{{ "results": [{}], "has_more": true, "next_cursor": "c2" }}"#, PAGE),
                ))
            });
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                let body: serde_json::Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
                assert_eq!(body["start_cursor"], "c2");
                Ok(response(
                    200,
                    &format!(r#"{{ "results": [{}], "has_more": false, "next_cursor": null }}"#, PAGE),
                ))
            });

        let query = RecordQuery::new("db1")
            .filter(RecordFilter::SelectEquals {
                property: "status".to_string(),
                value: "published".to_string(),
            })
            .sort(RecordSort::LastEditedTime(SortDirection::Ascending));

        let records = connector(http).query(&query).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "p1");
    }

    #[tokio::test]
    async fn test_update_patches_page_properties() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Patch);
            assert!(req.url.ends_with("/pages/p1"));

            let body: serde_json::Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["properties"]["abbrlink"]["rich_text"][0]["text"]["content"], "x");
            assert_eq!(body.as_object().unwrap().len(), 1);
            Ok(response(200, PAGE))
        });

        let mut patch = PropertyPatch::new();
        patch.insert("abbrlink".to_string(), PropertyValue::rich_text("x"));

        connector(http).update("p1", &patch).await.unwrap();
    }

    #[tokio::test]
    async fn test_block_children_pagination() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();

        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.ends_with("/blocks/page1/children?page_size=100"));
                Ok(response(
                    200,
                    r#"{ "results": [ { "id": "b1", "type": "paragraph", "has_children": false, "paragraph": { "rich_text": [] } } ],
                         "has_more": true, "next_cursor": "next/1" }"#,
                ))
            });
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.ends_with("&start_cursor=next%2F1"));
                Ok(response(
                    200,
                    r#"{ "results": [ { "id": "b2", "type": "divider", "has_children": false, "divider": {} } ],
                         "has_more": false, "next_cursor": null }"#,
                ))
            });

        let blocks = connector(http).list_children("page1").await.unwrap();
        let kinds: Vec<&str> = blocks.iter().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, vec!["paragraph", "divider"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_are_retried() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();

        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(502, "bad gateway")));
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, r#"{ "results": [], "has_more": false }"#)));

        let blocks = connector(http).list_children("page1").await.unwrap();
        assert!(blocks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(2).returning(|_| {
            let mut limited = response(429, r#"{ "code": "rate_limited", "message": "slow down" }"#);
            limited.headers.insert("Retry-After".to_string(), "2".to_string());
            Ok(limited)
        });

        let err = connector(http)
            .with_max_retries(2)
            .block_children("page1")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotionError::RateLimitExceeded {
                retry_after_seconds: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(response(
                404,
                r#"{ "object": "error", "status": 404, "code": "object_not_found", "message": "Could not find block" }"#,
            ))
        });

        let err = connector(http).list_children("missing").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_error_message() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(response(
                400,
                r#"{ "code": "validation_error", "message": "abbrlink is not a property that exists." }"#,
            ))
        });

        let err = connector(http)
            .update_page("p1", &PropertyPatch::new())
            .await
            .unwrap_err();

        match err {
            NotionError::ApiError {
                status_code, code, ..
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(code, "validation_error");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
