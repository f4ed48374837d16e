//! Discussion search clients with timeout, retry, and exponential backoff

use crate::config::SearchSettings;
use crate::metrics;
use crate::models::SearchItem;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{SearchOptions, SearchOrder};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// User-Agent sent with upstream requests
const USER_AGENT: &str = concat!("discussion-enricher/", env!("CARGO_PKG_VERSION"));

/// A single-attempt discussion search transport
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Perform one request; no retrying
    async fn fetch(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchItem>>;
}

/// Algolia-style discussion search over HTTP
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpSearchBackend {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> SearchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    fn endpoint(&self, order: SearchOrder) -> String {
        match order {
            SearchOrder::Relevance => format!("{}/search", self.base_url),
            SearchOrder::Recency => format!("{}/search_by_date", self.base_url),
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchItem>> {
        let url = self.endpoint(options.order);
        let params = options.query_params(query, Utc::now());

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.request_timeout.as_millis() as u64)
                } else {
                    SearchError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_hits(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "objectID")]
    object_id: Option<String>,
    title: Option<String>,
    story_title: Option<String>,
    url: Option<String>,
    story_url: Option<String>,
    author: Option<String>,
    points: Option<i64>,
    num_comments: Option<i64>,
    created_at_i: Option<i64>,
}

impl RawHit {
    /// Typed item, or `None` when id, title, or timestamp is missing
    fn into_item(self) -> Option<SearchItem> {
        let id = self.object_id.filter(|id| !id.is_empty())?;
        let title = self
            .title
            .or(self.story_title)
            .filter(|t| !t.trim().is_empty())?;
        let created_at = Utc.timestamp_opt(self.created_at_i?, 0).single()?;
        let url = self.url.or(self.story_url).filter(|u| !u.is_empty());

        Some(SearchItem {
            id,
            title,
            url,
            author: self.author.filter(|a| !a.is_empty()),
            score: self.points.unwrap_or(0),
            comment_count: self.num_comments.unwrap_or(0),
            created_at,
        })
    }
}

/// Validate an upstream body into typed items
pub(crate) fn parse_hits(body: &str) -> SearchResult<Vec<SearchItem>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

    let total = response.hits.len();
    let items: Vec<SearchItem> = response
        .hits
        .into_iter()
        .filter_map(RawHit::into_item)
        .collect();

    if items.len() < total {
        debug!(
            skipped = total - items.len(),
            "Skipped search hits missing id, title, or timestamp"
        );
    }

    Ok(items)
}

/// Retrying search client; retries are sequential per call
#[derive(Clone)]
pub struct SearchClient {
    backend: Arc<dyn SearchBackend>,
    request_timeout: Duration,
    backoff_base: Duration,
}

impl SearchClient {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            request_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
        }
    }

    /// HTTP client built from settings
    pub fn from_settings(settings: &SearchSettings) -> SearchResult<Self> {
        let request_timeout = Duration::from_secs(settings.request_timeout_secs);
        let backend = HttpSearchBackend::new(settings.base_url.clone(), request_timeout)?;

        Ok(Self::new(Arc::new(backend))
            .with_request_timeout(request_timeout)
            .with_backoff_base(Duration::from_millis(settings.backoff_base_ms)))
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Search with retries; returns the last error once retries are exhausted
    pub async fn try_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> SearchResult<Vec<SearchItem>> {
        let order = options.order.to_string();
        let mut attempt = 0;

        loop {
            let result = match timeout(self.request_timeout, self.backend.fetch(query, options)).await
            {
                Ok(result) => result,
                Err(_) => Err(SearchError::Timeout(self.request_timeout.as_millis() as u64)),
            };

            match result {
                Ok(items) => {
                    metrics::record_search(&order, "success");
                    debug!(
                        backend = self.backend.name(),
                        order = %order,
                        hits = items.len(),
                        attempt = attempt + 1,
                        "Search succeeded"
                    );
                    return Ok(items);
                }
                Err(e) => {
                    if attempt >= options.retries {
                        metrics::record_search(&order, "failure");
                        warn!(
                            backend = self.backend.name(),
                            order = %order,
                            attempts = attempt + 1,
                            error = %e,
                            "Search failed after all retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff_delay(attempt);
                    metrics::SEARCH_RETRIES_TOTAL.inc();
                    info!(
                        order = %order,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying search"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Search that never fails: exhausted retries yield an empty list
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchItem> {
        self.try_search(query, options).await.unwrap_or_default()
    }
}
