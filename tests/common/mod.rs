//! Shared fixtures for integration tests: a scripted search backend, item
//! builders, service construction, and Prometheus output helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use discussion_enricher::config::Config;
use discussion_enricher::models::SearchItem;
use discussion_enricher::search::{
    SearchBackend, SearchClient, SearchError, SearchOptions, SearchOrder, SearchResult,
};
use discussion_enricher::state::KeyValueStore;
use discussion_enricher::EnrichmentService;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Search backend returning canned hits per order, or failing every call
pub struct ScriptedBackend {
    relevance: Vec<SearchItem>,
    recency: Vec<SearchItem>,
    failing: bool,
    calls: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(relevance: Vec<SearchItem>, recency: Vec<SearchItem>) -> Arc<Self> {
        Arc::new(Self {
            relevance,
            recency,
            failing: false,
            calls: AtomicU32::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            relevance: Vec::new(),
            recency: Vec::new(),
            failing: true,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SearchError::RequestFailed("connection refused".to_string()));
        }
        Ok(match options.order {
            SearchOrder::Relevance => self.relevance.clone(),
            SearchOrder::Recency => self.recency.clone(),
        })
    }
}

/// Item with a URL, `points` score, and comment count, created `age_days` ago
pub fn item(id: &str, title: &str, url: &str, points: i64, comments: i64, age_days: i64) -> SearchItem {
    SearchItem::new(id, title, Utc::now() - Duration::days(age_days))
        .with_url(url)
        .with_author(format!("author{}", id))
        .with_engagement(points, comments)
}

/// Three React discussions with scores [150, 40, 10] and ages [1, 10, 40] days
pub fn react_items() -> Vec<SearchItem> {
    vec![
        item("top", "Building scalable React applications in 2024", "https://blog.example.com/scalable-react", 150, 60, 1),
        item("mid", "Lessons from a large React codebase", "https://eng.example.org/react-lessons", 40, 12, 10),
        item("low", "React state management compared", "https://dev.example.net/react-state", 10, 3, 40),
    ]
}

/// Defaults with fast retries and one cache bucket spanning the whole run
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.search.retries = 2;
    config.search.backoff_base_ms = 1;
    // Every timestamp before 2070 falls in bucket 0
    config.cache.bucket_secs = 100 * 365 * 86_400;
    config
}

pub fn build_service(
    config: &Config,
    backend: Arc<ScriptedBackend>,
    store: Option<Arc<dyn KeyValueStore>>,
) -> EnrichmentService {
    let client = SearchClient::new(backend)
        .with_backoff_base(std::time::Duration::from_millis(config.search.backoff_base_ms));
    EnrichmentService::new(config, client, store)
}

/// Metric name satisfies `[a-zA-Z_:][a-zA-Z0-9_:]*` and is not reserved
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == ':') || name.starts_with("__") {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Names of all metrics declared with `# TYPE` lines
pub fn declared_metrics(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("# TYPE "))
        .filter_map(|rest| {
            let mut parts = rest.split_whitespace();
            Some((parts.next()?.to_string(), parts.next()?.to_string()))
        })
        .collect()
}

/// Value of the first sample line starting with `prefix`
pub fn sample_value(output: &str, prefix: &str) -> Option<f64> {
    output
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|value| value.parse().ok())
}
