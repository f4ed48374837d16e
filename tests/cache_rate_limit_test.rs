mod common;

use async_trait::async_trait;
use common::{build_service, react_items, test_config, ScriptedBackend};
use discussion_enricher::config::{CacheBackend, CacheSettings};
use discussion_enricher::error::Result;
use discussion_enricher::state::{create_store, InMemoryStore, KeyValueStore, RateLimiter};
use discussion_enricher::{AppError, EnrichmentConfig};
use std::sync::Arc;
use std::time::Duration;

const PROMPT: &str = "Building scalable React applications";

/// Store whose every call fails, as if the server went away
struct UnreachableStore;

#[async_trait]
impl KeyValueStore for UnreachableStore {
    fn backend_name(&self) -> &str {
        "unreachable"
    }
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> Result<()> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn del(&self, _keys: &[String]) -> Result<u64> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn incr(&self, _key: &str) -> Result<i64> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn expire(&self, _key: &str, _ttl: u64) -> Result<bool> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn ttl(&self, _key: &str) -> Result<i64> {
        Err(AppError::Cache("connection refused".into()))
    }
    async fn memory_usage(&self) -> Result<String> {
        Err(AppError::Cache("connection refused".into()))
    }
}

/// Store that never answers
struct HangingStore;

#[async_trait]
impl KeyValueStore for HangingStore {
    fn backend_name(&self) -> &str {
        "hanging"
    }
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        std::future::pending().await
    }
    async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> Result<()> {
        std::future::pending().await
    }
    async fn del(&self, _keys: &[String]) -> Result<u64> {
        std::future::pending().await
    }
    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        std::future::pending().await
    }
    async fn incr(&self, _key: &str) -> Result<i64> {
        std::future::pending().await
    }
    async fn expire(&self, _key: &str, _ttl: u64) -> Result<bool> {
        std::future::pending().await
    }
    async fn ttl(&self, _key: &str) -> Result<i64> {
        std::future::pending().await
    }
    async fn memory_usage(&self) -> Result<String> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_limit_plus_one_is_rejected() {
    let config = test_config();
    let limit = config.rate_limit.max_requests;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend, Some(Arc::new(InMemoryStore::new())));
    let enrichment = EnrichmentConfig::default();

    for _ in 0..limit {
        assert!(service.enrich(PROMPT, &enrichment, Some("alice")).await.is_ok());
    }

    let err = service
        .enrich(PROMPT, &enrichment, Some("alice"))
        .await
        .unwrap_err();
    match &err {
        AppError::RateLimit {
            user_id,
            limit: reported,
            window_secs,
        } => {
            assert_eq!(user_id, "alice");
            assert_eq!(*reported, limit);
            assert_eq!(*window_secs, 3600);
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
    assert_eq!(err.error_code(), "RATE_LIMIT_EXCEEDED");
    assert!(err.is_retryable());

    // Other users have their own window
    assert!(service.enrich(PROMPT, &enrichment, Some("bob")).await.is_ok());
}

#[tokio::test]
async fn test_rate_limiter_counts_exactly_limit() {
    let config = test_config();
    let limiter = RateLimiter::new(
        Some(Arc::new(InMemoryStore::new())),
        &config.rate_limit,
        Duration::from_millis(500),
    );

    for _ in 0..5 {
        assert!(limiter.check_limit("carol", 5).await);
    }
    assert!(!limiter.check_limit("carol", 5).await);
}

#[tokio::test]
async fn test_rate_limit_disabled_in_config() {
    let mut config = test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.max_requests = 1;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend, Some(Arc::new(InMemoryStore::new())));

    for _ in 0..5 {
        assert!(service
            .enrich(PROMPT, &EnrichmentConfig::default(), Some("alice"))
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn test_unreachable_store_fails_open() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend, Some(Arc::new(UnreachableStore)));

    let first = service
        .enrich(PROMPT, &EnrichmentConfig::default(), Some("alice"))
        .await
        .unwrap();
    let second = service
        .enrich(PROMPT, &EnrichmentConfig::default(), Some("alice"))
        .await
        .unwrap();

    assert_eq!(first.citations.len(), 3);
    // Rate limit skipped, in-process cache served the repeat
    assert!(second.cache_hit);
    assert_eq!(first.citations, second.citations);
}

#[tokio::test]
async fn test_hanging_store_times_out() {
    let mut config = test_config();
    config.cache.store_timeout_ms = 50;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend, Some(Arc::new(HangingStore)));

    let pack = tokio::time::timeout(
        Duration::from_secs(5),
        service.enrich(PROMPT, &EnrichmentConfig::default(), Some("alice")),
    )
    .await
    .expect("enrich must not hang on a stalled store")
    .unwrap();

    assert_eq!(pack.citations.len(), 3);
}

#[tokio::test]
async fn test_no_store_runs_uncapped_with_local_cache() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend.clone(), None);

    for _ in 0..3 {
        service
            .enrich(PROMPT, &EnrichmentConfig::default(), Some("alice"))
            .await
            .unwrap();
    }

    let stats = service.cache_stats().await.unwrap();
    assert_eq!(stats.backend, "local");
    assert_eq!(stats.total_keys, 1);
}

#[tokio::test]
async fn test_clear_cache_keeps_rate_limit_counters() {
    let store = Arc::new(InMemoryStore::new());
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&test_config(), backend, Some(store.clone()));

    service
        .enrich(PROMPT, &EnrichmentConfig::default(), Some("alice"))
        .await
        .unwrap();
    service
        .enrich("Scaling Postgres for analytics", &EnrichmentConfig::default(), Some("alice"))
        .await
        .unwrap();

    let stats = service.cache_stats().await.unwrap();
    assert_eq!(stats.total_keys, 2);
    assert_eq!(stats.backend, "memory");

    assert_eq!(service.clear_cache().await.unwrap(), 2);
    assert_eq!(service.cache_stats().await.unwrap().total_keys, 0);
    assert_eq!(
        store.get("ratelimit:enrichment:alice").await.unwrap(),
        Some("2".to_string())
    );

    let after = service
        .enrich(PROMPT, &EnrichmentConfig::default(), None)
        .await
        .unwrap();
    assert!(!after.cache_hit);
}

#[tokio::test]
async fn test_redis_backed_cache_round_trip() {
    let settings = CacheSettings {
        backend: CacheBackend::Redis,
        redis_url: Some("redis://127.0.0.1:6379/15".to_string()),
        ..Default::default()
    };
    let Some(store) = create_store(&settings).await.unwrap() else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    let mut config = test_config();
    config.cache = settings;
    let backend = ScriptedBackend::new(react_items(), Vec::new());
    let service = build_service(&config, backend, Some(store));
    service.clear_cache().await.unwrap();

    let first = service
        .enrich(PROMPT, &EnrichmentConfig::default(), None)
        .await
        .unwrap();
    let second = service
        .enrich(PROMPT, &EnrichmentConfig::default(), None)
        .await
        .unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.citations, second.citations);

    let stats = service.cache_stats().await.unwrap();
    assert_eq!(stats.backend, "redis");
    assert!(stats.total_keys >= 1);

    service.clear_cache().await.unwrap();
}
