use crate::config::{Config, RateLimitSettings};
use crate::enrichment::cache::{CacheStats, ContextCache};
use crate::enrichment::keywords::KeywordExtractor;
use crate::enrichment::pipeline::EnrichmentPipeline;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ContextPack, EnrichmentConfig};
use crate::search::SearchClient;
use crate::state::{create_store, KeyValueStore, RateLimiter};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use validator::Validate;

/// Enrichment service: the single entry point for building context packs.
///
/// Dependencies are injected at construction. The shared store is optional;
/// without it caching stays in-process and rate limiting allows every request.
pub struct EnrichmentService {
    extractor: KeywordExtractor,
    pipeline: EnrichmentPipeline,
    cache: ContextCache,
    rate_limiter: RateLimiter,
    rate_limit: RateLimitSettings,
}

impl EnrichmentService {
    /// Create a new enrichment service
    pub fn new(
        config: &Config,
        search_client: SearchClient,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let store_timeout = Duration::from_millis(config.cache.store_timeout_ms);

        Self {
            extractor: KeywordExtractor::new(),
            pipeline: EnrichmentPipeline::new(search_client, config.search.clone()),
            cache: ContextCache::new(store.clone(), &config.cache),
            rate_limiter: RateLimiter::new(store, &config.rate_limit, store_timeout),
            rate_limit: config.rate_limit.clone(),
        }
    }

    /// Build the HTTP search client and shared store from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let search_client = SearchClient::from_settings(&config.search)?;
        let store = create_store(&config.cache).await?;

        info!(
            cache_backend = store.as_ref().map_or("local", |s| s.backend_name()),
            rate_limit_enabled = config.rate_limit.enabled,
            "Enrichment service initialized"
        );

        Ok(Self::new(config, search_client, store))
    }

    /// Build a context pack for `prompt`.
    ///
    /// Only invalid configuration and a per-user rate limit rejection are
    /// returned as errors; every other failure degrades to an empty pack.
    pub async fn enrich(
        &self,
        prompt: &str,
        config: &EnrichmentConfig,
        user_id: Option<&str>,
    ) -> Result<ContextPack> {
        let start = Instant::now();
        let result = self.enrich_inner(prompt, config, user_id).await;
        metrics::ENRICH_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());
        result
    }

    async fn enrich_inner(
        &self,
        prompt: &str,
        config: &EnrichmentConfig,
        user_id: Option<&str>,
    ) -> Result<ContextPack> {
        if let Err(e) = config.validate() {
            metrics::record_enrich("invalid");
            return Err(AppError::from(e));
        }

        if !config.enabled {
            metrics::record_enrich("disabled");
            return Ok(ContextPack::empty(""));
        }

        if let Some(user_id) = user_id {
            self.check_rate_limit(user_id).await?;
        }

        let keywords = self.resolve_keywords(prompt, config);
        if keywords.is_empty() {
            debug!("No keywords extracted, returning empty context pack");
            metrics::record_enrich("no_keywords");
            return Ok(ContextPack::empty(""));
        }

        let key = self.cache.cache_key(&keywords, config, Utc::now());
        let computed = self
            .cache
            .get_or_compute(&key, || self.pipeline.run(&keywords, config))
            .await;

        match computed {
            Ok(pack) => {
                metrics::record_enrich(if pack.cache_hit { "cache_hit" } else { "computed" });
                Ok(pack)
            }
            Err(e) => {
                warn!(error = %e, keywords = ?keywords, "Enrichment degraded to empty context pack");
                metrics::record_enrich("degraded");
                Ok(ContextPack::empty(keywords.join(" ")))
            }
        }
    }

    async fn check_rate_limit(&self, user_id: &str) -> Result<()> {
        if !self.rate_limit.enabled {
            return Ok(());
        }

        if self
            .rate_limiter
            .check_limit(user_id, self.rate_limit.max_requests)
            .await
        {
            return Ok(());
        }

        metrics::record_enrich("rate_limited");
        Err(AppError::RateLimit {
            user_id: user_id.to_string(),
            limit: self.rate_limit.max_requests,
            window_secs: self.rate_limiter.window_secs(),
        })
    }

    /// Explicit keywords win over extraction from the prompt and title
    fn resolve_keywords(&self, prompt: &str, config: &EnrichmentConfig) -> Vec<String> {
        if !config.keywords.is_empty() {
            return config.keywords.iter().map(|k| k.trim().to_string()).collect();
        }
        self.extractor.extract(prompt, config.title.as_deref())
    }

    /// Key count and memory for cached context packs
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.cache.stats().await
    }

    /// Remove all cached context packs; returns the number of keys removed
    pub async fn clear_cache(&self) -> Result<usize> {
        let removed = self.cache.clear().await?;
        info!(removed, backend = self.cache.backend(), "Cleared enrichment cache");
        Ok(removed)
    }
}
