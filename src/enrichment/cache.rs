//! Time-bucketed context pack cache over the shared store.
//!
//! Keys are `"{prefix}:{sha256}"` where the digest covers the sorted keyword
//! set, the options that change the output, and `floor(now / bucket_secs)`.
//! Reads and writes fail open: a store error, timeout, or missing store falls
//! back to the in-process [`LocalCache`].

use crate::config::CacheSettings;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ContextPack, EnrichmentConfig};
use crate::state::{format_bytes, KeyValueStore, LocalCache};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Key counts and memory for the enrichment namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_keys: usize,
    pub memory_usage: String,
    pub backend: String,
}

/// Result of one cache read, recorded once per lookup
#[derive(Debug)]
enum Lookup {
    Hit(ContextPack),
    Miss,
    /// Store failed; carries whatever the in-process cache had
    StoreError(Option<ContextPack>),
}

impl Lookup {
    fn label(&self) -> &'static str {
        match self {
            Lookup::Hit(_) => "hit",
            Lookup::Miss => "miss",
            Lookup::StoreError(_) => "error",
        }
    }

    fn into_pack(self) -> Option<ContextPack> {
        match self {
            Lookup::Hit(pack) => Some(pack),
            Lookup::Miss => None,
            Lookup::StoreError(pack) => pack,
        }
    }
}

pub struct ContextCache {
    store: Option<Arc<dyn KeyValueStore>>,
    local: LocalCache,
    key_prefix: String,
    ttl_secs: u64,
    bucket_secs: u64,
    store_timeout: Duration,
}

impl ContextCache {
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, settings: &CacheSettings) -> Self {
        let bucket_secs = settings.bucket_secs.max(1);
        // Entries must not outlive their bucket
        let ttl_secs = settings.ttl_secs.clamp(1, bucket_secs);
        if ttl_secs != settings.ttl_secs {
            warn!(
                configured = settings.ttl_secs,
                effective = ttl_secs,
                "Cache TTL clamped to the bucket window"
            );
        }

        Self {
            store,
            local: LocalCache::new(settings.local_capacity, Duration::from_secs(ttl_secs)),
            key_prefix: settings.key_prefix.clone(),
            ttl_secs,
            bucket_secs,
            store_timeout: Duration::from_millis(settings.store_timeout_ms),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Backend name reported in stats
    pub fn backend(&self) -> &str {
        self.store.as_ref().map_or("local", |s| s.backend_name())
    }

    fn namespace_pattern(&self) -> String {
        format!("{}:*", self.key_prefix)
    }

    fn namespace_prefix(&self) -> String {
        format!("{}:", self.key_prefix)
    }

    /// Deterministic key for `keywords` under `config` at `now`
    pub fn cache_key(&self, keywords: &[String], config: &EnrichmentConfig, now: DateTime<Utc>) -> String {
        let mut sorted: Vec<String> = keywords.iter().map(|k| k.trim().to_lowercase()).collect();
        sorted.sort();
        sorted.dedup();

        let bucket = now.timestamp().max(0) as u64 / self.bucket_secs;
        let material = format!(
            "{}|min_points={}|max_age_days={}|limit={}|style={}|bucket={}",
            sorted.join(","),
            config.min_points.map_or_else(|| "-".to_string(), |v| v.to_string()),
            config.max_age_days.map_or_else(|| "-".to_string(), |v| v.to_string()),
            config.limit,
            config.context_style,
            bucket
        );

        let digest = Sha256::digest(material.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}:{}", self.key_prefix, hex)
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "Cache store call exceeded {}ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }

    /// Serve `key` from cache, or run `compute` and store its result.
    ///
    /// `cache_hit` is true only on a successful read. Errors from `compute`
    /// are returned and nothing is written.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<ContextPack>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ContextPack>>,
    {
        let lookup = self.lookup(key).await;
        metrics::record_cache_lookup(lookup.label());
        if let Some(mut pack) = lookup.into_pack() {
            pack.cache_hit = true;
            debug!(key = %key, "Context cache hit");
            return Ok(pack);
        }

        let mut pack = compute().await?;
        pack.cache_hit = false;
        self.write(key, &pack).await;
        Ok(pack)
    }

    async fn lookup(&self, key: &str) -> Lookup {
        match self.store.as_ref() {
            Some(store) => match self.with_timeout(store.get(key)).await {
                Ok(raw) => Self::decode(key, raw).map_or(Lookup::Miss, Lookup::Hit),
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache read failed, using in-process cache");
                    Lookup::StoreError(Self::decode(key, self.local.get(key).await))
                }
            },
            None => Self::decode(key, self.local.get(key).await).map_or(Lookup::Miss, Lookup::Hit),
        }
    }

    fn decode(key: &str, raw: Option<String>) -> Option<ContextPack> {
        match serde_json::from_str::<ContextPack>(&raw?) {
            Ok(pack) => Some(pack),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write(&self, key: &str, pack: &ContextPack) {
        let raw = match serde_json::to_string(pack) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize context pack for cache");
                return;
            }
        };

        if let Some(store) = self.store.as_ref() {
            match self.with_timeout(store.set_ex(key, &raw, self.ttl_secs)).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache write failed, using in-process cache");
                }
            }
        }
        self.local.insert(key.to_string(), raw).await;
    }

    /// Key count and memory for the enrichment namespace
    pub async fn stats(&self) -> Result<CacheStats> {
        match self.store.as_ref() {
            Some(store) => {
                let keys = self.with_timeout(store.keys(&self.namespace_pattern())).await?;
                let memory_usage = self.with_timeout(store.memory_usage()).await?;
                Ok(CacheStats {
                    total_keys: keys.len(),
                    memory_usage,
                    backend: store.backend_name().to_string(),
                })
            }
            None => Ok(CacheStats {
                total_keys: self.local.keys_with_prefix(&self.namespace_prefix()).len(),
                memory_usage: format_bytes(self.local.approximate_size()),
                backend: "local".to_string(),
            }),
        }
    }

    /// Remove every enrichment-namespaced key; returns how many were removed
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = self.local.invalidate_prefix(&self.namespace_prefix()).await;

        if let Some(store) = self.store.as_ref() {
            let keys = self.with_timeout(store.keys(&self.namespace_pattern())).await?;
            removed += self.with_timeout(store.del(&keys)).await? as usize;
        }

        Ok(removed)
    }
}
