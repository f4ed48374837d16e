use moka::future::Cache;
use std::time::Duration;

/// In-process string cache, used when the shared store is absent or failing
#[derive(Clone)]
pub struct LocalCache {
    cache: Cache<String, String>,
}

impl LocalCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, value: String) {
        self.cache.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Keys currently held under `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_ref().clone())
            .collect()
    }

    /// Remove every key under `prefix`; returns how many were removed
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys = self.keys_with_prefix(prefix);
        for key in &keys {
            self.cache.invalidate(key).await;
        }
        keys.len()
    }

    /// Approximate bytes held by keys and values
    pub fn approximate_size(&self) -> usize {
        self.cache.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
