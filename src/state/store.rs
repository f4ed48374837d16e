use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Key/value operations the cache layer and rate limiter need from a shared store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for stats and logs
    fn backend_name(&self) -> &str;

    /// GET
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// SETEX
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// DEL; returns the number of keys removed
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// KEYS with a `*` glob pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Atomic INCR; a missing key counts from zero
    async fn incr(&self, key: &str) -> Result<i64>;

    /// EXPIRE; false when the key does not exist
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// TTL in seconds; -1 when the key has no expiry, -2 when it does not exist
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Human-readable memory usage of the store
    async fn memory_usage(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Expired entries are swept once every this many writes
const SWEEP_EVERY_WRITES: u64 = 128;

/// In-memory key/value store (for development and testing)
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, StoredValue>>,
    writes: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deadline(ttl_secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(ttl_secs)
    }

    /// Drop every expired entry, including keys nobody reads again
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, v| !v.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, "Purged expired keys");
        }
        purged
    }

    fn note_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            self.purge_expired();
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, v| v.is_expired(now));
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Some(Self::deadline(ttl_secs)),
            },
        );
        tracing::trace!(key, ttl_secs, "Stored key");
        self.note_write();
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .filter(|(_, v)| !v.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|e| !e.is_expired(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        // The entry guard holds the shard lock, so read-modify-write is atomic
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                if stored.is_expired(now) {
                    *stored = StoredValue {
                        value: "1".to_string(),
                        expires_at: None,
                    };
                    return Ok(1);
                }
                let current: i64 = stored.value.parse().map_err(|_| {
                    AppError::Cache(format!("Value at '{}' is not an integer", key))
                })?;
                let next = current + 1;
                stored.value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue {
                    value: "1".to_string(),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(Self::deadline(ttl_secs));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        Ok(match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match entry.expires_at {
                Some(at) => at.saturating_duration_since(now).as_secs() as i64,
                None => -1,
            },
            _ => -2,
        })
    }

    async fn memory_usage(&self) -> Result<String> {
        let bytes: usize = self
            .entries
            .iter()
            .map(|e| e.key().len() + e.value().value.len())
            .sum();
        Ok(format_bytes(bytes))
    }
}

/// Redis-style glob matching, `*` only
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if text.len() < first.len() + last.len() || !text.starts_with(first) || !text.ends_with(last)
    {
        return false;
    }

    let mut rest = &text[first.len()..text.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(pos) => rest = &rest[pos + middle.len()..],
            None => return false,
        }
    }
    true
}

pub(crate) fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KB * KB {
        format!("{:.2}M", b / (KB * KB))
    } else if b >= KB {
        format!("{:.2}K", b / KB)
    } else {
        format!("{}B", bytes)
    }
}
