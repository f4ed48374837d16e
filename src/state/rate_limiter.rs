use crate::config::RateLimitSettings;
use crate::error::Result;
use crate::metrics;
use crate::state::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

/// Fixed-window per-user counter on the shared store.
///
/// The window starts at a user's first request (the `EXPIRE` set when the
/// counter reads 1). A counter found without a TTL is re-armed, so a lost
/// `EXPIRE` cannot pin it forever. Any store failure, timeout, or missing
/// store allows the request.
#[derive(Clone)]
pub struct RateLimiter {
    store: Option<Arc<dyn KeyValueStore>>,
    key_prefix: String,
    window_secs: u64,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        settings: &RateLimitSettings,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            key_prefix: settings.key_prefix.clone(),
            window_secs: settings.window_secs,
            store_timeout,
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    fn key(&self, user_id: &str) -> String {
        format!("{}:{}", self.key_prefix, user_id)
    }

    /// True when the request fits within `limit` for the current window
    pub async fn check_limit(&self, user_id: &str, limit: u64) -> bool {
        let Some(store) = self.store.as_ref() else {
            tracing::debug!(user_id = %user_id, "No rate limit store configured, allowing request");
            metrics::record_rate_limit("fail_open");
            return true;
        };

        let key = self.key(user_id);
        let count = match tokio::time::timeout(self.store_timeout, self.increment(store, &key)).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "Rate limit store failed, allowing request");
                metrics::record_rate_limit("fail_open");
                return true;
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user_id,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Rate limit store timed out, allowing request"
                );
                metrics::record_rate_limit("fail_open");
                return true;
            }
        };

        let allowed = count <= limit as i64;
        if allowed {
            metrics::record_rate_limit("allowed");
        } else {
            tracing::info!(user_id = %user_id, count, limit, "Rate limit exceeded");
            metrics::record_rate_limit("denied");
        }
        allowed
    }

    async fn increment(&self, store: &Arc<dyn KeyValueStore>, key: &str) -> Result<i64> {
        let count = store.incr(key).await?;
        if count == 1 || store.ttl(key).await? == -1 {
            if count > 1 {
                tracing::warn!(key, count, "Rate limit counter had no TTL, re-arming window");
            }
            store.expire(key, self.window_secs).await?;
        }
        Ok(count)
    }
}
