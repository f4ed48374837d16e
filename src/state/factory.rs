use crate::config::{CacheBackend, CacheSettings};
use crate::error::{AppError, Result};
use crate::state::{InMemoryStore, KeyValueStore, RedisStore};
use std::sync::Arc;

/// Create the shared store for the configured backend.
///
/// Returns `Ok(None)` for the `none` backend and when Redis cannot be reached;
/// callers then run on the in-process fallback. A missing `redis_url` is a
/// configuration error.
pub async fn create_store(config: &CacheSettings) -> Result<Option<Arc<dyn KeyValueStore>>> {
    match config.backend {
        CacheBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Redis backend requires 'redis_url' configuration".to_string(),
                )
            })?;

            tracing::info!("Initializing Redis storage backend");

            match RedisStore::new(redis_url).await {
                Ok(store) => Ok(Some(Arc::new(store))),
                Err(AppError::Configuration(msg)) => Err(AppError::Configuration(msg)),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, continuing with in-process cache only");
                    Ok(None)
                }
            }
        }

        CacheBackend::Memory => Ok(Some(create_in_memory_store())),

        CacheBackend::None => {
            tracing::info!("Shared store disabled");
            Ok(None)
        }
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn KeyValueStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}
