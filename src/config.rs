use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discussion search upstream
    #[serde(default)]
    pub search: SearchSettings,

    /// Shared cache store
    #[serde(default)]
    pub cache: CacheSettings,

    /// Per-user rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load with an explicit override file
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: ENRICHER__)
            .add_source(
                config::Environment::with_prefix("ENRICHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Base URL of the discussion search API
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra attempts after the first failed request
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Backoff base; attempt `n` waits `base * 2^n`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Tag filter sent with every query
    #[serde(default = "default_tags")]
    pub tags: String,

    /// Points floor for the relevance-ordered query
    #[serde(default = "default_relevance_min_points")]
    pub relevance_min_points: u32,

    /// Age ceiling for the relevance-ordered query (days)
    #[serde(default = "default_relevance_max_age_days")]
    pub relevance_max_age_days: u32,

    /// Age ceiling for the recency-ordered query (days)
    #[serde(default = "default_recency_max_age_days")]
    pub recency_max_age_days: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            request_timeout_secs: default_request_timeout(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            tags: default_tags(),
            relevance_min_points: default_relevance_min_points(),
            relevance_max_age_days: default_relevance_max_age_days(),
            recency_max_age_days: default_recency_max_age_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Shared store backend
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis connection string (redis backend only)
    pub redis_url: Option<String>,

    /// Namespace prefix for enrichment keys
    #[serde(default = "default_cache_prefix")]
    pub key_prefix: String,

    /// Entry TTL (seconds); must not exceed the bucket window
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Time bucket width folded into cache keys (seconds)
    #[serde(default = "default_bucket_window")]
    pub bucket_secs: u64,

    /// Timeout applied to every store call (milliseconds)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Capacity of the in-process fallback cache
    #[serde(default = "default_local_capacity")]
    pub local_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            key_prefix: default_cache_prefix(),
            ttl_secs: default_cache_ttl(),
            bucket_secs: default_bucket_window(),
            store_timeout_ms: default_store_timeout_ms(),
            local_capacity: default_local_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Redis,
    #[default]
    Memory,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Enforce per-user limits
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum enrichments per user per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Rolling window (seconds)
    #[serde(default = "default_rate_window")]
    pub window_secs: u64,

    /// Counter key prefix
    #[serde(default = "default_rate_prefix")]
    pub key_prefix: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_rate_window(),
            key_prefix: default_rate_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_search_base_url() -> String {
    "https://hn.algolia.com/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_tags() -> String {
    "story".to_string()
}

fn default_relevance_min_points() -> u32 {
    10
}

fn default_relevance_max_age_days() -> u32 {
    365
}

fn default_recency_max_age_days() -> u32 {
    7
}

fn default_cache_prefix() -> String {
    "enrichment".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_bucket_window() -> u64 {
    300 // 5 minutes
}

fn default_store_timeout_ms() -> u64 {
    500
}

fn default_local_capacity() -> u64 {
    1000
}

fn default_max_requests() -> u64 {
    10
}

fn default_rate_window() -> u64 {
    3600
}

fn default_rate_prefix() -> String {
    "ratelimit:enrichment".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "discussion-enricher".to_string()
}

fn default_true() -> bool {
    true
}
