/// Prometheus metrics for the enrichment engine.
///
/// Metrics are created eagerly and can always be recorded; they only show up in
/// [`gather_metrics`] output after [`init_metrics`] registers them.
///
/// # Example
/// ```no_run
/// use discussion_enricher::metrics::{init_metrics, gather_metrics, CACHE_LOOKUPS_TOTAL};
///
/// init_metrics().ok();
/// CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
/// println!("{}", gather_metrics());
/// ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "discussion_enricher";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Enrichment calls by terminal outcome
    ///
    /// Labels: outcome (disabled, invalid, rate_limited, no_keywords, cache_hit, computed, degraded)
    pub static ref ENRICH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("enrich_requests_total", "Total number of enrichment requests")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create ENRICH_REQUESTS_TOTAL metric");

    /// End-to-end enrichment duration in seconds
    pub static ref ENRICH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("enrich_duration_seconds", "Enrichment duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("Failed to create ENRICH_DURATION_SECONDS metric");

    /// Cache lookups
    ///
    /// Labels: result (hit, miss, error)
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cache_lookups_total", "Total number of enrichment cache lookups")
            .namespace(NAMESPACE),
        &["result"]
    ).expect("Failed to create CACHE_LOOKUPS_TOTAL metric");

    /// Search calls after retries
    ///
    /// Labels: order, outcome (success, failure)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of discussion search calls")
            .namespace(NAMESPACE),
        &["order", "outcome"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Individual search retries
    pub static ref SEARCH_RETRIES_TOTAL: Counter = Counter::with_opts(
        Opts::new("search_retries_total", "Total number of search retry attempts")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_RETRIES_TOTAL metric");

    /// Items dropped as duplicates
    pub static ref DEDUPLICATED_ITEMS_TOTAL: Counter = Counter::with_opts(
        Opts::new("deduplicated_items_total", "Total number of search items dropped as duplicates")
            .namespace(NAMESPACE)
    ).expect("Failed to create DEDUPLICATED_ITEMS_TOTAL metric");

    /// Rate limiter decisions
    ///
    /// Labels: decision (allowed, denied, fail_open)
    pub static ref RATE_LIMIT_DECISIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("rate_limit_decisions_total", "Total number of rate limit decisions")
            .namespace(NAMESPACE),
        &["decision"]
    ).expect("Failed to create RATE_LIMIT_DECISIONS_TOTAL metric");
}

/// Register all metrics with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(ENRICH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(ENRICH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_RETRIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DEDUPLICATED_ITEMS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RATE_LIMIT_DECISIONS_TOTAL.clone()))?;

    tracing::debug!("Enrichment metrics registered");
    Ok(())
}

/// Export registered metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

pub fn record_enrich(outcome: &str) {
    ENRICH_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cache_lookup(result: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_search(order: &str, outcome: &str) {
    SEARCH_REQUESTS_TOTAL.with_label_values(&[order, outcome]).inc();
}

pub fn record_rate_limit(decision: &str) {
    RATE_LIMIT_DECISIONS_TOTAL.with_label_values(&[decision]).inc();
}
