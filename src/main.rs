use discussion_enricher::{
    config::{Config, ObservabilityConfig},
    metrics, EnrichmentConfig, EnrichmentService,
};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// One enrichment request per input line
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichRequest {
    prompt: String,
    #[serde(default)]
    config: EnrichmentConfig,
    user_id: Option<String>,
}

fn init_tracing(observability: &ObservabilityConfig) {
    // stdout carries responses, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("discussion_enricher={}", observability.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn invalid_request(message: impl std::fmt::Display) -> serde_json::Value {
    tracing::warn!(error = %message, "Rejected malformed request line");
    json!({
        "error": { "code": "INVALID_REQUEST", "message": message.to_string() }
    })
}

/// Decode one raw input line; `Ok(None)` for blank lines
fn parse_request(raw: &[u8]) -> Result<Option<EnrichRequest>, serde_json::Value> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| invalid_request(format!("Request line is not valid UTF-8: {}", e)))?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some).map_err(invalid_request)
}

async fn handle_request(service: &EnrichmentService, request: EnrichRequest) -> serde_json::Value {

    match service
        .enrich(&request.prompt, &request.config, request.user_id.as_deref())
        .await
    {
        Ok(pack) => json!({ "pack": pack }),
        Err(e) => json!({
            "error": { "code": e.error_code(), "message": e.to_string() }
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config.observability);
    tracing::info!(
        service = %config.observability.service_name,
        "Starting discussion enricher v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let service = EnrichmentService::from_config(&config).await?;

    match service.cache_stats().await {
        Ok(stats) => tracing::info!(
            backend = %stats.backend,
            total_keys = stats.total_keys,
            memory = %stats.memory_usage,
            "Cache ready"
        ),
        Err(e) => tracing::warn!(error = %e, "Cache stats unavailable"),
    }

    let mut input = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    let mut stdout = tokio::io::stdout();
    let mut handled: u64 = 0;

    tracing::info!("Reading enrichment requests from stdin");

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    tracing::info!("Input closed");
                    break;
                }

                let response = match parse_request(&buf) {
                    Ok(Some(request)) => handle_request(&service, request).await,
                    Ok(None) => {
                        buf.clear();
                        continue;
                    }
                    Err(rejection) => rejection,
                };
                buf.clear();

                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
                stdout.flush().await?;
                handled += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!(handled, "Discussion enricher stopped");
    if config.observability.prometheus_enabled {
        tracing::debug!(metrics = %metrics::gather_metrics(), "Final metrics");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let request = parse_request(br#"{"prompt":"hi","userId":"alice"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(request.prompt, "hi");
        assert_eq!(request.user_id.as_deref(), Some("alice"));
        assert!(request.config.enabled);
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_request(b"  \n").unwrap().is_none());
    }

    #[test]
    fn test_non_utf8_line_is_rejected_not_fatal() {
        let rejection = parse_request(b"\xff\xfe bad\n").unwrap_err();
        assert_eq!(rejection["error"]["code"], "INVALID_REQUEST");
        assert!(rejection["error"]["message"]
            .as_str()
            .unwrap()
            .contains("UTF-8"));

        // The next line still parses
        let next = parse_request(br#"{"prompt":"hi","config":{"enabled":false}}"#)
            .unwrap()
            .unwrap();
        assert!(!next.config.enabled);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let rejection = parse_request(b"{not json}").unwrap_err();
        assert_eq!(rejection["error"]["code"], "INVALID_REQUEST");
    }
}
