use crate::config::SearchSettings;
use crate::enrichment::formatter::ContextFormatter;
use crate::enrichment::ranking::Ranker;
use crate::error::{AppError, Result};
use crate::models::{ContextPack, EnrichmentConfig, SearchItem};
use crate::processing::DeduplicationEngine;
use crate::search::{SearchClient, SearchOptions};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cache-miss path: fetch, merge, dedupe, rank, format
pub struct EnrichmentPipeline {
    search: SearchClient,
    settings: SearchSettings,
    deduplicator: DeduplicationEngine,
    ranker: Ranker,
    formatter: ContextFormatter,
}

impl EnrichmentPipeline {
    pub fn new(search: SearchClient, settings: SearchSettings) -> Self {
        Self {
            search,
            settings,
            deduplicator: DeduplicationEngine::new(),
            ranker: Ranker::new(),
            formatter: ContextFormatter::new(),
        }
    }

    /// Relevance and recency query shapes for one call; each asks for twice
    /// the citation limit so dedup and ranking have headroom
    pub fn search_options(&self, config: &EnrichmentConfig) -> (SearchOptions, SearchOptions) {
        let hits = config.limit.saturating_mul(2);

        let relevance = SearchOptions::relevance(
            hits,
            config.min_points.unwrap_or(self.settings.relevance_min_points),
            config.max_age_days.unwrap_or(self.settings.relevance_max_age_days),
        )
        .with_tags(self.settings.tags.clone())
        .with_retries(self.settings.retries);

        let recency = SearchOptions::recency(hits, self.settings.recency_max_age_days)
            .with_tags(self.settings.tags.clone())
            .with_retries(self.settings.retries);

        (relevance, recency)
    }

    /// Build a pack for `keywords`.
    ///
    /// Fails only when both queries exhaust their retries, so a total upstream
    /// outage is never cached.
    pub async fn run(&self, keywords: &[String], config: &EnrichmentConfig) -> Result<ContextPack> {
        let start = Instant::now();
        let query = keywords.join(" ");
        let (relevance_opts, recency_opts) = self.search_options(config);

        let (relevance, recency) = futures::future::join(
            self.search.try_search(&query, &relevance_opts),
            self.search.try_search(&query, &recency_opts),
        )
        .await;

        let merged: Vec<SearchItem> = match (relevance, recency) {
            (Err(relevance_err), Err(recency_err)) => {
                warn!(
                    query = %query,
                    relevance_error = %relevance_err,
                    recency_error = %recency_err,
                    "Both discussion searches failed"
                );
                return Err(AppError::from(recency_err));
            }
            (relevance, recency) => {
                if let Err(ref e) = relevance {
                    warn!(query = %query, error = %e, "Relevance search failed, using recency results only");
                }
                if let Err(ref e) = recency {
                    warn!(query = %query, error = %e, "Recency search failed, using relevance results only");
                }
                relevance
                    .unwrap_or_default()
                    .into_iter()
                    .chain(recency.unwrap_or_default())
                    .collect()
            }
        };

        let fetched = merged.len();
        let unique = self.deduplicator.dedupe(merged);
        let ranked = self.ranker.rank(unique, keywords);
        let formatted = self
            .formatter
            .format(&ranked, keywords, config.limit, config.context_style);

        debug!(fetched, ranked = ranked.len(), "Ranked discussion results");
        info!(
            query = %query,
            citations = formatted.citations.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Built context pack"
        );

        Ok(ContextPack {
            query,
            context_text: formatted.context_text,
            citations: formatted.citations,
            cache_hit: false,
            retrieved_at: Utc::now(),
        })
    }
}
