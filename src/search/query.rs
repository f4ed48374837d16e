//! Search query options and upstream parameter encoding

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which ordering the upstream should apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SearchOrder {
    /// Relevance / popularity ordering
    #[default]
    Relevance,
    /// Newest first
    Recency,
}

/// Options for one search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Upstream tag filter, e.g. `story`
    pub tags: Option<String>,

    /// Only items with more points than this
    pub min_points: Option<u32>,

    /// Only items newer than this many days
    pub max_age_days: Option<u32>,

    /// Hits per page
    pub limit: usize,

    /// Extra attempts after a failure
    pub retries: u32,

    pub order: SearchOrder,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            tags: None,
            min_points: None,
            max_age_days: None,
            limit: 20,
            retries: 3,
            order: SearchOrder::Relevance,
        }
    }
}

impl SearchOptions {
    /// Popularity-filtered shape
    pub fn relevance(limit: usize, min_points: u32, max_age_days: u32) -> Self {
        Self {
            min_points: Some(min_points),
            max_age_days: Some(max_age_days),
            limit,
            order: SearchOrder::Relevance,
            ..Default::default()
        }
    }

    /// Short-window, newest-first shape
    pub fn recency(limit: usize, max_age_days: u32) -> Self {
        Self {
            max_age_days: Some(max_age_days),
            limit,
            order: SearchOrder::Recency,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// `numericFilters` value, e.g. `points>10,created_at_i>1700000000`
    pub fn numeric_filters(&self, now: DateTime<Utc>) -> Option<String> {
        let mut filters = Vec::new();

        if let Some(min_points) = self.min_points {
            filters.push(format!("points>{}", min_points));
        }

        if let Some(days) = self.max_age_days {
            let cutoff = now - Duration::days(days as i64);
            filters.push(format!("created_at_i>{}", cutoff.timestamp()));
        }

        if filters.is_empty() {
            None
        } else {
            Some(filters.join(","))
        }
    }

    /// Full query-parameter list for the upstream request
    pub fn query_params(&self, query: &str, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.to_string()),
            ("hitsPerPage", self.limit.to_string()),
        ];

        if let Some(ref tags) = self.tags {
            params.push(("tags", tags.clone()));
        }

        if let Some(filters) = self.numeric_filters(now) {
            params.push(("numericFilters", filters));
        }

        params
    }
}
