use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use super::item::RankedItem;

/// How downstream consumers are told to weave sources into generated text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContextStyle {
    /// Cite inline while discussing each point
    #[default]
    Integrated,
    /// Cite at the end of the sentence that relies on a source
    Reference,
    /// Collect sources in a closing section
    Appendix,
}

/// Per-call enrichment options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentConfig {
    /// Run enrichment at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Explicit search terms; extracted from the prompt when empty
    #[serde(default)]
    #[validate(length(max = 10), custom(function = "validate_keywords"))]
    pub keywords: Vec<String>,

    /// Optional post title fed to keyword extraction
    #[validate(length(max = 500))]
    pub title: Option<String>,

    /// Points floor for the relevance query
    #[validate(range(max = 100_000))]
    pub min_points: Option<u32>,

    /// Age ceiling for the relevance query (days)
    #[validate(range(min = 1, max = 3650))]
    pub max_age_days: Option<u32>,

    /// Maximum number of citations returned
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: usize,

    /// Citation style for the usage guidelines
    #[serde(default)]
    pub context_style: ContextStyle,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: Vec::new(),
            title: None,
            min_points: None,
            max_age_days: None,
            limit: default_limit(),
            context_style: ContextStyle::default(),
        }
    }
}

impl EnrichmentConfig {
    /// Config that short-circuits to an empty pack
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_limit() -> usize {
    10
}

#[allow(clippy::ptr_arg)]
fn validate_keywords(keywords: &Vec<String>) -> Result<(), ValidationError> {
    if keywords.iter().any(|k| k.trim().is_empty() || k.len() > 100) {
        let mut err = ValidationError::new("keywords");
        err.message = Some("keywords must be non-blank and at most 100 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Stable, serializable reference to one ranked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Marker used in the context text, e.g. `SRC-1`
    pub id: String,

    /// 1-based position
    pub index: usize,

    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,

    /// Upstream identifier of the cited item
    pub source_object_id: String,
}

impl Citation {
    pub fn marker(index: usize) -> String {
        format!("SRC-{}", index)
    }

    /// Build the citation for the item at `index` (1-based)
    pub fn from_ranked(index: usize, ranked: &RankedItem) -> Self {
        let item = &ranked.item;
        Self {
            id: Self::marker(index),
            index,
            title: item.title.clone(),
            url: item.url.clone(),
            author: item.author.clone(),
            score: item.score,
            comment_count: item.comment_count,
            created_at: item.created_at,
            source_object_id: item.id.clone(),
        }
    }
}

/// The engine's output contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPack {
    /// Search query the pack was built from
    pub query: String,

    /// Rendered, citation-annotated text block
    pub context_text: String,

    /// One citation per shown ranked item, ordered by rank
    pub citations: Vec<Citation>,

    /// Served from a successful cache read
    pub cache_hit: bool,

    pub retrieved_at: DateTime<Utc>,
}

impl ContextPack {
    /// Empty-but-valid pack (disabled, no keywords, or degraded retrieval)
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context_text: String::new(),
            citations: Vec::new(),
            cache_hit: false,
            retrieved_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}
