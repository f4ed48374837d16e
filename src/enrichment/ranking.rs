//! Multi-factor ranking of deduplicated search items.
//!
//! ```text
//! composite = (keyword*0.40 + popularity*0.25 + engagement*0.15
//!              + freshness*0.15 + domain*0.05) * domain
//! ```
//!
//! `domain` is 1.2 for hosts on the trusted allowlist and 1.0 otherwise, so a
//! trusted source compounds an already strong match rather than rescuing a weak one.

use crate::models::{RankedItem, SearchItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const KEYWORD_WEIGHT: f64 = 0.40;
const POPULARITY_WEIGHT: f64 = 0.25;
const ENGAGEMENT_WEIGHT: f64 = 0.15;
const FRESHNESS_WEIGHT: f64 = 0.15;
const DOMAIN_WEIGHT: f64 = 0.05;

/// Points at which popularity saturates
const POPULARITY_CAP: f64 = 100.0;
/// Comments at which engagement saturates
const ENGAGEMENT_CAP: f64 = 50.0;
/// Freshness decay constant in days
const FRESHNESS_DECAY_DAYS: f64 = 30.0;

pub const TRUSTED_DOMAIN_BOOST: f64 = 1.2;

/// Hosts that receive the domain trust boost (subdomains included)
pub const TRUSTED_DOMAINS: &[&str] = &[
    "github.com",
    "stackoverflow.com",
    "developer.mozilla.org",
    "rust-lang.org",
    "python.org",
    "nodejs.org",
    "react.dev",
    "web.dev",
    "kubernetes.io",
    "arxiv.org",
    "martinfowler.com",
    "aws.amazon.com",
    "cloud.google.com",
    "learn.microsoft.com",
];

/// Per-factor scores for one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub keyword: f64,
    pub popularity: f64,
    pub engagement: f64,
    pub freshness: f64,
    pub domain: f64,
    pub composite: f64,
}

/// Scores and orders items by composite relevance
#[derive(Debug, Clone)]
pub struct Ranker {
    trusted_domains: Vec<String>,
}

impl Ranker {
    pub fn new() -> Self {
        Self {
            trusted_domains: TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Ranker with a custom allowlist
    pub fn with_trusted_domains(domains: Vec<String>) -> Self {
        Self {
            trusted_domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    /// Rank against the current time
    pub fn rank(&self, items: Vec<SearchItem>, keywords: &[String]) -> Vec<RankedItem> {
        self.rank_at(items, keywords, Utc::now())
    }

    /// Rank against a fixed `now`; ties keep input order
    pub fn rank_at(
        &self,
        items: Vec<SearchItem>,
        keywords: &[String],
        now: DateTime<Utc>,
    ) -> Vec<RankedItem> {
        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        let mut scored: Vec<(SearchItem, f64)> = items
            .into_iter()
            .map(|item| {
                let composite = self.score_lowered(&item, &lowered, now).composite;
                (item, composite)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (item, relevance_score))| RankedItem {
                item,
                relevance_score,
                rank: i + 1,
            })
            .collect()
    }

    /// Factor breakdown for one item
    pub fn score(&self, item: &SearchItem, keywords: &[String], now: DateTime<Utc>) -> ScoreBreakdown {
        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.score_lowered(item, &lowered, now)
    }

    fn score_lowered(&self, item: &SearchItem, keywords: &[String], now: DateTime<Utc>) -> ScoreBreakdown {
        let keyword = keyword_match_ratio(item, keywords);
        let popularity = (item.score as f64 / POPULARITY_CAP).clamp(0.0, 1.0);
        let engagement = (item.comment_count as f64 / ENGAGEMENT_CAP).clamp(0.0, 1.0);
        let freshness = (-item.age_days(now) / FRESHNESS_DECAY_DAYS).exp();
        let domain = if self.is_trusted(item.url.as_deref()) {
            TRUSTED_DOMAIN_BOOST
        } else {
            1.0
        };

        let composite = (keyword * KEYWORD_WEIGHT
            + popularity * POPULARITY_WEIGHT
            + engagement * ENGAGEMENT_WEIGHT
            + freshness * FRESHNESS_WEIGHT
            + domain * DOMAIN_WEIGHT)
            * domain;

        ScoreBreakdown {
            keyword,
            popularity,
            engagement,
            freshness,
            domain,
            composite,
        }
    }

    /// Host equals or is a subdomain of an allowlisted domain
    pub fn is_trusted(&self, url: Option<&str>) -> bool {
        let Some(host) = url
            .and_then(|u| reqwest::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        else {
            return false;
        };
        let host = host.strip_prefix("www.").unwrap_or(&host);

        self.trusted_domains
            .iter()
            .any(|d| host == d.as_str() || host.ends_with(&format!(".{}", d)))
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of (lowercased) keywords found in the item's title or author
pub fn keyword_match_ratio(item: &SearchItem, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = format!(
        "{} {}",
        item.title.to_lowercase(),
        item.author.as_deref().unwrap_or_default().to_lowercase()
    );
    let matched = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
    matched as f64 / keywords.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn keywords(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_scenario_popular_fresh_match_ranks_first() {
        let now = Utc::now();
        let items = vec![
            SearchItem::new("low", "React testing notes", now - Duration::days(40))
                .with_url("https://blog.example.com/low")
                .with_engagement(10, 2),
            SearchItem::new("mid", "Scalable apps with React", now - Duration::days(10))
                .with_url("https://blog.example.com/mid")
                .with_engagement(40, 10),
            SearchItem::new("top", "Building scalable React applications", now - Duration::days(1))
                .with_url("https://blog.example.com/top")
                .with_engagement(150, 60),
        ];

        let ranked = Ranker::new().rank_at(items, &keywords(&["react", "scalable"]), now);

        assert_eq!(ranked[0].item.id, "top");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].item.id, "low");
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sorted_descending() {
        let now = Utc::now();
        let items: Vec<_> = (0..25)
            .map(|i| {
                SearchItem::new(i.to_string(), format!("rust post {}", i), now - Duration::days(i))
                    .with_url(format!("https://example.com/{}", i))
                    .with_engagement((i * 17 % 120) as i64, (i * 7 % 60) as i64)
            })
            .collect();

        let ranked = Ranker::new().rank_at(items, &keywords(&["rust", "tokio"]), now);
        for pair in ranked.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
            assert!(pair[0].rank < pair[1].rank);
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let now = Utc::now();
        let items = vec![
            SearchItem::new("a", "same", now).with_url("https://x.com/a"),
            SearchItem::new("b", "same", now).with_url("https://x.com/b"),
            SearchItem::new("c", "same", now).with_url("https://x.com/c"),
        ];

        let ranked = Ranker::new().rank_at(items, &keywords(&["same"]), now);
        let ids: Vec<_> = ranked.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_score_components() {
        let now = Utc::now();
        let item = SearchItem::new("1", "Async Rust with Tokio", now)
            .with_url("https://github.com/tokio-rs/tokio")
            .with_author("carllerche")
            .with_engagement(250, 25);

        let breakdown = Ranker::new().score(&item, &keywords(&["Rust", "tokio", "carl", "go"]), now);

        assert_eq!(breakdown.keyword, 0.75);
        assert_eq!(breakdown.popularity, 1.0);
        assert_eq!(breakdown.engagement, 0.5);
        assert!((breakdown.freshness - 1.0).abs() < 1e-9);
        assert_eq!(breakdown.domain, TRUSTED_DOMAIN_BOOST);

        let expected = (0.75 * 0.40 + 0.25 + 0.5 * 0.15 + 0.15 + 1.2 * 0.05) * 1.2;
        assert!((breakdown.composite - expected).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_decay() {
        let now = Utc::now();
        let item = SearchItem::new("1", "old", now - Duration::days(30));
        let breakdown = Ranker::new().score(&item, &[], now);
        assert!((breakdown.freshness - (-1.0f64).exp()).abs() < 1e-6);
        assert_eq!(breakdown.keyword, 0.0);
    }

    #[test]
    fn test_trusted_domains() {
        let ranker = Ranker::new();
        assert!(ranker.is_trusted(Some("https://github.com/rust-lang/rust")));
        assert!(ranker.is_trusted(Some("https://www.rust-lang.org/learn")));
        assert!(ranker.is_trusted(Some("https://blog.rust-lang.org/2024")));
        assert!(!ranker.is_trusted(Some("https://notgithub.com/x")));
        assert!(!ranker.is_trusted(Some("not a url")));
        assert!(!ranker.is_trusted(None));
    }

    #[test]
    fn test_trusted_boost_compounds() {
        let now = Utc::now();
        let plain = SearchItem::new("1", "rust", now)
            .with_url("https://example.com/rust")
            .with_engagement(50, 10);
        let trusted = plain.clone().with_url("https://github.com/rust");

        let ranker = Ranker::new();
        let kw = keywords(&["rust"]);
        let plain_score = ranker.score(&plain, &kw, now).composite;
        let trusted_score = ranker.score(&trusted, &kw, now).composite;
        assert!(trusted_score > plain_score);
    }

    #[test]
    fn test_deterministic() {
        let now = Utc::now();
        let items = vec![
            SearchItem::new("1", "x", now).with_url("https://a.com"),
            SearchItem::new("2", "y", now - Duration::days(3)).with_url("https://b.com"),
        ];
        let kw = keywords(&["x"]);
        let ranker = Ranker::new();
        assert_eq!(ranker.rank_at(items.clone(), &kw, now), ranker.rank_at(items, &kw, now));
    }
}
