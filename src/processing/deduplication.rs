use crate::metrics;
use crate::models::SearchItem;
use std::collections::HashSet;

/// Default title similarity above which an item is a near-duplicate
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Deduplication engine for merged search results
///
/// Order-preserving and first-seen-wins. Items without a URL are dropped. Title
/// comparison is pairwise against every accepted title, which is fine for the
/// tens of items a fan-out returns.
#[derive(Debug, Clone)]
pub struct DeduplicationEngine {
    similarity_threshold: f64,
}

impl DeduplicationEngine {
    pub fn new() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Drop items sharing a normalized URL or a near-identical normalized title
    pub fn dedupe(&self, items: Vec<SearchItem>) -> Vec<SearchItem> {
        let total = items.len();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut seen_titles: Vec<String> = Vec::new();
        let mut accepted = Vec::with_capacity(total);

        for item in items {
            let Some(url) = item.url.as_deref().map(normalize_url) else {
                continue;
            };
            if url.is_empty() || seen_urls.contains(&url) {
                continue;
            }

            let title = normalize_title(&item.title);
            let near_duplicate = seen_titles
                .iter()
                .any(|seen| title_similarity(seen, &title) > self.similarity_threshold);
            if near_duplicate {
                tracing::debug!(item_id = %item.id, title = %item.title, "Dropped near-duplicate title");
                continue;
            }

            seen_urls.insert(url);
            seen_titles.push(title);
            accepted.push(item);
        }

        let dropped = total - accepted.len();
        if dropped > 0 {
            metrics::DEDUPLICATED_ITEMS_TOTAL.inc_by(dropped as f64);
            tracing::debug!(total, dropped, "Deduplicated search items");
        }

        accepted
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, strip scheme, leading `www.`, and trailing slashes
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

/// Lowercase and keep only alphanumerics
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// `1 - levenshtein / max_len`; two empty strings are identical
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Levenshtein distance over chars, two-row table
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
