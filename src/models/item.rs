use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion record returned by the search upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// Opaque upstream identifier
    pub id: String,

    /// Discussion title
    pub title: String,

    /// Linked URL (absent for text-only posts)
    pub url: Option<String>,

    /// Submitter
    pub author: Option<String>,

    /// Popularity signal (points / votes)
    pub score: i64,

    /// Number of comments
    pub comment_count: i64,

    /// Submission time
    pub created_at: DateTime<Utc>,
}

impl SearchItem {
    /// Create an item with no URL, author, score, or comments
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            author: None,
            score: 0,
            comment_count: 0,
            created_at,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_engagement(mut self, score: i64, comment_count: i64) -> Self {
        self.score = score;
        self.comment_count = comment_count;
        self
    }

    /// Fractional age in days relative to `now`, never negative
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.created_at).num_seconds().max(0);
        secs as f64 / 86_400.0
    }
}

/// A search item with its computed relevance and 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: SearchItem,

    /// Composite relevance score
    pub relevance_score: f64,

    /// Position in the ranked list, starting at 1
    pub rank: usize,
}
