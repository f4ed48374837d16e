//! Error types for discussion search requests

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors from a single search attempt; all of them are retried
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Transport-level failure
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    /// Attempt exceeded the request timeout
    #[error("Search request timed out after {0}ms")]
    Timeout(u64),

    /// Upstream answered with a non-2xx status
    #[error("Search API returned status {0}")]
    Status(u16),

    /// Body was not shaped like `{ hits: [...] }`
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    /// Client could not be constructed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::RequestFailed(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Timeout(ms) => AppError::Timeout(format!("search after {}ms", ms)),
            _ => AppError::Network(err.to_string()),
        }
    }
}
