//! Discussion search retrieval
//!
//! [`SearchClient`] wraps a single-attempt [`SearchBackend`] with a per-attempt
//! timeout and sequential retries using exponential backoff. The default backend
//! talks to an Algolia-style discussion API (`/search` and `/search_by_date`).
//!
//! ```no_run
//! use discussion_enricher::search::{SearchClient, SearchOptions};
//! use discussion_enricher::config::SearchSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::from_settings(&SearchSettings::default())?;
//! let options = SearchOptions::relevance(20, 10, 365).with_tags("story");
//! let items = client.search("rust async", &options).await;
//! println!("{} hits", items.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod query;

pub use client::{HttpSearchBackend, SearchBackend, SearchClient};
pub use error::{SearchError, SearchResult};
pub use query::{SearchOptions, SearchOrder};
