/// Contextual enrichment of prompts with ranked community discussions
///
/// This module provides:
/// - Keyword extraction from prompt and title
/// - Multi-factor ranking with a trusted-domain boost
/// - Citation-annotated context formatting
/// - A time-bucketed, fail-open context cache
/// - The enrichment service facade

pub mod cache;
pub mod formatter;
pub mod keywords;
pub mod pipeline;
pub mod ranking;
pub mod service;

pub use cache::{CacheStats, ContextCache};
pub use formatter::{ContextFormatter, FormattedContext};
pub use keywords::KeywordExtractor;
pub use pipeline::EnrichmentPipeline;
pub use ranking::{Ranker, ScoreBreakdown};
pub use service::EnrichmentService;
