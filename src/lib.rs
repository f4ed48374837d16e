pub mod config;
pub mod enrichment;
pub mod error;
pub mod metrics;
pub mod models;
pub mod processing;
pub mod search;
pub mod state;

pub use config::Config;
pub use enrichment::EnrichmentService;
pub use error::{AppError, Result};
pub use models::{Citation, ContextPack, ContextStyle, EnrichmentConfig};
