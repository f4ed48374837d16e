pub mod deduplication;

pub use deduplication::DeduplicationEngine;
