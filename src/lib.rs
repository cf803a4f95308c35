//! Cite-Ripple: a polite citation graph crawler
//!
//! This crate grows a cross-referenced citation graph from a handful of seed works.
//! Each visited work is enriched from a bibliographic API or a politeness-gated page
//! scrape, its references are turned into new works with stable identifiers, and
//! those references are followed wave by wave until the configured limits are hit.

pub mod config;
pub mod crawler;
pub mod identity;
pub mod model;
pub mod references;
pub mod registry;
pub mod resolver;
pub mod review;
pub mod robots;
pub mod sources;
pub mod storage;

use thiserror::Error;

/// Main error type for Cite-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host fragment: {0}")]
    InvalidHost(String),
}

/// Registry lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No record with id {id}")]
    NotFound { id: String },

    #[error("Row {index} out of range (registry holds {len} rows)")]
    RowOutOfRange { index: usize, len: usize },
}

/// Result type alias for Cite-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlReport, CrawlState};
pub use identity::generate_id;
pub use model::{CitationPayload, Work};
pub use registry::{Affiliations, Authors, Funders, Registry, Works};
pub use review::Review;
