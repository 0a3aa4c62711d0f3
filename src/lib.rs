//! Note-Harvester: an incremental note feed archiver
//!
//! This crate walks an owner's paginated note listing, fetches the details of
//! notes it has not captured yet, archives them (records, media, extracted
//! text) and builds a summarized digest of what was new in a run.

pub mod config;
pub mod crawler;
pub mod item;
pub mod output;
pub mod provider;
pub mod sink;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Note-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Owner list error: {0}")]
    Owner(#[from] OwnerError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Digest error: {0}")]
    Digest(#[from] output::DigestError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
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
}

/// Errors raised while reading the owner list
#[derive(Debug, Error)]
pub enum OwnerError {
    #[error("Failed to parse owner URL: {0}")]
    Parse(String),

    #[error("Owner URL has no profile id: {0}")]
    MissingId(String),

    #[error("Failed to read owner list: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Note-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for owner list operations
pub type OwnerResult<T> = std::result::Result<T, OwnerError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_harvest, CrawlResult, Harvester};
pub use item::{ItemKind, ItemRecord, ItemReference, OwnerRef};
pub use state::{CrawlCursorState, ItemVerdict, KnownIdSet};
