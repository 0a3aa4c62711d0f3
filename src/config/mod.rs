//! Configuration module for Note-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and turning the crawler's interval expression into a concrete cutoff.
//!
//! # Example
//!
//! ```no_run
//! use note_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Stale tolerance: {}", config.crawler.stale_tolerance);
//! ```

mod cutoff;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlMode, CrawlerConfig, DigestConfig, InputConfig, MediaPolicy, NotifierConfig,
    OcrConfig, OutputConfig, ProviderConfig, SummarizerConfig,
};

pub use cutoff::{parse_cutoff, resolve_cutoff, Cutoff};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
