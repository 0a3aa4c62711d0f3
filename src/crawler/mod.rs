//! Crawler module for incremental listing walks
//!
//! This module contains the core crawl-and-dedupe logic, including:
//! - Walking an owner's cursor-paginated listing with throttling retries
//! - Fetching and normalizing note details
//! - Dedup and staleness classification
//! - Per-owner orchestration and the multi-owner run driver

mod coordinator;
mod fetcher;
mod filter;
mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{
    run_harvest, Collaborators, CrawlResult, CrawlSettings, CrawlStatus, HaltReason, Harvester,
    KeptItem, OwnerReport, RunReport,
};
pub use fetcher::{
    normalize_note, DetailFetcher, FetchFailure, NormalizeSettings, UNKNOWN_GEO, UNTITLED,
};
pub use filter::{FilterDecision, StalenessFilter};
pub use walker::{ListingWalker, PageOutcome};

use std::time::Duration;

/// Attempt budget shared by throttled listings and empty payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(180),
        }
    }
}
