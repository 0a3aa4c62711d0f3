//! State module for tracking crawl progress
//!
//! This module provides the per-walk and per-item state used by the crawler.
//!
//! # Components
//!
//! - `ItemVerdict`: how one note was classified (new, already seen, stale)
//! - `KnownIdSet`: ids already persisted for an owner, loaded once per walk
//! - `CrawlCursorState`: pagination cursor and stale counter of one walk

mod cursor;
mod verdict;

// Re-export main types
pub use cursor::CrawlCursorState;
pub use verdict::{ItemVerdict, KnownIdSet};
