//! Output module for digests, exports and reports
//!
//! This module handles:
//! - Building the digest of a run's new notes
//! - Summarizing digests and pushing them to subscribers
//! - Exporting stored records to CSV
//! - Printing store statistics

mod digest;
mod export;
mod notifier;
pub mod stats;
mod summarizer;
mod traits;

pub use digest::{
    collect_extracted_text, collect_range_entries, parse_range_bound, render_digest,
    DigestBuilder, DigestEntry, DigestOutcome, RANGE_BOUND_FORMAT,
};
pub use export::export_csv;
pub use notifier::{read_recipients, WebhookNotifier};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use summarizer::ChatSummarizer;
pub use traits::{Delivery, DigestError, DigestResult, Notifier, Summarizer};
