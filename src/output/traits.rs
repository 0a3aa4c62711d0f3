//! Digest collaborator traits and error types
//!
//! The digest builder reaches its two external services through
//! [`Summarizer`] and [`Notifier`], both built once per process and shared.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Invalid range bound: {0}")]
    InvalidRange(String),
}

/// Result type for output operations
pub type DigestResult<T> = Result<T, DigestError>;

/// Turns a digest's content into a short summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes `content`
    ///
    /// Never fails: a failure is reported as an `Error: ...` string that is
    /// stored in place of the summary.
    async fn summarize(&self, content: &str) -> String;
}

/// Result of a notification push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: usize,
}

/// Pushes a message to subscribers
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str, recipients: &[String]) -> DigestResult<Delivery>;
}
