//! Persistence sink
//!
//! This module writes one owner's crawl result to disk and to the store:
//! - A directory per note with `info.json` and `detail.txt`
//! - Media files according to the configured policy
//! - Extracted on-image text
//! - The store rows, written after the directory pass with each note's path
//!
//! Nothing already on disk is rewritten, and a failed step never rolls back
//! files written before it.

mod layout;
mod media;
mod ocr;

pub use layout::{
    item_dir, item_dir_name, owner_dir_name, render_detail, write_metadata, DETAIL_FILE, INFO_FILE,
};
pub use media::{media_plan, MediaDownloader, MediaFile};
pub use ocr::{extract_note_dir, text_path, CommandExtractor, DisabledExtractor, TextExtractor};

use crate::config::MediaPolicy;
use crate::crawler::CrawlResult;
use crate::item::ItemRecord;
use crate::state::ItemVerdict;
use crate::storage::{Storage, StoredItem, WriteMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors raised while writing notes to disk
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Text extraction is not available")]
    OcrUnavailable,

    #[error("Text extraction failed: {0}")]
    Ocr(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// What happened to one kept note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedItem {
    pub item_id: String,
    pub verdict: ItemVerdict,

    /// The note's directory, when it was written
    pub local_path: Option<PathBuf>,
}

/// Writes crawl results to disk and the store
pub struct PersistenceSink {
    media_root: PathBuf,
    policy: MediaPolicy,
    downloader: MediaDownloader,
    extractor: Arc<dyn TextExtractor>,
}

impl PersistenceSink {
    pub fn new(
        media_root: impl Into<PathBuf>,
        policy: MediaPolicy,
        downloader: MediaDownloader,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            media_root: media_root.into(),
            policy,
            downloader,
            extractor,
        }
    }

    /// Persists one owner's kept notes
    ///
    /// # Arguments
    ///
    /// * `storage` - The note store
    /// * `result` - The owner's crawl result
    /// * `mode` - How the owner's rows are merged
    /// * `run_id` - The current run
    ///
    /// # Returns
    ///
    /// One entry per kept note, in crawl order
    pub async fn persist(
        &self,
        storage: &mut dyn Storage,
        result: &CrawlResult,
        mode: WriteMode,
        run_id: i64,
    ) -> Vec<PersistedItem> {
        let mut stored = Vec::with_capacity(result.kept_items.len());
        let mut persisted = Vec::with_capacity(result.kept_items.len());

        for kept in &result.kept_items {
            let local_path = if self.policy == MediaPolicy::None {
                None
            } else {
                match self.write_note(&kept.record).await {
                    Ok(dir) => Some(dir),
                    Err(e) => {
                        warn!("Failed to write note {}: {}", kept.record.id, e);
                        None
                    }
                }
            };

            persisted.push(PersistedItem {
                item_id: kept.record.id.clone(),
                verdict: kept.verdict,
                local_path: local_path.clone(),
            });
            stored.push(StoredItem {
                record: kept.record.clone(),
                local_path,
            });
        }

        if stored.is_empty() {
            debug!("Nothing to store for {}", result.owner_id);
            return persisted;
        }

        match storage.write_items(&result.owner_id, &stored, mode, run_id) {
            Ok(inserted) => info!(
                "Stored {} of {} notes for {}",
                inserted,
                stored.len(),
                result.owner_id
            ),
            Err(e) => error!("Failed to store notes for {}: {}", result.owner_id, e),
        }

        persisted
    }

    /// Writes a note's directory, media and extracted text
    async fn write_note(&self, record: &ItemRecord) -> SinkResult<PathBuf> {
        let dir = item_dir(&self.media_root, record);
        std::fs::create_dir_all(&dir)?;
        write_metadata(&dir, record)?;

        for file in media_plan(record, self.policy) {
            let dest = dir.join(&file.file_name);
            if let Err(e) = self.downloader.download(&file.url, &dest).await {
                warn!("Failed to download {} for {}: {}", file.file_name, record.id, e);
            }
        }

        self.extract_text(&dir).await;

        Ok(dir)
    }

    async fn extract_text(&self, dir: &Path) {
        match extract_note_dir(self.extractor.as_ref(), dir).await {
            Ok(0) => {}
            Ok(n) => debug!("Extracted text from {} images in {}", n, dir.display()),
            Err(e) => warn!("Text extraction failed in {}: {}", dir.display(), e),
        }
    }
}
