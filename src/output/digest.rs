//! Batch digest builder
//!
//! Collects a run's newly captured notes into one text block, stores it,
//! summarizes it and pushes the summary to subscribers.

use crate::item::ItemRecord;
use crate::output::{DigestError, DigestResult, Notifier, Summarizer};
use crate::sink::DETAIL_FILE;
use crate::storage::Storage;
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const SEPARATOR: &str = "==================================================";

/// Range bound format accepted by [`parse_range_bound`]
pub const RANGE_BOUND_FORMAT: &str = "%Y%m%d%H%M";

/// One note in a digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub record: ItemRecord,

    /// The note's directory (source of extracted text)
    pub local_path: PathBuf,
}

/// What a digest run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// No entries; nothing written, no collaborator called
    Skipped,

    Summarized {
        content_path: PathBuf,
        summary_path: PathBuf,

        /// Recipients the summary was pushed to (0 when none were configured)
        notified: usize,
    },
}

/// Concatenates a note directory's extracted text, sorted by file name
///
/// Every `*.txt` file except `detail.txt` is included.
pub fn collect_extracted_text(dir: &Path) -> String {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().map_or(false, |ext| ext == "txt")
                    && path.file_name().map_or(false, |name| name != DETAIL_FILE)
            })
            .collect(),
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            return String::new();
        }
    };
    files.sort();

    let mut text = String::new();
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&file) {
            Ok(contents) => {
                let _ = write!(text, "\n[Image text - {}]:\n{}", name, contents);
            }
            Err(e) => warn!("Cannot read {}: {}", file.display(), e),
        }
    }
    text
}

/// Renders the digest content for a list of entries
pub fn render_digest(entries: &[DigestEntry]) -> String {
    let mut content = String::new();
    for entry in entries {
        let record = &entry.record;
        let _ = write!(
            content,
            "\n{sep}\nNote ID: {id}\nKind: {kind}\nOwner: {owner}\nTitle: {title}\nDescription: {desc}\nTags: {tags}\nUpload time: {upload}\nExtracted text:\n{text}\n{sep}\n",
            sep = SEPARATOR,
            id = record.id,
            kind = record.kind,
            owner = record.owner_name,
            title = record.title,
            desc = record.description,
            tags = record.tags.join(", "),
            upload = record.upload_time_string(),
            text = collect_extracted_text(&entry.local_path),
        );
    }
    content
}

/// Parses a `YYYYMMDDHHMM` range bound
pub fn parse_range_bound(value: &str) -> DigestResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), RANGE_BOUND_FORMAT)
        .map_err(|e| DigestError::InvalidRange(format!("{}: {}", value, e)))
}

/// Rebuilds digest entries from the store for notes uploaded within `[start, end]`
///
/// Notes without a local directory are left out.
pub fn collect_range_entries(
    storage: &dyn Storage,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> DigestResult<Vec<DigestEntry>> {
    Ok(storage
        .items_uploaded_between(start, end)?
        .into_iter()
        .filter_map(|item| {
            item.local_path.map(|local_path| DigestEntry {
                record: item.record,
                local_path,
            })
        })
        .collect())
}

/// Writes, summarizes and pushes digests
pub struct DigestBuilder {
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
    output_dir: PathBuf,
}

impl DigestBuilder {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
        recipients: Vec<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            summarizer,
            notifier,
            recipients,
            output_dir: output_dir.into(),
        }
    }

    /// Builds one digest
    ///
    /// # Arguments
    ///
    /// * `label` - File name prefix (`{label}_content.txt`, `{label}_summary.txt`)
    /// * `entries` - The notes to include
    ///
    /// # Returns
    ///
    /// * `Ok(DigestOutcome::Skipped)` - No entries
    /// * `Ok(DigestOutcome::Summarized)` - Files written; summary pushed if there are recipients
    /// * `Err(DigestError)` - A file could not be written or the push failed
    pub async fn run(&self, label: &str, entries: &[DigestEntry]) -> DigestResult<DigestOutcome> {
        if entries.is_empty() {
            info!("No new notes for digest {}", label);
            return Ok(DigestOutcome::Skipped);
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let content_path = self.output_dir.join(format!("{}_content.txt", label));
        let summary_path = self.output_dir.join(format!("{}_summary.txt", label));

        let content = render_digest(entries);
        std::fs::write(&content_path, &content)?;
        info!(
            "Wrote digest content for {} notes to {}",
            entries.len(),
            content_path.display()
        );

        let summary = self.summarizer.summarize(&content).await;
        std::fs::write(&summary_path, &summary)?;
        info!("Wrote summary to {}", summary_path.display());

        let notified = if self.recipients.is_empty() {
            info!("No recipients configured, skipping notification");
            0
        } else {
            self.notifier
                .notify(&summary, &self.recipients)
                .await?
                .recipients
        };

        Ok(DigestOutcome::Summarized {
            content_path,
            summary_path,
            notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::record;
    use crate::output::Delivery;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSummarizer {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(&self, content: &str) -> String {
            self.inputs.lock().unwrap().push(content.to_string());
            "summary".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str, recipients: &[String]) -> DigestResult<Delivery> {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), recipients.to_vec()));
            Ok(Delivery {
                recipients: recipients.len(),
            })
        }
    }

    fn entry(dir: &Path, id: &str) -> DigestEntry {
        let local_path = dir.join(id);
        std::fs::create_dir_all(&local_path).unwrap();
        DigestEntry {
            record: record(id, Some("2024-01-12 08:00:00")),
            local_path,
        }
    }

    #[test]
    fn test_collect_extracted_text_skips_detail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_1.txt"), "second").unwrap();
        std::fs::write(dir.path().join("image_0.txt"), "first").unwrap();
        std::fs::write(dir.path().join(DETAIL_FILE), "metadata").unwrap();
        std::fs::write(dir.path().join("image_0.jpg"), "bytes").unwrap();

        let text = collect_extracted_text(dir.path());

        assert_eq!(
            text,
            "\n[Image text - image_0.txt]:\nfirst\n[Image text - image_1.txt]:\nsecond"
        );
    }

    #[test]
    fn test_render_digest_block() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry(dir.path(), "n1");
        std::fs::write(e.local_path.join("image_0.txt"), "on image").unwrap();

        let content = render_digest(&[e]);

        assert!(content.contains("Note ID: n1\n"));
        assert!(content.contains("Kind: album\n"));
        assert!(content.contains("Owner: Owner One\n"));
        assert!(content.contains("Tags: tag\n"));
        assert!(content.contains("Upload time: 2024-01-12 08:00:00\n"));
        assert!(content.contains("on image"));
        assert_eq!(content.matches(SEPARATOR).count(), 2);
    }

    #[tokio::test]
    async fn test_empty_digest_calls_nothing() {
        let out = tempfile::tempdir().unwrap();
        let summarizer = Arc::new(RecordingSummarizer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let builder = DigestBuilder::new(
            summarizer.clone(),
            notifier.clone(),
            vec!["UID_a".to_string()],
            out.path().join("digests"),
        );

        let outcome = builder.run("202401120800", &[]).await.unwrap();

        assert_eq!(outcome, DigestOutcome::Skipped);
        assert!(summarizer.inputs.lock().unwrap().is_empty());
        assert!(notifier.messages.lock().unwrap().is_empty());
        assert!(!out.path().join("digests").exists());
    }

    #[tokio::test]
    async fn test_digest_writes_files_and_notifies() {
        let notes = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let summarizer = Arc::new(RecordingSummarizer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let builder = DigestBuilder::new(
            summarizer.clone(),
            notifier.clone(),
            vec!["UID_a".to_string()],
            out.path(),
        );

        let entries = vec![entry(notes.path(), "n1"), entry(notes.path(), "n2")];
        let outcome = builder.run("202401120800", &entries).await.unwrap();

        let DigestOutcome::Summarized {
            content_path,
            summary_path,
            notified,
        } = outcome
        else {
            panic!("expected a summarized digest");
        };
        assert_eq!(notified, 1);
        assert_eq!(content_path, out.path().join("202401120800_content.txt"));
        assert_eq!(std::fs::read_to_string(summary_path).unwrap(), "summary");

        let content = std::fs::read_to_string(content_path).unwrap();
        assert_eq!(summarizer.inputs.lock().unwrap()[0], content);
        assert_eq!(
            notifier.messages.lock().unwrap()[0],
            ("summary".to_string(), vec!["UID_a".to_string()])
        );
    }

    #[tokio::test]
    async fn test_no_recipients_still_writes_summary() {
        let notes = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let builder = DigestBuilder::new(
            Arc::new(RecordingSummarizer::default()),
            notifier.clone(),
            vec![],
            out.path(),
        );

        let outcome = builder
            .run("label", &[entry(notes.path(), "n1")])
            .await
            .unwrap();

        assert!(matches!(outcome, DigestOutcome::Summarized { notified: 0, .. }));
        assert!(out.path().join("label_summary.txt").exists());
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_range_bound() {
        let at = parse_range_bound("202401100930").unwrap();
        assert_eq!(at.format("%Y-%m-%d %H:%M").to_string(), "2024-01-10 09:30");
        assert!(parse_range_bound("2024-01-10").is_err());
    }
}
