//! Crawler coordinator - harvest orchestration logic
//!
//! This module contains the per-owner crawl loop and the run driver that
//! coordinates all owners of a run, including:
//! - Walking listing pages under the configured stop policy
//! - Screening known ids before any detail fetch
//! - Classifying fetched notes and halting on staleness or the item cap
//! - Persisting each owner's result and building the run digest

use crate::config::{resolve_cutoff, Config, CrawlMode};
use crate::crawler::{
    DetailFetcher, ListingWalker, NormalizeSettings, PageOutcome, RetryPolicy, StalenessFilter,
};
use crate::item::{read_owner_list, ItemRecord, OwnerRef};
use crate::output::{DigestBuilder, DigestEntry, DigestOutcome};
use crate::provider::NoteSource;
use crate::sink::{MediaDownloader, PersistenceSink, TextExtractor};
use crate::state::{CrawlCursorState, ItemVerdict, KnownIdSet};
use crate::storage::{SqliteStorage, Storage, WriteMode};
use crate::HarvestError;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why an owner's walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The listing has no further pages
    Exhausted,
    /// Too many consecutive notes older than the cutoff
    Stale,
    /// The kept-item cap was reached
    Cap,
    /// First-page mode processed its single page
    FirstPage,
    /// A listing page failed
    PageFailed,
}

/// Overall outcome of an owner's walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Success,
    Failed,
}

/// A fetched note retained by the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptItem {
    pub record: ItemRecord,

    /// `New` or `Stale`
    pub verdict: ItemVerdict,
}

/// Result of crawling one owner
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub owner_id: String,

    /// Kept notes in listing order
    pub kept_items: Vec<KeptItem>,

    pub status: CrawlStatus,

    /// Failure description, empty on success
    pub message: String,

    pub halt: HaltReason,
}

impl CrawlResult {
    pub fn new_count(&self) -> usize {
        self.count(ItemVerdict::New)
    }

    pub fn stale_count(&self) -> usize {
        self.count(ItemVerdict::Stale)
    }

    fn count(&self, verdict: ItemVerdict) -> usize {
        self.kept_items
            .iter()
            .filter(|k| k.verdict == verdict)
            .count()
    }
}

/// Tunables of a walk, resolved once per run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub mode: CrawlMode,
    pub cutoff: Option<NaiveDateTime>,
    pub stale_tolerance: u32,
    pub max_items: Option<usize>,
    pub item_delay: Duration,
    pub retry: RetryPolicy,
    pub normalize: NormalizeSettings,
}

impl CrawlSettings {
    /// Builds the settings from the configuration, resolving the cutoff against `now`
    pub fn from_config(config: &Config, now: NaiveDateTime) -> Self {
        Self {
            mode: config.crawler.mode,
            cutoff: resolve_cutoff(&config.crawler.interval, now),
            stale_tolerance: config.crawler.stale_tolerance,
            max_items: config.crawler.max_items,
            item_delay: Duration::from_secs(config.crawler.item_delay_secs),
            retry: RetryPolicy {
                max_attempts: config.crawler.max_retries.max(1),
                backoff: Duration::from_secs(config.crawler.retry_backoff_secs),
            },
            normalize: NormalizeSettings {
                web_url: config.provider.web_url.clone(),
                video_cdn: config.provider.video_cdn.clone(),
            },
        }
    }
}

/// Drives the walker, fetcher and filter over one owner at a time
pub struct Harvester {
    source: Arc<dyn NoteSource>,
    settings: CrawlSettings,
}

impl Harvester {
    pub fn new(source: Arc<dyn NoteSource>, settings: CrawlSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawls one owner
    ///
    /// # Arguments
    ///
    /// * `owner` - The owner to walk
    /// * `known` - Ids already stored for the owner (empty outside update mode)
    ///
    /// # Returns
    ///
    /// The kept notes and why the walk ended. Item failures are skipped; a page
    /// failure ends the walk with `CrawlStatus::Failed` and keeps what was
    /// collected so far.
    pub async fn crawl_owner(&self, owner: &OwnerRef, known: &KnownIdSet) -> CrawlResult {
        let settings = &self.settings;
        let mut state = CrawlCursorState::new();
        let mut walker = ListingWalker::new(self.source.as_ref(), owner, settings.retry);
        let fetcher = DetailFetcher::new(self.source.as_ref(), &settings.normalize, settings.retry);
        let filter = StalenessFilter::new(settings.cutoff, settings.stale_tolerance);

        let mut seen: HashSet<String> = HashSet::new();
        let mut kept: Vec<KeptItem> = Vec::new();
        let mut status = CrawlStatus::Success;
        let mut message = String::new();
        let mut fetched_any = false;

        info!(
            "Crawling {} ({} known, cutoff {:?})",
            owner.owner_id,
            known.len(),
            filter.cutoff()
        );

        let halt = 'walk: loop {
            let references = match walker.next_page(&mut state).await {
                None => break HaltReason::Exhausted,
                Some(PageOutcome::Failed(reason)) => {
                    status = CrawlStatus::Failed;
                    message = reason;
                    break HaltReason::PageFailed;
                }
                Some(PageOutcome::Page(references)) => references,
            };

            for reference in references {
                if !seen.insert(reference.id.clone()) {
                    debug!("Note {} repeated within the walk, ignoring", reference.id);
                    continue;
                }
                if filter.screen(known, &reference.id) == ItemVerdict::AlreadySeen {
                    debug!("Note {} already captured", reference.id);
                    continue;
                }

                if fetched_any && !settings.item_delay.is_zero() {
                    tokio::time::sleep(settings.item_delay).await;
                }
                fetched_any = true;

                let record = match fetcher.fetch(&reference).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Skipping {}", e);
                        continue;
                    }
                };

                let decision = filter.classify(&record, &mut state);
                debug!("Note {} is {}", record.id, decision.verdict);
                kept.push(KeptItem {
                    record,
                    verdict: decision.verdict,
                });

                if decision.halt {
                    info!(
                        "Halting {} after {} consecutive stale notes",
                        owner.owner_id, state.consecutive_stale_count
                    );
                    break 'walk HaltReason::Stale;
                }
                if settings.max_items.map_or(false, |max| kept.len() >= max) {
                    info!("Halting {} at the cap of {} notes", owner.owner_id, kept.len());
                    break 'walk HaltReason::Cap;
                }
            }

            if settings.mode == CrawlMode::FirstPage {
                break HaltReason::FirstPage;
            }
        };

        let result = CrawlResult {
            owner_id: owner.owner_id.clone(),
            kept_items: kept,
            status,
            message,
            halt,
        };

        match result.status {
            CrawlStatus::Success => info!(
                "Finished {}: {} new, {} stale ({:?})",
                owner.owner_id,
                result.new_count(),
                result.stale_count(),
                result.halt
            ),
            CrawlStatus::Failed => error!(
                "Crawl of {} failed after {} notes: {}",
                owner.owner_id,
                result.kept_items.len(),
                result.message
            ),
        }

        result
    }
}

/// Long-lived collaborators of a run, built once by the caller
pub struct Collaborators {
    pub source: Arc<dyn NoteSource>,
    pub downloader: MediaDownloader,
    pub extractor: Arc<dyn TextExtractor>,

    /// Present when the run should end with a digest
    pub digest: Option<DigestBuilder>,
}

/// Per-owner line of a run report
#[derive(Debug, Clone)]
pub struct OwnerReport {
    pub owner_id: String,
    pub status: CrawlStatus,
    pub halt: HaltReason,
    pub new_items: usize,
    pub stale_items: usize,
    pub message: String,
}

/// Summary of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub owners: Vec<OwnerReport>,
    pub total_new: usize,
    pub digest: Option<DigestOutcome>,
}

/// Runs a complete harvest
///
/// This function orchestrates the entire run:
///
/// 1. Open the store and start a run record
/// 2. Read the owner list
/// 3. For each owner: load known ids (update mode), crawl, persist
/// 4. Complete the run record
/// 5. Build the digest of the run's new notes, when enabled
///
/// One owner failing never stops the others.
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash recorded with the run
/// * `collaborators` - Source, media, OCR and digest handles
///
/// # Returns
///
/// * `Ok(RunReport)` - The run finished (individual owners may have failed)
/// * `Err(HarvestError)` - The store or the owner list could not be opened
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    collaborators: Collaborators,
) -> Result<RunReport, HarvestError> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(config_hash)?;

    let owners = match read_owner_list(Path::new(&config.input.owners_file)) {
        Ok(owners) => owners,
        Err(e) => {
            storage.fail_run(run_id)?;
            return Err(e.into());
        }
    };

    let started = Local::now().naive_local();
    let harvester = Harvester::new(
        collaborators.source,
        CrawlSettings::from_config(config, started),
    );
    let sink = PersistenceSink::new(
        &config.output.media_root,
        config.output.media,
        collaborators.downloader,
        collaborators.extractor,
    );
    let mode = if config.crawler.update {
        WriteMode::Append
    } else {
        WriteMode::Create
    };

    info!(
        "Run {}: {} owners, mode {:?}, {:?}",
        run_id,
        owners.len(),
        harvester.settings().mode,
        mode
    );

    let mut reports = Vec::with_capacity(owners.len());
    let mut entries = Vec::new();

    for owner in &owners {
        let known = if config.crawler.update {
            storage.load_known_ids(&owner.owner_id).unwrap_or_else(|e| {
                error!("Failed to load known ids for {}: {}", owner.owner_id, e);
                KnownIdSet::new()
            })
        } else {
            KnownIdSet::new()
        };

        let result = harvester.crawl_owner(owner, &known).await;
        let persisted = sink.persist(&mut storage, &result, mode, run_id).await;

        entries.extend(
            result
                .kept_items
                .iter()
                .zip(&persisted)
                .filter(|(kept, _)| kept.verdict == ItemVerdict::New)
                .filter_map(|(kept, item)| {
                    item.local_path.as_ref().map(|path| DigestEntry {
                        record: kept.record.clone(),
                        local_path: path.clone(),
                    })
                }),
        );

        reports.push(OwnerReport {
            owner_id: owner.owner_id.clone(),
            status: result.status,
            halt: result.halt,
            new_items: result.new_count(),
            stale_items: result.stale_count(),
            message: result.message.clone(),
        });
    }

    let total_new: usize = reports.iter().map(|r| r.new_items).sum();
    storage.complete_run(run_id, reports.len() as u32, total_new as u32)?;
    info!("Run {} completed: {} new notes", run_id, total_new);

    let digest = match &collaborators.digest {
        Some(builder) => {
            let label = started.format("%Y%m%d%H%M").to_string();
            match builder.run(&label, &entries).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("Digest failed: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    Ok(RunReport {
        run_id,
        owners: reports,
        total_new,
        digest,
    })
}
