//! Note detail fetcher
//!
//! This module resolves one listing reference into a normalized record:
//! - One detail request per attempt through [`NoteSource::fetch_note`]
//! - Retry of the "acknowledged but empty" payload with a fixed pause
//! - Normalization of the raw payload into an [`ItemRecord`]

use crate::crawler::RetryPolicy;
use crate::item::{clean_text, ItemKind, ItemRecord, ItemReference};
use crate::provider::{NoteSource, ProviderError, RawNote};
use chrono::{Local, NaiveDateTime, TimeZone};
use thiserror::Error;
use tracing::warn;

/// Title stored for notes without one
pub const UNTITLED: &str = "untitled";

/// Geo label stored when the provider omits one
pub const UNKNOWN_GEO: &str = "unknown";

/// Why a note could not be fetched
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("note {id}: {source}")]
    Provider {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("note {id}: no payload after {attempts} attempts")]
    Exhausted { id: String, attempts: u32 },
}

/// Addresses used to build links in normalized records
#[derive(Debug, Clone)]
pub struct NormalizeSettings {
    /// Public web front-end base URL
    pub web_url: String,

    /// Prefix joined with a video's origin key
    pub video_cdn: String,
}

/// Fetches and normalizes note details
pub struct DetailFetcher<'a> {
    source: &'a dyn NoteSource,
    settings: &'a NormalizeSettings,
    retry: RetryPolicy,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(source: &'a dyn NoteSource, settings: &'a NormalizeSettings, retry: RetryPolicy) -> Self {
        Self {
            source,
            settings,
            retry,
        }
    }

    /// Fetches one note
    ///
    /// Transport, rejection and decode errors are returned immediately. An
    /// empty payload is retried up to the policy's attempt count.
    ///
    /// # Arguments
    ///
    /// * `reference` - The listing reference to resolve
    ///
    /// # Returns
    ///
    /// * `Ok(ItemRecord)` - The normalized record
    /// * `Err(FetchFailure)` - The note could not be fetched
    pub async fn fetch(&self, reference: &ItemReference) -> Result<ItemRecord, FetchFailure> {
        let mut attempt = 1;
        loop {
            match self.source.fetch_note(reference).await {
                Ok(raw) => return Ok(normalize_note(raw, reference, self.settings)),
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(FetchFailure::Exhausted {
                            id: reference.id.clone(),
                            attempts: attempt,
                        });
                    }
                    warn!(
                        "Empty payload for note {} (attempt {}/{}); retrying in {:?}",
                        reference.id, attempt, self.retry.max_attempts, self.retry.backoff
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchFailure::Provider {
                        id: reference.id.clone(),
                        source: e,
                    })
                }
            }
        }
    }
}

/// Turns a raw payload into a record
pub fn normalize_note(raw: RawNote, reference: &ItemReference, settings: &NormalizeSettings) -> ItemRecord {
    let card = raw.note_card;
    let web_url = settings.web_url.trim_end_matches('/');

    let id = if raw.id.is_empty() {
        reference.id.clone()
    } else {
        raw.id
    };

    let owner_id = if card.user.user_id.is_empty() {
        reference.owner_id.clone()
    } else {
        card.user.user_id
    };

    let kind = match card.note_type.as_deref() {
        Some("video") => ItemKind::Video,
        _ => ItemKind::Album,
    };

    let title = card
        .title
        .as_deref()
        .map(|t| clean_text(t.trim()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    // The second rendition is the full-size one when present.
    let images: Vec<String> = card
        .image_list
        .iter()
        .filter_map(|image| image.info_list.get(1).or_else(|| image.info_list.first()))
        .map(|info| info.url.clone())
        .filter(|url| !url.is_empty())
        .collect();

    let (image_urls, video_cover, video_url) = match kind {
        ItemKind::Album => (images, None, None),
        ItemKind::Video => {
            let video_url = card
                .video
                .and_then(|v| v.consumer.origin_video_key)
                .filter(|key| !key.is_empty())
                .map(|key| {
                    format!(
                        "{}/{}",
                        settings.video_cdn.trim_end_matches('/'),
                        key.trim_start_matches('/')
                    )
                });
            (Vec::new(), images.into_iter().next(), video_url)
        }
    };

    ItemRecord {
        url: format!("{}/explore/{}?xsec_token={}", web_url, id, reference.cursor_token),
        owner_home_url: format!("{}/user/profile/{}", web_url, owner_id),
        id,
        kind,
        owner_id,
        owner_name: card.user.nickname,
        owner_avatar: card.user.avatar,
        title,
        description: card.desc.as_deref().map(clean_text).unwrap_or_default(),
        liked_count: card.interact_info.liked_count,
        collected_count: card.interact_info.collected_count,
        comment_count: card.interact_info.comment_count,
        share_count: card.interact_info.share_count,
        video_cover,
        video_url,
        image_urls,
        tags: card
            .tag_list
            .into_iter()
            .filter_map(|tag| tag.name)
            .filter(|name| !name.is_empty())
            .collect(),
        upload_time: card.time.and_then(local_time_from_millis),
        geo_label: card
            .ip_location
            .filter(|loc| !loc.is_empty())
            .unwrap_or_else(|| UNKNOWN_GEO.to_string()),
    }
}

/// Converts provider epoch milliseconds to local time; zero means unknown
fn local_time_from_millis(millis: i64) -> Option<NaiveDateTime> {
    if millis <= 0 {
        return None;
    }
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.naive_local())
}
