//! Provider traits and error types
//!
//! The crawler only sees the platform through [`NoteSource`]: one call per
//! listing page and one call per note detail.

use crate::item::{ItemReference, OwnerRef};
use crate::provider::RawNote;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The request never produced a usable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with `success = false`
    #[error("Provider rejected request: {0}")]
    Rejected(String),

    /// The provider acknowledged the request but returned no note body
    #[error("Provider returned an empty payload")]
    EmptyPayload,

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be signed
    #[error("Failed to sign request: {0}")]
    Sign(String),
}

impl ProviderError {
    /// Returns true for the transient "acknowledged but empty" condition
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmptyPayload)
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// One page of an owner's listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// References in the provider's listing order
    pub items: Vec<ItemReference>,

    /// Cursor for the following page, if the provider sent one
    pub next_cursor: Option<String>,

    /// Provider's own "more pages available" flag
    pub has_more: bool,
}

/// Access to an owner's note listing and to note details
///
/// Implementations perform exactly one round trip per call and never retry;
/// retry policy belongs to the crawler.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Fetches one listing page starting at `cursor` (empty for the first page)
    async fn list_notes(&self, owner: &OwnerRef, cursor: &str) -> ProviderResult<ListingPage>;

    /// Fetches the full payload of one note
    ///
    /// Returns [`ProviderError::EmptyPayload`] when the provider reports success
    /// without a note body.
    async fn fetch_note(&self, reference: &ItemReference) -> ProviderResult<RawNote>;
}
