//! Scripted note source for unit tests

use crate::crawler::NormalizeSettings;
use crate::item::{ItemReference, OwnerRef};
use crate::provider::{
    ListingPage, NoteSource, ProviderError, ProviderResult, RawNote, RawNoteCard, RawTag, RawUser,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub fn reference(id: &str) -> ItemReference {
    ItemReference {
        id: id.to_string(),
        cursor_token: format!("tok-{}", id),
        owner_id: "owner1".to_string(),
    }
}

pub fn settings() -> NormalizeSettings {
    NormalizeSettings {
        web_url: "https://www.example.com".to_string(),
        video_cdn: "https://video.example.com/".to_string(),
    }
}

pub fn raw_note(id: &str, upload_millis: Option<i64>) -> RawNote {
    RawNote {
        id: id.to_string(),
        note_card: RawNoteCard {
            note_type: Some("normal".to_string()),
            user: RawUser {
                user_id: "owner1".to_string(),
                nickname: "Owner One".to_string(),
                avatar: String::new(),
            },
            title: Some(format!("Title {}", id)),
            desc: Some("description".to_string()),
            tag_list: vec![RawTag {
                name: Some("tag".to_string()),
            }],
            time: upload_millis,
            ..RawNoteCard::default()
        },
    }
}

/// Replays canned responses keyed by cursor (listings) or note id (details)
///
/// Each key holds a queue; the last response of a queue repeats forever.
/// Unscripted notes answer with [`ProviderError::EmptyPayload`].
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<String, VecDeque<ProviderResult<ListingPage>>>>,
    notes: Mutex<HashMap<String, VecDeque<ProviderResult<RawNote>>>>,
    listing_calls: Mutex<u32>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, cursor: &str, page: ListingPage) -> Self {
        push(&self.pages, cursor, Ok(page));
        self
    }

    pub fn with_listing_error(self, cursor: &str) -> Self {
        push(
            &self.pages,
            cursor,
            Err(ProviderError::Rejected("listing refused".to_string())),
        );
        self
    }

    pub fn with_note(self, note: RawNote) -> Self {
        let id = note.id.clone();
        push(&self.notes, &id, Ok(note));
        self
    }

    pub fn with_note_error(self, id: &str, error: ProviderError) -> Self {
        push(&self.notes, id, Err(error));
        self
    }

    pub fn listing_calls(&self) -> u32 {
        *self.listing_calls.lock().unwrap()
    }

    pub fn fetch_calls(&self, id: &str) -> usize {
        self.fetched.lock().unwrap().iter().filter(|f| *f == id).count()
    }

    /// Note ids in the order their details were requested
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

fn push<T>(map: &Mutex<HashMap<String, VecDeque<T>>>, key: &str, value: T) {
    map.lock()
        .unwrap()
        .entry(key.to_string())
        .or_default()
        .push_back(value);
}

fn next<T: Clone>(map: &Mutex<HashMap<String, VecDeque<T>>>, key: &str) -> Option<T> {
    let mut map = map.lock().unwrap();
    let queue = map.get_mut(key)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl NoteSource for ScriptedSource {
    async fn list_notes(&self, _owner: &OwnerRef, cursor: &str) -> ProviderResult<ListingPage> {
        *self.listing_calls.lock().unwrap() += 1;
        next(&self.pages, cursor).unwrap_or_else(|| Ok(ListingPage::default()))
    }

    async fn fetch_note(&self, reference: &ItemReference) -> ProviderResult<RawNote> {
        self.fetched.lock().unwrap().push(reference.id.clone());
        next(&self.notes, &reference.id).unwrap_or(Err(ProviderError::EmptyPayload))
    }
}
