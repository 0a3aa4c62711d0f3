//! Item model
//!
//! Owners, the lightweight references a listing hands out, and the full
//! records captured for each note.

mod owner;
mod schema;
mod text;

pub use owner::{read_owner_list, OwnerRef};
pub use schema::{RecordField, RECORD_FIELDS};
pub use text::{clean_text, normalize_name};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display format of upload times in records, files and the store
pub const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of note content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Image gallery (the default)
    Album,
    /// Video note with a cover image
    Video,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Video => "video",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "album" => Some(Self::Album),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight handle returned by a listing page
///
/// Only lives for the duration of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReference {
    /// Note id
    pub id: String,

    /// Per-note access token required by the detail endpoint
    pub cursor_token: String,

    /// Owner the listing belongs to
    pub owner_id: String,
}

/// A fully captured note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub url: String,
    pub kind: ItemKind,
    pub owner_id: String,
    pub owner_home_url: String,
    pub owner_name: String,
    pub owner_avatar: String,
    pub title: String,
    pub description: String,
    pub liked_count: String,
    pub collected_count: String,
    pub comment_count: String,
    pub share_count: String,
    pub video_cover: Option<String>,
    pub video_url: Option<String>,
    pub image_urls: Vec<String>,
    pub tags: Vec<String>,
    #[serde(with = "upload_time_format")]
    pub upload_time: Option<NaiveDateTime>,
    pub geo_label: String,
}

impl ItemRecord {
    /// Upload time rendered with [`UPLOAD_TIME_FORMAT`], empty when unknown
    pub fn upload_time_string(&self) -> String {
        self.upload_time
            .map(|t| t.format(UPLOAD_TIME_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// Parses a stored upload time
pub fn parse_upload_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), UPLOAD_TIME_FORMAT).ok()
}

mod upload_time_format {
    use super::{parse_upload_time, UPLOAD_TIME_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(UPLOAD_TIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_upload_time))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Builds a record with the given id and upload time, other fields filled in
    pub fn record(id: &str, upload: Option<&str>) -> ItemRecord {
        ItemRecord {
            id: id.to_string(),
            url: format!("https://www.example.com/explore/{}", id),
            kind: ItemKind::Album,
            owner_id: "owner1".to_string(),
            owner_home_url: "https://www.example.com/user/profile/owner1".to_string(),
            owner_name: "Owner One".to_string(),
            owner_avatar: String::new(),
            title: format!("Title {}", id),
            description: "description".to_string(),
            liked_count: "1".to_string(),
            collected_count: "2".to_string(),
            comment_count: "3".to_string(),
            share_count: "4".to_string(),
            video_cover: None,
            video_url: None,
            image_urls: vec![],
            tags: vec!["tag".to_string()],
            upload_time: upload.and_then(parse_upload_time),
            geo_label: "unknown".to_string(),
        }
    }
}
