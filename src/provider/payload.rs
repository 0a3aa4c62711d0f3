//! Raw provider payloads
//!
//! These mirror the JSON the platform sends. Every field is optional or
//! defaulted; normalization into [`crate::item::ItemRecord`] happens in the
//! crawler's detail fetcher.

use serde::{Deserialize, Deserializer};

/// One note as returned by the detail endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNote {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub note_card: RawNoteCard,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNoteCard {
    /// `normal` for image notes, `video` for video notes
    #[serde(rename = "type", default)]
    pub note_type: Option<String>,

    #[serde(default)]
    pub user: RawUser,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub desc: Option<String>,

    #[serde(default)]
    pub interact_info: RawInteract,

    #[serde(default)]
    pub image_list: Vec<RawImage>,

    #[serde(default)]
    pub video: Option<RawVideo>,

    #[serde(default)]
    pub tag_list: Vec<RawTag>,

    /// Upload time in epoch milliseconds
    #[serde(default)]
    pub time: Option<i64>,

    #[serde(default)]
    pub ip_location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub nickname: String,

    #[serde(default)]
    pub avatar: String,
}

/// Engagement counters; the provider sends display strings ("1.2万") or numbers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInteract {
    #[serde(default, deserialize_with = "counter")]
    pub liked_count: String,

    #[serde(default, deserialize_with = "counter")]
    pub collected_count: String,

    #[serde(default, deserialize_with = "counter")]
    pub comment_count: String,

    #[serde(default, deserialize_with = "counter")]
    pub share_count: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub info_list: Vec<RawImageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageInfo {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideo {
    #[serde(default)]
    pub consumer: RawConsumer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConsumer {
    #[serde(default)]
    pub origin_video_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTag {
    #[serde(default)]
    pub name: Option<String>,
}

fn counter<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => "0".to_string(),
    })
}
