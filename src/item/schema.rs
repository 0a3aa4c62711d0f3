//! Ordered field schema shared by the store, `detail.txt` and CSV export
//!
//! Every writer iterates [`RECORD_FIELDS`] and asks the record for each value by
//! field, so column order lives in exactly one place.

use crate::item::{parse_upload_time, ItemKind, ItemRecord};

/// One exported field of an [`ItemRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Id,
    Url,
    Kind,
    OwnerId,
    OwnerHomeUrl,
    OwnerName,
    OwnerAvatar,
    Title,
    Description,
    LikedCount,
    CollectedCount,
    CommentCount,
    ShareCount,
    VideoCover,
    VideoUrl,
    ImageUrls,
    Tags,
    UploadTime,
    GeoLabel,
}

/// Export order of record fields
pub const RECORD_FIELDS: [RecordField; 19] = [
    RecordField::Id,
    RecordField::Url,
    RecordField::Kind,
    RecordField::OwnerId,
    RecordField::OwnerHomeUrl,
    RecordField::OwnerName,
    RecordField::OwnerAvatar,
    RecordField::Title,
    RecordField::Description,
    RecordField::LikedCount,
    RecordField::CollectedCount,
    RecordField::CommentCount,
    RecordField::ShareCount,
    RecordField::VideoCover,
    RecordField::VideoUrl,
    RecordField::ImageUrls,
    RecordField::Tags,
    RecordField::UploadTime,
    RecordField::GeoLabel,
];

impl RecordField {
    /// Column name in the `items` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "item_id",
            Self::Url => "url",
            Self::Kind => "kind",
            Self::OwnerId => "owner_id",
            Self::OwnerHomeUrl => "owner_home_url",
            Self::OwnerName => "owner_name",
            Self::OwnerAvatar => "owner_avatar",
            Self::Title => "title",
            Self::Description => "description",
            Self::LikedCount => "liked_count",
            Self::CollectedCount => "collected_count",
            Self::CommentCount => "comment_count",
            Self::ShareCount => "share_count",
            Self::VideoCover => "video_cover",
            Self::VideoUrl => "video_url",
            Self::ImageUrls => "image_urls",
            Self::Tags => "tags",
            Self::UploadTime => "upload_time",
            Self::GeoLabel => "geo_label",
        }
    }

    /// Human-readable label used in `detail.txt` and CSV headers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Id => "Note ID",
            Self::Url => "Note URL",
            Self::Kind => "Kind",
            Self::OwnerId => "Owner ID",
            Self::OwnerHomeUrl => "Owner profile URL",
            Self::OwnerName => "Owner name",
            Self::OwnerAvatar => "Owner avatar URL",
            Self::Title => "Title",
            Self::Description => "Description",
            Self::LikedCount => "Likes",
            Self::CollectedCount => "Collects",
            Self::CommentCount => "Comments",
            Self::ShareCount => "Shares",
            Self::VideoCover => "Video cover URL",
            Self::VideoUrl => "Video URL",
            Self::ImageUrls => "Image URLs",
            Self::Tags => "Tags",
            Self::UploadTime => "Upload time",
            Self::GeoLabel => "IP location",
        }
    }
}

impl ItemRecord {
    /// Textual value of one field; lists are JSON arrays, missing values empty
    pub fn field_value(&self, field: RecordField) -> String {
        match field {
            RecordField::Id => self.id.clone(),
            RecordField::Url => self.url.clone(),
            RecordField::Kind => self.kind.as_str().to_string(),
            RecordField::OwnerId => self.owner_id.clone(),
            RecordField::OwnerHomeUrl => self.owner_home_url.clone(),
            RecordField::OwnerName => self.owner_name.clone(),
            RecordField::OwnerAvatar => self.owner_avatar.clone(),
            RecordField::Title => self.title.clone(),
            RecordField::Description => self.description.clone(),
            RecordField::LikedCount => self.liked_count.clone(),
            RecordField::CollectedCount => self.collected_count.clone(),
            RecordField::CommentCount => self.comment_count.clone(),
            RecordField::ShareCount => self.share_count.clone(),
            RecordField::VideoCover => self.video_cover.clone().unwrap_or_default(),
            RecordField::VideoUrl => self.video_url.clone().unwrap_or_default(),
            RecordField::ImageUrls => encode_list(&self.image_urls),
            RecordField::Tags => encode_list(&self.tags),
            RecordField::UploadTime => self.upload_time_string(),
            RecordField::GeoLabel => self.geo_label.clone(),
        }
    }

    /// Rebuilds a record from field values produced by [`ItemRecord::field_value`]
    ///
    /// `lookup` returns the stored text for a field (or `None` when absent).
    pub fn from_fields<F>(mut lookup: F) -> Option<Self>
    where
        F: FnMut(RecordField) -> Option<String>,
    {
        let mut text = |field| lookup(field).unwrap_or_default();
        let optional = |value: String| if value.is_empty() { None } else { Some(value) };

        let id = text(RecordField::Id);
        if id.is_empty() {
            return None;
        }

        Some(Self {
            id,
            url: text(RecordField::Url),
            kind: ItemKind::from_db_string(&text(RecordField::Kind)).unwrap_or(ItemKind::Album),
            owner_id: text(RecordField::OwnerId),
            owner_home_url: text(RecordField::OwnerHomeUrl),
            owner_name: text(RecordField::OwnerName),
            owner_avatar: text(RecordField::OwnerAvatar),
            title: text(RecordField::Title),
            description: text(RecordField::Description),
            liked_count: text(RecordField::LikedCount),
            collected_count: text(RecordField::CollectedCount),
            comment_count: text(RecordField::CommentCount),
            share_count: text(RecordField::ShareCount),
            video_cover: optional(text(RecordField::VideoCover)),
            video_url: optional(text(RecordField::VideoUrl)),
            image_urls: decode_list(&text(RecordField::ImageUrls)),
            tags: decode_list(&text(RecordField::Tags)),
            upload_time: parse_upload_time(&text(RecordField::UploadTime)),
            geo_label: text(RecordField::GeoLabel),
        })
    }
}

fn encode_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(value).unwrap_or_default()
}
