//! On-disk layout of captured notes
//!
//! ```text
//! {media_root}/{owner_name[..20]}_{owner_id}/{YYYYMMDD_}{title[..40]}_{note_id}/
//!     info.json
//!     detail.txt
//!     image_0.jpg ...      (albums)
//!     cover.jpg video.mp4  (videos)
//!     <image>.txt          (extracted text)
//! ```

use crate::crawler::UNTITLED;
use crate::item::{normalize_name, ItemRecord, RECORD_FIELDS};
use crate::sink::SinkResult;
use std::path::{Path, PathBuf};

pub const INFO_FILE: &str = "info.json";
pub const DETAIL_FILE: &str = "detail.txt";

const OWNER_NAME_CHARS: usize = 20;
const TITLE_CHARS: usize = 40;

/// Directory name of an owner
pub fn owner_dir_name(record: &ItemRecord) -> String {
    format!(
        "{}_{}",
        normalize_name(&record.owner_name, OWNER_NAME_CHARS),
        record.owner_id
    )
}

/// Directory name of a note, prefixed with its upload date when known
pub fn item_dir_name(record: &ItemRecord) -> String {
    let date = record
        .upload_time
        .map(|t| t.format("%Y%m%d_").to_string())
        .unwrap_or_default();

    let mut title = normalize_name(&record.title, TITLE_CHARS);
    if title.is_empty() {
        title = UNTITLED.to_string();
    }

    format!("{}{}_{}", date, title, record.id)
}

/// Full directory of a note under `media_root`
pub fn item_dir(media_root: &Path, record: &ItemRecord) -> PathBuf {
    media_root
        .join(owner_dir_name(record))
        .join(item_dir_name(record))
}

/// Renders `detail.txt`: one `label: value` line per record field
pub fn render_detail(record: &ItemRecord) -> String {
    RECORD_FIELDS
        .iter()
        .map(|field| format!("{}: {}\n", field.label(), record.field_value(*field)))
        .collect()
}

/// Writes `info.json` and `detail.txt` unless they already exist
pub fn write_metadata(dir: &Path, record: &ItemRecord) -> SinkResult<()> {
    let info = dir.join(INFO_FILE);
    if !info.exists() {
        std::fs::write(&info, serde_json::to_string_pretty(record)?)?;
    }

    let detail = dir.join(DETAIL_FILE);
    if !detail.exists() {
        std::fs::write(&detail, render_detail(record))?;
    }

    Ok(())
}
