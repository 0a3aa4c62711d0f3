//! Owner list parsing

use crate::{OwnerError, OwnerResult};
use std::path::Path;
use url::Url;

const DEFAULT_XSEC_SOURCE: &str = "pc_search";

/// An account whose note listing is crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub owner_id: String,

    /// Access token carried by the profile URL (may be empty)
    pub xsec_token: String,

    /// Where the profile link came from; the API expects it echoed back
    pub xsec_source: String,
}

impl OwnerRef {
    /// Creates an owner reference from a bare id
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            xsec_token: String::new(),
            xsec_source: DEFAULT_XSEC_SOURCE.to_string(),
        }
    }

    /// Parses one owner list entry
    ///
    /// Accepts a profile URL such as
    /// `https://www.example.com/user/profile/5f1e?xsec_token=abc&xsec_source=pc_note`
    /// or a bare owner id.
    pub fn parse(entry: &str) -> OwnerResult<Self> {
        let entry = entry.trim();

        if !entry.contains("://") {
            if entry.is_empty() || !entry.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(OwnerError::Parse(entry.to_string()));
            }
            return Ok(Self::new(entry));
        }

        let url = Url::parse(entry).map_err(|e| OwnerError::Parse(format!("{}: {}", entry, e)))?;

        let owner_id = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| s.to_string())
            .ok_or_else(|| OwnerError::MissingId(entry.to_string()))?;

        let mut owner = Self::new(owner_id);
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xsec_token" => owner.xsec_token = value.into_owned(),
                "xsec_source" if !value.is_empty() => owner.xsec_source = value.into_owned(),
                _ => {}
            }
        }

        Ok(owner)
    }
}

/// Reads the owner list file
///
/// Blank lines and `#` comments are skipped; malformed entries are logged and
/// skipped so one bad line does not stop the run.
pub fn read_owner_list(path: &Path) -> OwnerResult<Vec<OwnerRef>> {
    let content = std::fs::read_to_string(path)?;

    let mut owners = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match OwnerRef::parse(line) {
            Ok(owner) => owners.push(owner),
            Err(e) => tracing::warn!("Skipping owner list line {}: {}", line_no + 1, e),
        }
    }

    Ok(owners)
}
