/// Item classification for the incremental crawl
///
/// This module defines how a note is judged while an owner's listing is walked.
use std::collections::HashSet;
use std::fmt;

/// Classification of one note during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemVerdict {
    /// Not captured before and inside the cutoff window (or no cutoff)
    New,

    /// Already persisted in an earlier run; dropped before any detail fetch
    AlreadySeen,

    /// Uploaded before the cutoff; kept so it registers as seen, counts toward halting
    Stale,
}

impl ItemVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::AlreadySeen => "already_seen",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for ItemVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids already persisted for one owner
///
/// Loaded once before an owner's walk and only read during it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIdSet {
    ids: HashSet<String>,
}

impl KnownIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
