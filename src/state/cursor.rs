/// Transient state of one owner's walk
///
/// Created when an owner's walk starts and dropped when it ends. A new run
/// always starts from the empty cursor; the known-id set and the cutoff keep it
/// from redoing work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlCursorState {
    /// Cursor for the next listing page (empty for the first page)
    pub cursor_token: String,

    /// Stale notes seen in a row since the last fresh one
    pub consecutive_stale_count: u32,

    /// Listing pages delivered so far
    pub pages_fetched: u32,
}

impl CrawlCursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first page has been requested
    pub fn is_first_page(&self) -> bool {
        self.cursor_token.is_empty() && self.pages_fetched == 0
    }
}
