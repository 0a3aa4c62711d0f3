//! Listing walker
//!
//! Walks one owner's cursor-paginated listing, one page per call. The walker
//! owns the throttling heuristic: a first page that comes back empty is most
//! likely a rate limit, so it is requested again after a fixed pause.

use crate::crawler::RetryPolicy;
use crate::item::{ItemReference, OwnerRef};
use crate::provider::NoteSource;
use crate::state::CrawlCursorState;
use tracing::{debug, warn};

/// What one walker step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// References in listing order (possibly empty)
    Page(Vec<ItemReference>),

    /// The provider reported a failure; the walk is over
    Failed(String),
}

/// Lazy iterator over one owner's listing pages
pub struct ListingWalker<'a> {
    source: &'a dyn NoteSource,
    owner: &'a OwnerRef,
    retry: RetryPolicy,
    finished: bool,
}

impl<'a> ListingWalker<'a> {
    pub fn new(source: &'a dyn NoteSource, owner: &'a OwnerRef, retry: RetryPolicy) -> Self {
        Self {
            source,
            owner,
            retry,
            finished: false,
        }
    }

    /// Returns true once no further page will be produced
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Requests the next page
    ///
    /// # Arguments
    ///
    /// * `state` - The owner's cursor state; its cursor is advanced on success
    ///
    /// # Returns
    ///
    /// * `Some(PageOutcome::Page)` - The next page (empty when throttling never cleared)
    /// * `Some(PageOutcome::Failed)` - The provider failed; later calls return `None`
    /// * `None` - The listing is exhausted
    pub async fn next_page(&mut self, state: &mut CrawlCursorState) -> Option<PageOutcome> {
        if self.finished {
            return None;
        }

        let first_page = state.is_first_page();
        let mut attempt = 1;

        let page = loop {
            match self.source.list_notes(self.owner, &state.cursor_token).await {
                Err(e) => {
                    self.finished = true;
                    warn!("Listing for {} failed: {}", self.owner.owner_id, e);
                    return Some(PageOutcome::Failed(e.to_string()));
                }
                Ok(page)
                    if first_page && page.items.is_empty() && attempt < self.retry.max_attempts =>
                {
                    warn!(
                        "Empty first page for {} (attempt {}/{}), likely throttled; retrying in {:?}",
                        self.owner.owner_id, attempt, self.retry.max_attempts, self.retry.backoff
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Ok(page) => break page,
            }
        };

        state.pages_fetched += 1;
        debug!(
            "Page {} for {}: {} notes, has_more={}",
            state.pages_fetched,
            self.owner.owner_id,
            page.items.len(),
            page.has_more
        );

        match page.next_cursor {
            Some(cursor)
                if page.has_more && !page.items.is_empty() && cursor != state.cursor_token =>
            {
                state.cursor_token = cursor;
            }
            _ => self.finished = true,
        }

        Some(PageOutcome::Page(page.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::{reference, ScriptedSource};
    use crate::provider::ListingPage;
    use std::time::Duration;

    fn page(ids: &[&str], next: Option<&str>, has_more: bool) -> ListingPage {
        ListingPage {
            items: ids.iter().map(|id| reference(id)).collect(),
            next_cursor: next.map(str::to_string),
            has_more,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(180),
        }
    }

    #[tokio::test]
    async fn test_walks_until_has_more_is_false() {
        let source = ScriptedSource::new()
            .with_page("", page(&["a", "b"], Some("c1"), true))
            .with_page("c1", page(&["c"], Some("c2"), false));
        let owner = OwnerRef::new("owner1");
        let mut walker = ListingWalker::new(&source, &owner, policy());
        let mut state = CrawlCursorState::new();

        let first = walker.next_page(&mut state).await;
        assert_eq!(
            first,
            Some(PageOutcome::Page(vec![reference("a"), reference("b")]))
        );
        assert_eq!(state.cursor_token, "c1");

        let second = walker.next_page(&mut state).await;
        assert_eq!(second, Some(PageOutcome::Page(vec![reference("c")])));
        assert!(walker.is_finished());
        assert_eq!(walker.next_page(&mut state).await, None);
        assert_eq!(state.pages_fetched, 2);
        assert_eq!(source.listing_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_cursor_ends_walk() {
        let source = ScriptedSource::new().with_page("", page(&["a"], None, true));
        let owner = OwnerRef::new("owner1");
        let mut walker = ListingWalker::new(&source, &owner, policy());
        let mut state = CrawlCursorState::new();

        assert!(matches!(
            walker.next_page(&mut state).await,
            Some(PageOutcome::Page(_))
        ));
        assert_eq!(walker.next_page(&mut state).await, None);
    }

    #[tokio::test]
    async fn test_failure_is_reported_once() {
        let source = ScriptedSource::new().with_listing_error("");
        let owner = OwnerRef::new("owner1");
        let mut walker = ListingWalker::new(&source, &owner, policy());
        let mut state = CrawlCursorState::new();

        assert!(matches!(
            walker.next_page(&mut state).await,
            Some(PageOutcome::Failed(_))
        ));
        assert_eq!(walker.next_page(&mut state).await, None);
        assert_eq!(state.pages_fetched, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_first_page_retries_with_backoff() {
        let source = ScriptedSource::new().with_page("", page(&[], Some("c1"), true));
        let owner = OwnerRef::new("owner1");
        let mut walker = ListingWalker::new(&source, &owner, policy());
        let mut state = CrawlCursorState::new();

        let started = tokio::time::Instant::now();
        let outcome = walker.next_page(&mut state).await;

        assert_eq!(outcome, Some(PageOutcome::Page(vec![])));
        assert_eq!(source.listing_calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(360));
        assert!(walker.is_finished());
        assert_eq!(walker.next_page(&mut state).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_first_page_recovers() {
        let source = ScriptedSource::new()
            .with_page("", page(&[], None, true))
            .with_page("", page(&["a"], None, false));
        let owner = OwnerRef::new("owner1");
        let mut walker = ListingWalker::new(&source, &owner, policy());
        let mut state = CrawlCursorState::new();

        let outcome = walker.next_page(&mut state).await;
        assert_eq!(outcome, Some(PageOutcome::Page(vec![reference("a")])));
        assert_eq!(source.listing_calls(), 2);
    }
}
