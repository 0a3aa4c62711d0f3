//! Dedup and staleness filter

use crate::item::ItemRecord;
use crate::state::{CrawlCursorState, ItemVerdict, KnownIdSet};
use chrono::NaiveDateTime;

/// Outcome of classifying a fetched record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub verdict: ItemVerdict,

    /// The walk must stop after this item
    pub halt: bool,
}

/// Decides which notes are new and when staleness ends a walk
#[derive(Debug, Clone, Copy)]
pub struct StalenessFilter {
    cutoff: Option<NaiveDateTime>,
    tolerance: u32,
}

impl StalenessFilter {
    /// Creates a filter; `tolerance` is the number of consecutive stale notes that halts a walk
    pub fn new(cutoff: Option<NaiveDateTime>, tolerance: u32) -> Self {
        Self {
            cutoff,
            tolerance: tolerance.max(1),
        }
    }

    pub fn cutoff(&self) -> Option<NaiveDateTime> {
        self.cutoff
    }

    /// Checks a reference against the known ids, before any detail fetch
    pub fn screen(&self, known: &KnownIdSet, id: &str) -> ItemVerdict {
        if known.contains(id) {
            ItemVerdict::AlreadySeen
        } else {
            ItemVerdict::New
        }
    }

    /// Classifies a fetched record against the cutoff
    ///
    /// Updates the consecutive stale counter in `state`. A record without an
    /// upload time is treated as new and leaves the counter alone.
    pub fn classify(&self, record: &ItemRecord, state: &mut CrawlCursorState) -> FilterDecision {
        let (Some(cutoff), Some(uploaded)) = (self.cutoff, record.upload_time) else {
            return FilterDecision {
                verdict: ItemVerdict::New,
                halt: false,
            };
        };

        if uploaded >= cutoff {
            state.consecutive_stale_count = 0;
            return FilterDecision {
                verdict: ItemVerdict::New,
                halt: false,
            };
        }

        state.consecutive_stale_count += 1;
        FilterDecision {
            verdict: ItemVerdict::Stale,
            halt: state.consecutive_stale_count >= self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{fixtures::record, parse_upload_time};

    fn cutoff() -> Option<NaiveDateTime> {
        parse_upload_time("2024-01-10 00:00:00")
    }

    #[test]
    fn test_screen() {
        let filter = StalenessFilter::new(None, 3);
        let known: KnownIdSet = ["a", "b"].into_iter().collect();
        assert_eq!(filter.screen(&known, "a"), ItemVerdict::AlreadySeen);
        assert_eq!(filter.screen(&known, "c"), ItemVerdict::New);
    }

    #[test]
    fn test_no_cutoff_is_always_new() {
        let filter = StalenessFilter::new(None, 1);
        let mut state = CrawlCursorState::new();
        let decision = filter.classify(&record("a", Some("2000-01-01 00:00:00")), &mut state);
        assert_eq!(decision.verdict, ItemVerdict::New);
        assert!(!decision.halt);
        assert_eq!(state.consecutive_stale_count, 0);
    }

    #[test]
    fn test_cutoff_boundary_is_new() {
        let filter = StalenessFilter::new(cutoff(), 3);
        let mut state = CrawlCursorState::new();
        let decision = filter.classify(&record("a", Some("2024-01-10 00:00:00")), &mut state);
        assert_eq!(decision.verdict, ItemVerdict::New);
    }

    #[test]
    fn test_stale_run_halts_at_tolerance_and_resets_on_new() {
        let filter = StalenessFilter::new(cutoff(), 3);
        let mut state = CrawlCursorState::new();

        let old = record("old", Some("2024-01-05 08:00:00"));
        let fresh = record("fresh", Some("2024-01-12 08:00:00"));

        assert!(!filter.classify(&old, &mut state).halt);
        assert!(!filter.classify(&old, &mut state).halt);
        assert_eq!(state.consecutive_stale_count, 2);

        assert_eq!(filter.classify(&fresh, &mut state).verdict, ItemVerdict::New);
        assert_eq!(state.consecutive_stale_count, 0);

        filter.classify(&old, &mut state);
        filter.classify(&old, &mut state);
        let third = filter.classify(&old, &mut state);
        assert_eq!(third.verdict, ItemVerdict::Stale);
        assert!(third.halt);
    }

    #[test]
    fn test_missing_upload_time_leaves_counter() {
        let filter = StalenessFilter::new(cutoff(), 3);
        let mut state = CrawlCursorState {
            consecutive_stale_count: 2,
            ..CrawlCursorState::default()
        };
        let decision = filter.classify(&record("a", None), &mut state);
        assert_eq!(decision.verdict, ItemVerdict::New);
        assert_eq!(state.consecutive_stale_count, 2);
    }
}
