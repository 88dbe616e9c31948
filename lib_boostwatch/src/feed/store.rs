//! # Feed Store
//!
//! In-memory, ordered and deduplicated collection of [`BoostEvent`]s.
//!
//! ## Key Design Principles:
//! - **Single Source of Truth**: cursors (lowest/highest known index) and the
//!   seen-set are derived from the store, never from whatever renders it.
//! - **Idempotent Merge**: merging a record whose index is already present is a
//!   no-op, so overlapping or out-of-order poll responses can all be applied.
//! - **Localized Inserts**: every insertion reports the existing neighbor it
//!   sits next to, letting a live view do one "insert next to X" operation
//!   instead of a full re-render.

use super::event::BoostEvent;

/// Where a new event was attached relative to the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The store was empty.
    Sole,
    /// Directly after the event with this index.
    After(u64),
    /// Directly before the event with this index.
    Before(u64),
}

/// Coarse location of an insertion, used to pick view effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First event in an empty store.
    Only,
    /// Greater than every other index.
    Newest,
    /// Smaller than every other index.
    Oldest,
    /// Filled a gap.
    Between,
}

/// # Insertion
///
/// One novel event accepted by [`FeedStore::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// The inserted event.
    pub event: BoostEvent,
    /// Closest existing neighbor at the time of insertion.
    pub anchor: Anchor,
    /// Front/middle/back classification.
    pub placement: Placement,
    /// Ascending ordinal position right after this insertion. Later
    /// insertions from the same batch may shift it.
    pub position: usize,
}

/// # Feed Store
///
/// Events sorted ascending by `index` with no duplicate indices.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    events: Vec<BoostEvent>,
}

impl FeedStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a batch, in any order, and returns the novel insertions in the
    /// order they were applied. Known indices, including repeats within the
    /// batch, are skipped silently.
    pub fn merge<I>(&mut self, batch: I) -> Vec<Insertion>
    where
        I: IntoIterator<Item = BoostEvent>,
    {
        batch
            .into_iter()
            .filter_map(|event| self.insert(event))
            .collect()
    }

    /// Inserts one event. Returns `None` if its index is already known.
    pub fn insert(&mut self, event: BoostEvent) -> Option<Insertion> {
        let pos = match self.events.binary_search_by_key(&event.index, |e| e.index) {
            Ok(_) => return None,
            Err(pos) => pos,
        };

        let len = self.events.len();
        let anchor = match self.closest_at(pos, event.index) {
            None => Anchor::Sole,
            Some(closest) if event.index > closest => Anchor::After(closest),
            Some(closest) => Anchor::Before(closest),
        };
        let placement = if len == 0 {
            Placement::Only
        } else if pos == len {
            Placement::Newest
        } else if pos == 0 {
            Placement::Oldest
        } else {
            Placement::Between
        };

        self.events.insert(pos, event.clone());
        Some(Insertion {
            event,
            anchor,
            placement,
            position: pos,
        })
    }

    /// Existing index nearest to `index`. On an exact tie the lower neighbor
    /// wins.
    pub fn closest_index(&self, index: u64) -> Option<u64> {
        match self.events.binary_search_by_key(&index, |e| e.index) {
            Ok(_) => Some(index),
            Err(pos) => self.closest_at(pos, index),
        }
    }

    fn closest_at(&self, pos: usize, index: u64) -> Option<u64> {
        let lower = pos.checked_sub(1).map(|i| self.events[i].index);
        let upper = self.events.get(pos).map(|e| e.index);
        match (lower, upper) {
            (Some(lo), Some(hi)) => Some(if index - lo <= hi - index { lo } else { hi }),
            (lo, hi) => lo.or(hi),
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event has been merged since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Lowest known index, the backfill cursor.
    pub fn lowest(&self) -> Option<u64> {
        self.events.first().map(|e| e.index)
    }

    /// Highest known index, the forward cursor.
    pub fn highest(&self) -> Option<u64> {
        self.events.last().map(|e| e.index)
    }

    /// Whether `index` is present.
    pub fn contains(&self, index: u64) -> bool {
        self.get(index).is_some()
    }

    /// Event with this index.
    pub fn get(&self, index: u64) -> Option<&BoostEvent> {
        self.events
            .binary_search_by_key(&index, |e| e.index)
            .ok()
            .map(|pos| &self.events[pos])
    }

    /// Flags an event as replied to. Returns false if the index is unknown.
    pub fn mark_replied(&mut self, index: u64) -> bool {
        match self.events.binary_search_by_key(&index, |e| e.index) {
            Ok(pos) => {
                self.events[pos].reply_sent = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Ascending iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BoostEvent> + '_ {
        self.events.iter()
    }

    /// Newest-first iteration, the usual display order.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &BoostEvent> + '_ {
        self.events.iter().rev()
    }

    /// Drops everything, e.g. when the session switches view.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(index: u64) -> BoostEvent {
        BoostEvent {
            index,
            ..Default::default()
        }
    }

    fn indices(store: &FeedStore) -> Vec<u64> {
        store.iter().map(|e| e.index).collect()
    }

    fn seeded() -> FeedStore {
        let mut store = FeedStore::new();
        store.merge([ev(10), ev(20), ev(30)]);
        store
    }

    #[test]
    fn first_insert_into_empty_store_is_sole() {
        let mut store = FeedStore::new();
        let ins = store.merge([ev(5)]);
        assert_eq!(ins.len(), 1);
        assert_eq!(ins[0].anchor, Anchor::Sole);
        assert_eq!(ins[0].placement, Placement::Only);
        assert_eq!(ins[0].position, 0);
    }

    #[test]
    fn tie_prefers_lower_neighbor() {
        let mut store = seeded();
        let ins = store.insert(ev(15)).unwrap();
        assert_eq!(ins.anchor, Anchor::After(10));
        assert_eq!(ins.placement, Placement::Between);
        assert_eq!(ins.position, 1);
    }

    #[test]
    fn anchors_to_closest_neighbor() {
        let mut store = seeded();
        assert_eq!(store.insert(ev(24)).unwrap().anchor, Anchor::After(20));
        assert_eq!(store.insert(ev(28)).unwrap().anchor, Anchor::Before(30));
        let front = store.insert(ev(5)).unwrap();
        assert_eq!(front.anchor, Anchor::Before(10));
        assert_eq!(front.placement, Placement::Oldest);
        let back = store.insert(ev(31)).unwrap();
        assert_eq!(back.anchor, Anchor::After(30));
        assert_eq!(back.placement, Placement::Newest);
        assert_eq!(indices(&store), vec![5, 10, 20, 24, 28, 30, 31]);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![ev(3), ev(1), ev(2)];
        let mut once = FeedStore::new();
        once.merge(batch.clone());
        let mut twice = FeedStore::new();
        twice.merge(batch.clone());
        let second = twice.merge(batch);
        assert!(second.is_empty());
        assert_eq!(indices(&once), indices(&twice));
    }

    #[test]
    fn unsorted_batch_with_repeats_stays_strictly_increasing() {
        let mut store = FeedStore::new();
        let ins = store.merge([ev(9), ev(2), ev(9), ev(7), ev(2), ev(11), ev(1)]);
        assert_eq!(ins.len(), 5);
        let got = indices(&store);
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(got, vec![1, 2, 7, 9, 11]);
    }

    #[test]
    fn cursors_and_lookup() {
        let mut store = seeded();
        assert_eq!(store.lowest(), Some(10));
        assert_eq!(store.highest(), Some(30));
        assert_eq!(store.closest_index(26), Some(30));
        assert_eq!(store.closest_index(20), Some(20));
        assert!(store.mark_replied(20));
        assert!(store.get(20).unwrap().reply_sent);
        assert!(!store.mark_replied(21));
        let newest: Vec<u64> = store.iter_newest_first().map(|e| e.index).collect();
        assert_eq!(newest, vec![30, 20, 10]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.highest(), None);
    }
}
