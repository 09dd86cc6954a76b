//! The hot-feed manager: a bounded, continuously re-ranked resident set.
//!
//! One `RwLock` guards the whole structure. Writers (insert, bind, notify,
//! explicit snapshot refresh) hold the exclusive lock across eviction and
//! snapshot recomputation, so readers never observe a partially evicted or
//! partially re-ranked feed. Nothing suspends or performs I/O under the lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use metrics::{counter, gauge};
use thiserror::Error;
use tracing::debug;

use super::clock::{FeedClock, SystemClock};
use super::config::FeedConfig;
use super::index::RankIndex;
use super::item::{CommentSummary, HotItem, NewItem};
use super::lock::{rw_read, rw_write};
use super::snapshot::{FeedEntry, FeedSnapshot, SnapshotCache};

const SOURCE: &str = "feed::manager";

#[derive(Debug, Error)]
pub enum FeedError {
    /// The rank index and the resident map disagree on cardinality. This is
    /// a logic defect, not a transient condition: the feed cannot tell which
    /// structure is right, so the state is not repaired. Supervising layers
    /// typically treat it as fatal.
    #[error("rank index and resident map out of sync ({indexed} indexed, {resident} resident)")]
    Consistency { indexed: usize, resident: usize },
}

struct FeedState {
    by_rank: RankIndex,
    by_url: HashMap<Arc<str>, HotItem>,
    by_id: HashMap<i64, Arc<str>>,
    snapshot: SnapshotCache,
}

impl FeedState {
    fn new() -> Self {
        Self {
            by_rank: RankIndex::default(),
            by_url: HashMap::new(),
            by_id: HashMap::new(),
            snapshot: SnapshotCache::new(),
        }
    }

    /// Remove minimum-rank items until the resident count fits the capacity,
    /// then verify the index and the owning map still agree.
    fn evict_over(&mut self, capacity: usize) -> Result<usize, FeedError> {
        let mut evicted = 0;
        while self.by_url.len() > capacity {
            let Some(entry) = self.by_rank.pop_min() else {
                break;
            };
            if let Some(item) = self.by_url.remove(entry.url.as_ref()) {
                if let Some(id) = item.store_id() {
                    self.by_id.remove(&id);
                }
            }
            evicted += 1;
        }

        if self.by_rank.len() != self.by_url.len() {
            return Err(FeedError::Consistency {
                indexed: self.by_rank.len(),
                resident: self.by_url.len(),
            });
        }
        Ok(evicted)
    }

    /// Fold a comment into the identified item, moving it through the index
    /// under the remove-then-reinsert discipline.
    fn apply_comment(&mut self, url: &Arc<str>, comment: CommentSummary) -> bool {
        let Some(item) = self.by_url.get_mut(url.as_ref()) else {
            return false;
        };
        self.by_rank.remove(item.rank(), url);
        item.absorb_comment(comment);
        self.by_rank.insert(item.rank(), Arc::clone(url));
        true
    }

    fn refresh_snapshot(&mut self) {
        let entries: Vec<FeedEntry> = self
            .by_rank
            .iter_descending()
            .filter_map(|entry| self.by_url.get(entry.url.as_ref()))
            .map(FeedEntry::from)
            .collect();
        self.snapshot.refresh(&entries);
    }
}

/// Process-wide hot-feed cache.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct FeedManager {
    capacity: usize,
    clock: Arc<dyn FeedClock>,
    state: RwLock<FeedState>,
}

impl FeedManager {
    pub fn new(config: FeedConfig) -> Self {
        let clock = Arc::new(SystemClock::new(config.jitter_ceiling_ms));
        Self::with_clock(config, clock)
    }

    /// Construct with an explicit clock. Deterministic clocks make ranks,
    /// and therefore eviction order, reproducible.
    pub fn with_clock(config: FeedConfig, clock: Arc<dyn FeedClock>) -> Self {
        Self {
            capacity: config.capacity_non_zero().get(),
            clock,
            state: RwLock::new(FeedState::new()),
        }
    }

    /// Insert a new item under its natural key.
    ///
    /// Returns `Ok(false)` without mutating anything when the key is already
    /// resident. Otherwise stamps the jittered assignment timestamp, ranks
    /// and indexes the item, evicts down to capacity, and refreshes the
    /// snapshot, all under one exclusive section.
    pub fn insert(&self, item: NewItem) -> Result<bool, FeedError> {
        let mut state = rw_write(&self.state, SOURCE, "insert");
        if state.by_url.contains_key(item.url.as_str()) {
            counter!("vampa_feed_duplicate_total").increment(1);
            debug!(url = %item.url, "item already resident, insert skipped");
            return Ok(false);
        }

        let created_at_ms = self.clock.now_ms() + self.clock.jitter_ms();
        let url: Arc<str> = Arc::from(item.url.as_str());
        let hot = HotItem::new(
            Arc::clone(&url),
            item.title,
            item.best_comment,
            created_at_ms,
        );
        state.by_rank.insert(hot.rank(), Arc::clone(&url));
        state.by_url.insert(url, hot);

        let evicted = state.evict_over(self.capacity)?;
        state.refresh_snapshot();

        counter!("vampa_feed_insert_total").increment(1);
        if evicted > 0 {
            counter!("vampa_feed_evict_total").increment(evicted as u64);
        }
        gauge!("vampa_feed_resident_items").set(state.by_url.len() as f64);
        Ok(true)
    }

    /// Bind the durable store's id to an already-resident key.
    ///
    /// Returns false when the key is not resident: the item may have been
    /// evicted while persistence was in flight, which is benign. Binding is
    /// metadata-only: no rank change, no eviction, no snapshot refresh.
    pub fn bind_id(&self, url: &str, id: i64) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "bind_id");
        let state = &mut *state;
        let Some(item) = state.by_url.get_mut(url) else {
            debug!(url, id, "bind for a url outside the hot set");
            return false;
        };
        item.bind(id);
        state.by_id.insert(id, Arc::clone(item.url()));
        true
    }

    /// Record durable comment activity against the item bound to `item_id`.
    ///
    /// Returns false when the id is unbound or the item has fallen out of
    /// the hot set. This is the only path that moves a resident item's rank
    /// after insertion.
    pub fn notify_comment(&self, item_id: i64, comment: CommentSummary) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "notify_comment");
        let Some(url) = state.by_id.get(&item_id).cloned() else {
            counter!("vampa_feed_notify_miss_total").increment(1);
            debug!(item_id, "comment for an item outside the hot set");
            return false;
        };
        if !state.apply_comment(&url, comment) {
            counter!("vampa_feed_notify_miss_total").increment(1);
            return false;
        }
        state.refresh_snapshot();
        counter!("vampa_feed_notify_total").increment(1);
        true
    }

    /// Recompute the cached snapshot forms from the current structure.
    pub fn refresh_snapshot(&self) {
        let mut state = rw_write(&self.state, SOURCE, "refresh_snapshot");
        state.refresh_snapshot();
    }

    pub fn lookup(&self, url: &str) -> Option<HotItem> {
        rw_read(&self.state, SOURCE, "lookup")
            .by_url
            .get(url)
            .cloned()
    }

    pub fn is_resident(&self, url: &str) -> bool {
        rw_read(&self.state, SOURCE, "is_resident")
            .by_url
            .contains_key(url)
    }

    pub fn is_resident_id(&self, id: i64) -> bool {
        rw_read(&self.state, SOURCE, "is_resident_id")
            .by_id
            .contains_key(&id)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand out the precomputed payloads as of the last completed mutation.
    /// Never serializes on the read path.
    pub fn snapshot(&self) -> FeedSnapshot {
        rw_read(&self.state, SOURCE, "snapshot").snapshot.current()
    }
}
