//! Rank-ordered index over the resident items.
//!
//! The index orders entries by `(rank, url)`. Ranks may collide (insertion
//! jitter keeps that rare); urls are unique among resident items, so the
//! composite entry never does. Because the tree orders by the rank an entry
//! had when it was inserted, a rank change MUST go through
//! [`RankIndex::remove`] with the old rank followed by [`RankIndex::insert`]
//! with the new one; this wrapper exposes no other mutation path.

use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RankEntry {
    pub rank: i64,
    pub url: Arc<str>,
}

#[derive(Debug, Default)]
pub(crate) struct RankIndex {
    entries: BTreeSet<RankEntry>,
}

impl RankIndex {
    pub fn insert(&mut self, rank: i64, url: Arc<str>) {
        self.entries.insert(RankEntry { rank, url });
    }

    /// Remove an entry by identity: the url together with the rank it was
    /// inserted under. Returns false when no such entry exists.
    pub fn remove(&mut self, rank: i64, url: &Arc<str>) -> bool {
        self.entries.remove(&RankEntry {
            rank,
            url: Arc::clone(url),
        })
    }

    pub fn pop_min(&mut self) -> Option<RankEntry> {
        self.entries.pop_first()
    }

    /// Iterate entries from highest rank to lowest.
    pub fn iter_descending(&self) -> impl Iterator<Item = &RankEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
