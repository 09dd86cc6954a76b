//! Resident feed items and their rank derivation.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::entities::CommentRecord;

/// Half a day in milliseconds, the unit of the activity boost. One comment
/// pulls an item's effective timestamp half a day forward; further activity
/// has square-root diminishing returns.
pub(crate) const HALF_DAY_MS: i64 = 12 * 60 * 60 * 1000;

/// Parameters for inserting a new item into the feed.
///
/// `best_comment` is only set when rebuilding the hot set from the durable
/// store, which replays each candidate together with its top comment.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub url: String,
    pub title: String,
    pub best_comment: Option<CommentSummary>,
}

/// Read-only projection of a durable comment, carried by the item it
/// belongs to. The durable store owns the comment's lifecycle; the feed only
/// ever holds a snapshot copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentSummary {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub likes: u32,
}

impl From<&CommentRecord> for CommentSummary {
    fn from(record: &CommentRecord) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            author: record.author.clone(),
            likes: record.likes,
        }
    }
}

/// Two-phase durable identity of a resident item.
///
/// Items enter the feed under their natural key alone and are bound to the
/// durable store's numeric id once persistence completes, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBinding {
    Unbound,
    Bound(i64),
}

impl StoreBinding {
    pub fn id(self) -> Option<i64> {
        match self {
            StoreBinding::Unbound => None,
            StoreBinding::Bound(id) => Some(id),
        }
    }
}

/// A feed entry resident in the cache, owned exclusively by the manager.
///
/// `created_at_ms` and `rank` are internal: they order the feed but are never
/// serialized, and `rank` only changes through the manager's
/// remove-then-reinsert discipline.
#[derive(Debug, Clone)]
pub struct HotItem {
    url: Arc<str>,
    binding: StoreBinding,
    title: String,
    comment_count: u32,
    best_comment: Option<CommentSummary>,
    created_at_ms: i64,
    rank: i64,
}

impl HotItem {
    pub(crate) fn new(
        url: Arc<str>,
        title: String,
        best_comment: Option<CommentSummary>,
        created_at_ms: i64,
    ) -> Self {
        let mut item = Self {
            url,
            binding: StoreBinding::Unbound,
            title,
            comment_count: 0,
            best_comment,
            created_at_ms,
            rank: 0,
        };
        item.refresh_rank();
        item
    }

    pub fn url(&self) -> &Arc<str> {
        &self.url
    }

    pub fn binding(&self) -> StoreBinding {
        self.binding
    }

    pub fn store_id(&self) -> Option<i64> {
        self.binding.id()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn comment_count(&self) -> u32 {
        self.comment_count
    }

    pub fn best_comment(&self) -> Option<&CommentSummary> {
        self.best_comment.as_ref()
    }

    pub(crate) fn rank(&self) -> i64 {
        self.rank
    }

    pub(crate) fn bind(&mut self, id: i64) {
        self.binding = StoreBinding::Bound(id);
    }

    /// Fold a notified comment into the item: apply the best-comment
    /// replacement policy, count the activity, and recompute the rank.
    ///
    /// The first comment to collect a like wins the best-comment slot;
    /// while the current best has zero likes it stays replaceable.
    pub(crate) fn absorb_comment(&mut self, comment: CommentSummary) {
        let replaceable = self
            .best_comment
            .as_ref()
            .is_none_or(|best| best.likes == 0);
        if replaceable {
            self.best_comment = Some(comment);
        }
        self.comment_count += 1;
        self.refresh_rank();
    }

    fn refresh_rank(&mut self) {
        let mut rank = self.created_at_ms + activity_boost(self.comment_count);
        if let Some(best) = &self.best_comment {
            rank += activity_boost(best.likes);
        }
        self.rank = rank;
    }
}

fn activity_boost(units: u32) -> i64 {
    ((units as f64).sqrt() * HALF_DAY_MS as f64) as i64
}
