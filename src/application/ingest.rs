//! Integration glue between the durable store and the hot feed.
//!
//! The cache is not durable: the store stays authoritative, the feed holds a
//! bounded projection of it. This service wires the two according to the
//! integration contract: new content enters the cache under its natural key
//! before a durable id exists, ids are bound once persistence completes, and
//! comment/like activity is forwarded so ranks move.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{CommentsRepo, ItemsRepo, RepoError};
use crate::domain::entities::{CommentRecord, NewCommentRecord, NewItemRecord};
use crate::feed::{CommentSummary, FeedError, FeedManager, NewItem};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Outcome of publishing a discovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The item entered the feed and the durable store; the id is bound.
    Published { id: i64 },
    /// The natural key was already resident; nothing was written.
    Duplicate,
}

#[derive(Clone)]
pub struct IngestService {
    feed: Arc<FeedManager>,
    items: Arc<dyn ItemsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl IngestService {
    pub fn new(
        feed: Arc<FeedManager>,
        items: Arc<dyn ItemsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            feed,
            items,
            comments,
        }
    }

    /// Publish an item discovered by the ingestion pipeline.
    ///
    /// The cache insert doubles as the dedupe check: a key that is already
    /// resident short-circuits before any store write. Otherwise the item is
    /// persisted and its assigned id bound back into the feed.
    pub async fn publish_item(&self, item: NewItemRecord) -> Result<PublishOutcome, IngestError> {
        let inserted = self.feed.insert(NewItem {
            url: item.url.clone(),
            title: item.title.clone(),
            best_comment: None,
        })?;
        if !inserted {
            debug!(url = %item.url, "item already in the hot set, skipping publish");
            return Ok(PublishOutcome::Duplicate);
        }

        let id = self.items.insert_item(&item).await?;
        self.feed.bind_id(&item.url, id);
        info!(url = %item.url, id, "published item");
        Ok(PublishOutcome::Published { id })
    }

    /// Durably record a comment, then forward it to the feed.
    pub async fn add_comment(
        &self,
        comment: NewCommentRecord,
    ) -> Result<CommentRecord, IngestError> {
        let id = self.comments.insert_comment(&comment).await?;
        let record = CommentRecord {
            id,
            item_id: comment.item_id,
            created_at: comment.created_at,
            text: comment.text,
            author: comment.author,
            likes: 0,
        };
        self.feed
            .notify_comment(record.item_id, CommentSummary::from(&record));
        Ok(record)
    }

    /// Durably register a like, then forward the updated summary. Store
    /// outcomes (unknown comment, repeat like) pass through typed.
    pub async fn like_comment(
        &self,
        username: &str,
        comment_id: i64,
    ) -> Result<CommentRecord, IngestError> {
        let updated = self.comments.insert_like(username, comment_id).await?;
        self.feed
            .notify_comment(updated.item_id, CommentSummary::from(&updated));
        Ok(updated)
    }

    /// Rebuild the hot set from the store's best-comment rows. Each candidate
    /// enters with its top comment attached and its id bound; repeated rows
    /// for the same item are rejected by the resident-key check. Returns the
    /// number of items restored.
    pub async fn replay(&self) -> Result<usize, IngestError> {
        let rows = self.comments.list_best().await?;
        let mut restored = 0;
        for row in rows {
            let inserted = self.feed.insert(NewItem {
                url: row.item.url.clone(),
                title: row.item.title.clone(),
                best_comment: Some(CommentSummary::from(&row.comment)),
            })?;
            if inserted {
                self.feed.bind_id(&row.item.url, row.item.id);
                restored += 1;
            }
        }
        info!(restored, "replayed hot feed from durable store");
        Ok(restored)
    }

    /// The precomputed plain payload of the ranked feed.
    pub fn feed_json(&self) -> Bytes {
        self.feed.snapshot().json
    }

    /// The precomputed gzip payload of the ranked feed. Choosing between the
    /// two forms is the transport's concern.
    pub fn feed_gzip(&self) -> Bytes {
        self.feed.snapshot().gzip
    }
}
