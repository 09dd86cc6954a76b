//! Traits describing the durable store this crate is driven by.
//!
//! The store is an external collaborator: it executes the SQL, assigns the
//! numeric ids, and owns users, tokens, and comment lifecycles. This module
//! only fixes the typed contract the feed integration relies on. Failures
//! surface as [`RepoError`] values; the feed core never interprets them.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    BestCommentRow, CommentRecord, ItemRecord, NewCommentRecord, NewItemRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("token expired")]
    Expired,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ItemsRepo: Send + Sync {
    /// Persist a new item and return its assigned id.
    async fn insert_item(&self, item: &NewItemRecord) -> Result<i64, RepoError>;

    async fn delete_item(&self, id: i64) -> Result<(), RepoError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<ItemRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ItemRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Persist a new comment with zero likes and return its assigned id.
    async fn insert_comment(&self, comment: &NewCommentRecord) -> Result<i64, RepoError>;

    /// Delete a comment together with its recorded likes.
    async fn delete_comment(&self, id: i64) -> Result<(), RepoError>;

    /// Register a like. Fails with [`RepoError::NotFound`] when the comment
    /// does not exist and [`RepoError::Duplicate`] when the user already
    /// liked it; returns the updated record on success.
    async fn insert_like(&self, username: &str, comment_id: i64)
    -> Result<CommentRecord, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CommentRecord>, RepoError>;

    /// All comments of an item, most-liked first, with `pinned` (when given
    /// and belonging to the item) moved to the front.
    async fn list_for_item(
        &self,
        item_id: i64,
        pinned: Option<i64>,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    /// The most-liked comments joined to their items, best first. This is
    /// the source the hot feed is replayed from on startup.
    async fn list_best(&self) -> Result<Vec<BestCommentRow>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn insert_user(&self, user: &UserRecord) -> Result<(), RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait TokensRepo: Send + Sync {
    /// Park a pending registration under a temporary token.
    async fn insert_temp_token(
        &self,
        user: &UserRecord,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError>;

    /// Remove the pending registration and return it. Fails with
    /// [`RepoError::Expired`] past the deadline (the token is still
    /// consumed) and [`RepoError::NotFound`] for unknown tokens.
    async fn consume_temp_token(&self, token: &str) -> Result<UserRecord, RepoError>;

    async fn insert_access_token(
        &self,
        token: &str,
        username: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError>;

    /// Resolve an access token to its username. An expired token is deleted
    /// and reported as [`RepoError::Expired`].
    async fn username_for_access_token(&self, token: &str) -> Result<String, RepoError>;

    async fn delete_temp_token(&self, token: &str) -> Result<(), RepoError>;

    async fn delete_access_token(&self, token: &str) -> Result<(), RepoError>;
}
