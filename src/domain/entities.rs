//! Durable-store records consumed at the integration boundary.
//!
//! The durable store owns these rows; the crate only reads and projects
//! them. Numeric ids are the store's assigned identities.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub source: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub item_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub text: String,
    pub author: String,
    pub likes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub pass_hash: String,
}

/// An item as handed to the store before an id exists.
#[derive(Debug, Clone)]
pub struct NewItemRecord {
    pub url: String,
    pub title: String,
    pub source: String,
    pub link: String,
}

/// A comment as handed to the store before an id exists.
#[derive(Debug, Clone)]
pub struct NewCommentRecord {
    pub item_id: i64,
    pub created_at: OffsetDateTime,
    pub text: String,
    pub author: String,
}

/// One row of the startup-replay query: a hot-set candidate item joined to
/// its top comment.
#[derive(Debug, Clone)]
pub struct BestCommentRow {
    pub item: ItemRecord,
    pub comment: CommentRecord,
}
