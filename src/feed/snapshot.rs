//! Precomputed serialized forms of the ranked feed.
//!
//! The feed keeps the wire payload ready in both plain JSON and gzip so the
//! read path only ever clones cached bytes. Both forms are replaced together
//! at the end of every structural mutation; a serialization failure keeps the
//! previous pair (stale but valid beats no payload).

use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::error;

use super::item::{CommentSummary, HotItem};

/// Canonical wire projection of a resident item. Internal ordering fields
/// (assignment timestamp, rank) are never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub comment_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_comment: Option<CommentSummary>,
}

impl From<&HotItem> for FeedEntry {
    fn from(item: &HotItem) -> Self {
        Self {
            url: item.url().to_string(),
            id: item.store_id(),
            title: item.title().to_string(),
            comment_count: item.comment_count(),
            best_comment: item.best_comment().cloned(),
        }
    }
}

/// The two cached payloads handed to readers.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub json: Bytes,
    pub gzip: Bytes,
}

#[derive(Debug)]
pub(crate) struct SnapshotCache {
    json: Bytes,
    gzip: Bytes,
}

impl SnapshotCache {
    /// Start from the empty-list payload so readers never observe an
    /// uninitialized snapshot and the two forms agree from the first read.
    pub fn new() -> Self {
        let json = Bytes::from_static(b"[]");
        let gzip = match gzip_payload(&json) {
            Ok(compressed) => Bytes::from(compressed),
            Err(error) => {
                error!(error = %error, "failed to compress empty feed snapshot");
                Bytes::new()
            }
        };
        Self { json, gzip }
    }

    pub fn current(&self) -> FeedSnapshot {
        FeedSnapshot {
            json: self.json.clone(),
            gzip: self.gzip.clone(),
        }
    }

    /// Replace both cached forms from the given descending-rank entries.
    /// On failure the previous pair is left untouched.
    pub fn refresh(&mut self, entries: &[FeedEntry]) {
        let json = match serde_json::to_vec(entries) {
            Ok(payload) => payload,
            Err(error) => {
                counter!("vampa_feed_snapshot_error_total").increment(1);
                error!(
                    error = %error,
                    entries = entries.len(),
                    "failed to serialize feed snapshot; keeping previous payloads"
                );
                return;
            }
        };

        let gzip = match gzip_payload(&json) {
            Ok(payload) => payload,
            Err(error) => {
                counter!("vampa_feed_snapshot_error_total").increment(1);
                error!(
                    error = %error,
                    "failed to compress feed snapshot; keeping previous payloads"
                );
                return;
            }
        };

        self.json = Bytes::from(json);
        self.gzip = Bytes::from(gzip);
        counter!("vampa_feed_snapshot_refresh_total").increment(1);
        gauge!("vampa_feed_snapshot_bytes").set(self.json.len() as f64);
    }
}

fn gzip_payload(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input)?;
    encoder.finish()
}
