//! Vampa keeps a bounded, continuously re-ranked hot feed in memory and
//! serves its read payload from precomputed plain and gzip snapshots.
//!
//! The durable store behind the feed is an external collaborator reached
//! through the traits in [`application::repos`]; the cache itself is not
//! durable and is replayed from the store on startup via
//! [`application::ingest::IngestService::replay`].

pub mod application;
pub mod domain;
pub mod feed;
pub mod infra;
