//! Feed cache configuration.
//!
//! Controls the resident-item ceiling and insertion jitter of the hot feed.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 100;
const DEFAULT_JITTER_CEILING_MS: u64 = 1000;

/// Configuration for a [`FeedManager`](super::FeedManager).
///
/// Deserializable from a `[feed]` section of an embedding application's
/// configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum number of resident items; the lowest-ranked items are evicted
    /// once this is exceeded.
    pub capacity: usize,
    /// Exclusive upper bound, in milliseconds, of the random jitter added to
    /// each item's assignment timestamp. Zero disables jitter.
    pub jitter_ceiling_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            jitter_ceiling_ms: DEFAULT_JITTER_CEILING_MS,
        }
    }
}

impl FeedConfig {
    /// Returns the capacity as `NonZeroUsize`, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
