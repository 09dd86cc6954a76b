//! Time and jitter sources for the feed.
//!
//! Item ranks are anchored to an assignment timestamp that includes a small
//! random jitter, so rank ties between items inserted in the same millisecond
//! stay rare. Both the wall clock and the jitter are behind a trait so tests
//! and deterministic replays can pin exact values.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;
use time::OffsetDateTime;

/// Source of assignment timestamps and insertion jitter.
pub trait FeedClock: Send + Sync {
    /// Current wall-clock time in unix milliseconds.
    fn now_ms(&self) -> i64;

    /// Jitter in milliseconds to add to the assignment timestamp.
    fn jitter_ms(&self) -> i64;
}

/// Production clock: system time plus uniform random jitter in
/// `[0, jitter_ceiling_ms)`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    jitter_ceiling_ms: u64,
}

impl SystemClock {
    pub fn new(jitter_ceiling_ms: u64) -> Self {
        Self { jitter_ceiling_ms }
    }
}

impl FeedClock for SystemClock {
    fn now_ms(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }

    fn jitter_ms(&self) -> i64 {
        if self.jitter_ceiling_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..self.jitter_ceiling_ms) as i64
    }
}

/// Jitter-free clock that only moves when told to. Intended for tests and
/// deterministic replays where exact ranks matter.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl FeedClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn jitter_ms(&self) -> i64 {
        0
    }
}
