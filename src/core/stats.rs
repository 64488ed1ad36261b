//! Counters describing scheduler and cache activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters shared by a scheduler and the client wrapping it.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    requests_enqueued: AtomicU64,
    requests_cancelled: AtomicU64,
    batches_dispatched: AtomicU64,
    batched_requests: AtomicU64,
    singles_dispatched: AtomicU64,
    batch_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    peak_active: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Requests handed to the scheduler.
    pub requests_enqueued: u64,
    /// Requests dropped by `clear_pending_requests`.
    pub requests_cancelled: u64,
    /// Batch bundles posted.
    pub batches_dispatched: u64,
    /// Requests folded into those batches.
    pub batched_requests: u64,
    /// Individual GETs issued.
    pub singles_dispatched: u64,
    /// Batches that failed as a whole (non-200 or transport error).
    pub batch_failures: u64,
    /// `get_with_cache` lookups answered from the cache.
    pub cache_hits: u64,
    /// `get_with_cache` lookups that went to the network.
    pub cache_misses: u64,
    /// Highest number of dispatch units observed in flight at once.
    pub peak_active: u64,
}

impl SchedulerStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self, count: usize) {
        self.requests_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, size: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.batched_requests.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_single(&self) {
        self.singles_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_failure(&self) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the peak in-flight mark if `active` exceeds it.
    pub(crate) fn observe_active(&self, active: usize) {
        let active = active as u64;
        let mut current = self.peak_active.load(Ordering::Relaxed);
        while active > current {
            match self.peak_active.compare_exchange_weak(
                current,
                active,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batched_requests: self.batched_requests.load(Ordering::Relaxed),
            singles_dispatched: self.singles_dispatched.load(Ordering::Relaxed),
            batch_failures: self.batch_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            peak_active: self.peak_active.load(Ordering::Relaxed),
        }
    }
}
