//! Counters for workload statistics.
//

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by the workload threads.
#[derive(Default)]
pub struct Counters {
    pub lookups: AtomicU64,
    pub hits: AtomicU64,
    pub upserts: AtomicU64,
    pub removes: AtomicU64,
    pub snapshots: AtomicU64,
    pub violations: AtomicU64,
    pub largest_snapshot: AtomicUsize,
}

impl Counters {
    /// Creates a new counters instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished snapshot of `entries` entries.
    pub fn add_snapshot(&self, entries: usize) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
        self.largest_snapshot.fetch_max(entries, Ordering::Relaxed);
    }

    /// Adds `n` invariant violations.
    pub fn add_violations(&self, n: u64) {
        if n > 0 {
            self.violations.fetch_add(n, Ordering::Relaxed);
        }
    }
}
