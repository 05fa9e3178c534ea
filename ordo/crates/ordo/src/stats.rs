//! Stats Module - Raw Buffer Accounting
//!
//! Process-wide counters for the buffer operations of every accessor whose
//! limits have `stats_enabled`. The counters are themselves [`AtomicCell`]s,
//! so reading them never blocks a thread that is allocating.
//!
//! Metrics:
//! - Allocations, resizes and frees
//! - Bytes requested (allocate + resize targets)
//! - Refused requests

use crate::atomic::AtomicCell;
use serde::Serialize;

/// Buffer operation counters
#[derive(Debug, Default)]
pub struct BufferStats {
    allocations: AtomicCell<i64>,
    resizes: AtomicCell<i64>,
    frees: AtomicCell<i64>,
    bytes_requested: AtomicCell<i64>,
    failures: AtomicCell<i64>,
}

/// Counters shared by every accessor
pub static BUFFER_STATS: BufferStats = BufferStats::new();

impl BufferStats {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicCell::new(0),
            resizes: AtomicCell::new(0),
            frees: AtomicCell::new(0),
            bytes_requested: AtomicCell::new(0),
            failures: AtomicCell::new(0),
        }
    }

    /// Process-wide counters
    pub fn global() -> &'static BufferStats {
        &BUFFER_STATS
    }

    pub fn record_allocation(&self, bytes: usize) {
        self.allocations.increment_and_get();
        self.bytes_requested.add_and_get(bytes as i64);
    }

    pub fn record_resize(&self, bytes: usize) {
        self.resizes.increment_and_get();
        self.bytes_requested.add_and_get(bytes as i64);
    }

    pub fn record_free(&self) {
        self.frees.increment_and_get();
    }

    pub fn record_failure(&self) {
        self.failures.increment_and_get();
    }

    /// Allocations not yet matched by a free
    pub fn live_buffers(&self) -> i64 {
        self.allocations.get() - self.frees.get()
    }

    /// Point-in-time copy of every counter
    ///
    /// Counters are read one at a time, so a snapshot taken while other
    /// threads allocate is not a consistent cut.
    pub fn snapshot(&self) -> BufferStatsSnapshot {
        BufferStatsSnapshot {
            allocations: self.allocations.get(),
            resizes: self.resizes.get(),
            frees: self.frees.get(),
            bytes_requested: self.bytes_requested.get(),
            failures: self.failures.get(),
        }
    }

    /// Snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.allocations.set(0);
        self.resizes.set(0);
        self.frees.set(0);
        self.bytes_requested.set(0);
        self.failures.set(0);
    }
}

/// Serialisable copy of [`BufferStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BufferStatsSnapshot {
    pub allocations: i64,
    pub resizes: i64,
    pub frees: i64,
    pub bytes_requested: i64,
    pub failures: i64,
}

impl BufferStatsSnapshot {
    /// Counter deltas since `earlier`
    pub fn since(&self, earlier: &BufferStatsSnapshot) -> BufferStatsSnapshot {
        BufferStatsSnapshot {
            allocations: self.allocations - earlier.allocations,
            resizes: self.resizes - earlier.resizes,
            frees: self.frees - earlier.frees,
            bytes_requested: self.bytes_requested - earlier.bytes_requested,
            failures: self.failures - earlier.failures,
        }
    }
}
