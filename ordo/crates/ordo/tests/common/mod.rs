//! Test Utilities for the Ordo Integration Suite
//!
//! Shared fixtures: a capability acquired from a private gate, thread-count
//! selection and a barrier-synchronised spawner so racing threads really do
//! start together.

#![allow(dead_code)]

use ordo::capability::{CallerIdentity, Capability, CapabilityGate};
use ordo::memory::MemoryAccessor;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Barrier};
use std::thread;

/// ============================================================================
/// RAW LAYER FIXTURE
/// ============================================================================

/// Trusted capability for tests that drive the raw layer directly
pub struct RawFixture {
    pub gate: CapabilityGate,
    pub capability: Capability,
}

impl RawFixture {
    /// Fixture holding a platform-domain capability
    pub fn new() -> Self {
        let gate = CapabilityGate::new();
        let capability = gate
            .acquire(&CallerIdentity::platform("ordo-tests"))
            .expect("platform callers are always trusted");
        Self { gate, capability }
    }

    /// Accessor with no barrier and default limits
    pub fn mem(&self) -> MemoryAccessor<'_> {
        MemoryAccessor::new(&self.capability)
    }
}

/// ============================================================================
/// THREADING HELPERS
/// ============================================================================

/// Thread count for contention tests: every core, at least 2, at most 16
pub fn thread_count() -> usize {
    num_cpus::get().clamp(2, 16)
}

/// Run `work(thread_index)` on `threads` threads released together
///
/// Returns each thread's result in index order.
pub fn run_concurrently<T, F>(threads: usize, work: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                work(i)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("worker thread should not panic"))
        .collect()
}

/// ============================================================================
/// ASSERTIONS
/// ============================================================================

/// Assert no value appears twice
pub fn assert_all_unique<T: Eq + Hash + std::fmt::Debug>(values: &[T]) {
    let mut seen = HashSet::new();
    for v in values {
        assert!(seen.insert(v), "duplicate value {:?}", v);
    }
}
