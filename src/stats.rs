//! Engine counters.
//!
//! All counters use relaxed atomics; a snapshot is approximate while requests
//! are in flight.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the façade, the workers and the sweeper.
#[derive(Debug, Default)]
pub struct EngineCounters {
    sets: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
    dropped: AtomicU64,
}

impl EngineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot. `keys` comes from the store since it is not a counter.
    pub fn snapshot(&self, keys: usize) -> EngineStats {
        EngineStats {
            keys: keys as u64,
            sets: self.sets.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Live keys in the store
    pub keys: u64,
    /// Set requests executed by workers
    pub sets: u64,
    /// Get requests executed by workers
    pub gets: u64,
    /// Delete requests executed by workers
    pub deletes: u64,
    /// Keys removed by the sweeper
    pub evictions: u64,
    /// Requests refused at admission
    pub rejected: u64,
    /// Calls that returned a cancellation error to their caller
    pub cancelled: u64,
    /// Requests a worker discarded because they were already cancelled
    pub dropped: u64,
}
