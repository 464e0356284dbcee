//! Cache Metrics Collection
//!
//! Lightweight counters for monitoring cache activity and sweep behaviour.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    lookups: AtomicU64,
    elements_created: AtomicU64,
    slots_created: AtomicU64,
    elements_evicted: AtomicU64,
    sweeps: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_element_created(&self) {
        self.elements_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slot_created(&self) {
        self.slots_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, evicted: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.elements_evicted
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn elements_created(&self) -> u64 {
        self.elements_created.load(Ordering::Relaxed)
    }

    pub fn slots_created(&self) -> u64 {
        self.slots_created.load(Ordering::Relaxed)
    }

    pub fn elements_evicted(&self) -> u64 {
        self.elements_evicted.load(Ordering::Relaxed)
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Take a point-in-time snapshot, combined with the live map sizes
    pub fn snapshot(&self, elements: usize, slots: usize) -> CacheStats {
        CacheStats {
            elements,
            slots,
            lookups: self.lookups(),
            elements_created: self.elements_created(),
            slots_created: self.slots_created(),
            elements_evicted: self.elements_evicted(),
            sweeps: self.sweeps(),
            taken_at: Utc::now(),
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Elements currently resident
    pub elements: usize,
    /// Slots currently resident across all elements
    pub slots: usize,
    /// Total get_table calls
    pub lookups: u64,
    /// Element sub-caches created (including re-creations after eviction)
    pub elements_created: u64,
    /// Slots created
    pub slots_created: u64,
    /// Element sub-caches removed by the sweep
    pub elements_evicted: u64,
    /// Completed sweep passes
    pub sweeps: u64,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}
