//! Element Sub-Cache
//!
//! Holds every parameter table slot of a single monitored element, plus the
//! moment any of them was last looked up. Expiry is tracked here, per element:
//! touching one parameter keeps all of the element's slots alive.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use tracing::trace;

use super::metrics::CacheMetrics;
use super::slot::CacheSlot;

/// Per-element map of parameter id to slot
pub struct ElementCache<S> {
    /// Parameter id -> slot
    slots: DashMap<i32, Arc<S>>,
    /// Last lookup, UTC epoch milliseconds. Never moves backwards.
    last_activity_ms: AtomicI64,
    /// Shared with the owning top-level cache
    metrics: Arc<CacheMetrics>,
}

impl<S: CacheSlot> ElementCache<S> {
    /// Create an empty sub-cache, marked active now
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(CacheMetrics::new()))
    }

    pub(crate) fn with_metrics(metrics: Arc<CacheMetrics>) -> Self {
        Self {
            slots: DashMap::new(),
            last_activity_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            metrics,
        }
    }

    /// Get the slot for a parameter, creating an empty one on first access
    ///
    /// Every call refreshes the element's activity timestamp. All callers
    /// asking for the same parameter receive the same slot instance.
    pub fn get_table(&self, parameter_id: i32) -> Arc<S> {
        self.touch();

        if let Some(slot) = self.slots.get(&parameter_id) {
            return Arc::clone(slot.value());
        }

        // Insert-if-absent under the shard lock; a racing caller that got
        // here first leaves an occupied entry and we return its slot.
        let slot = self.slots.entry(parameter_id).or_insert_with(|| {
            self.metrics.record_slot_created();
            trace!(parameter_id, "Created table slot");
            Arc::new(S::default())
        });
        Arc::clone(slot.value())
    }

    /// Mark the element as active now
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    pub(crate) fn touch_at(&self, at: DateTime<Utc>) {
        self.last_activity_ms
            .fetch_max(at.timestamp_millis(), Ordering::AcqRel);
    }

    /// Most recent lookup of any parameter under this element
    pub fn last_activity(&self) -> DateTime<Utc> {
        let ms = self.last_activity_ms.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// True when `last_activity + staleness` is strictly earlier than `now`
    pub fn is_stale(&self, staleness: Duration, now: DateTime<Utc>) -> bool {
        let last = self.last_activity_ms.load(Ordering::Acquire);
        let window = i64::try_from(staleness.as_millis()).unwrap_or(i64::MAX);
        last.saturating_add(window) < now.timestamp_millis()
    }

    /// Whether a slot exists for the parameter (does not refresh activity)
    pub fn contains(&self, parameter_id: i32) -> bool {
        self.slots.contains_key(&parameter_id)
    }

    /// Parameter ids with a slot (does not refresh activity)
    pub fn parameter_ids(&self) -> Vec<i32> {
        self.slots.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no slot has been created yet
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<S: CacheSlot> Default for ElementCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for ElementCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementCache")
            .field("slots", &self.slots.len())
            .field(
                "last_activity_ms",
                &self.last_activity_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
