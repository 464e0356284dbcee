//! Table Cache - Top-Level Element Cache
//!
//! Maps (system, element) pairs to per-element sub-caches, creating them on
//! first lookup. A bounded cache also owns a background sweep that drops
//! sub-caches nobody has looked at within the staleness window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::element::ElementCache;
use super::key::ElementKey;
use super::metrics::{CacheMetrics, CacheStats};
use super::slot::CacheSlot;
use super::sweeper::{sweep_expired, ElementMap, Sweeper};
use super::{MAX_SWEEP_INTERVAL, MIN_STALENESS};
use crate::error::{Error, Result};

/// Table cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCacheConfig {
    /// Inactivity window after which an element is evicted (None = never)
    pub staleness: Option<Duration>,
}

impl TableCacheConfig {
    /// Configuration with no expiry and no sweep
    pub fn unbounded() -> Self {
        Self { staleness: None }
    }

    /// Configuration evicting elements idle for longer than `staleness`
    pub fn bounded(staleness: Duration) -> Self {
        Self {
            staleness: Some(staleness),
        }
    }

    /// Reject staleness windows below [`MIN_STALENESS`]
    pub fn validate(&self) -> Result<()> {
        match self.staleness {
            Some(requested) if requested < MIN_STALENESS => Err(Error::StalenessOutOfRange {
                requested,
                minimum: MIN_STALENESS,
            }),
            _ => Ok(()),
        }
    }

    /// Sweep period: half the staleness window, truncated to whole
    /// milliseconds and capped at [`MAX_SWEEP_INTERVAL`]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.staleness.map(|staleness| {
            let half_ms = u64::try_from(staleness.as_millis() / 2).unwrap_or(u64::MAX);
            Duration::from_millis(half_ms).min(MAX_SWEEP_INTERVAL)
        })
    }
}

/// Two-level cache of parameter table slots keyed by monitored element
///
/// Lookups never fail and never block on another caller. For any given
/// (system, element, parameter) every concurrent caller receives the same
/// slot instance for as long as the element stays resident.
pub struct TableCache<S: CacheSlot> {
    /// Element key -> element sub-cache
    elements: Arc<ElementMap<S>>,
    /// Configuration
    config: TableCacheConfig,
    /// Metrics collector, shared with sub-caches and the sweep
    metrics: Arc<CacheMetrics>,
    /// Background sweep (bounded caches only)
    sweeper: Option<Sweeper>,
}

impl<S: CacheSlot> TableCache<S> {
    /// Create a cache whose elements live as long as the cache does
    pub fn new() -> Self {
        Self {
            elements: Arc::new(DashMap::new()),
            config: TableCacheConfig::unbounded(),
            metrics: Arc::new(CacheMetrics::new()),
            sweeper: None,
        }
    }

    /// Create a cache that evicts elements idle for longer than `staleness`
    ///
    /// Fails with [`Error::StalenessOutOfRange`] below 250ms.
    pub fn with_staleness(staleness: Duration) -> Result<Self> {
        Self::with_config(TableCacheConfig::bounded(staleness))
    }

    /// Create a cache from configuration
    pub fn with_config(config: TableCacheConfig) -> Result<Self> {
        config.validate()?;

        let elements: Arc<ElementMap<S>> = Arc::new(DashMap::new());
        let metrics = Arc::new(CacheMetrics::new());

        let sweeper = match (config.staleness, config.sweep_interval()) {
            (Some(staleness), Some(period)) => Some(Sweeper::start(
                Arc::downgrade(&elements),
                Arc::clone(&metrics),
                staleness,
                period,
            )?),
            _ => None,
        };

        Ok(Self {
            elements,
            config,
            metrics,
            sweeper,
        })
    }

    /// Get the slot for a parameter table of an element
    ///
    /// Creates the element sub-cache and/or the slot on first access, and
    /// marks the element as active.
    pub fn get_table(&self, system_id: i32, element_id: i32, parameter_id: i32) -> Arc<S> {
        self.metrics.record_lookup();
        self.element_for(ElementKey::new(system_id, element_id))
            .get_table(parameter_id)
    }

    /// Resolve the sub-cache for a key, inserting a new one if absent
    fn element_for(&self, key: ElementKey) -> Arc<ElementCache<S>> {
        if let Some(element) = self.elements.get(&key) {
            return Arc::clone(element.value());
        }

        let element = self.elements.entry(key).or_insert_with(|| {
            self.metrics.record_element_created();
            debug!(element = %key, "Created element cache");
            Arc::new(ElementCache::with_metrics(Arc::clone(&self.metrics)))
        });
        Arc::clone(element.value())
    }

    /// Peek at a resident element without creating or refreshing it
    pub fn element(&self, system_id: i32, element_id: i32) -> Option<Arc<ElementCache<S>>> {
        self.elements
            .get(&ElementKey::new(system_id, element_id))
            .map(|element| Arc::clone(element.value()))
    }

    /// Run one sweep pass now. Returns the number of evicted elements.
    ///
    /// Always 0 for an unbounded cache.
    pub fn sweep_now(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        match self.config.staleness {
            Some(staleness) => sweep_expired(&self.elements, staleness, now, &self.metrics),
            None => 0,
        }
    }

    /// Stop the background sweep, if any
    ///
    /// Safe to call repeatedly. Resident elements and slots already handed
    /// out are left untouched.
    pub fn shutdown(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
    }

    /// Whether a background sweep is currently running
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(Sweeper::is_running)
    }

    /// Configured staleness window
    pub fn staleness(&self) -> Option<Duration> {
        self.config.staleness
    }

    /// Configured sweep period
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.config.sweep_interval()
    }

    /// Get configuration
    pub fn config(&self) -> &TableCacheConfig {
        &self.config
    }

    /// Number of resident elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if no element is resident
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let slots = self
            .elements
            .iter()
            .map(|element| element.value().len())
            .sum();
        self.metrics.snapshot(self.elements.len(), slots)
    }
}

impl<S: CacheSlot> Default for TableCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CacheSlot> Drop for TableCache<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: CacheSlot> std::fmt::Debug for TableCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableCache")
            .field("elements", &self.elements.len())
            .field("config", &self.config)
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::slot::TableSlot;
    use assert_matches::assert_matches;

    type Slot = TableSlot<Vec<Vec<String>>>;

    #[test]
    fn test_table_cache_creation() {
        let cache: TableCache<Slot> = TableCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.staleness(), None);
        assert_eq!(cache.sweep_interval(), None);
        assert!(!cache.is_sweeping());
    }

    #[test]
    fn test_config_validation() {
        assert!(TableCacheConfig::unbounded().validate().is_ok());
        assert!(TableCacheConfig::bounded(Duration::from_millis(250))
            .validate()
            .is_ok());
        assert_matches!(
            TableCacheConfig::bounded(Duration::from_millis(249)).validate(),
            Err(Error::StalenessOutOfRange { requested, minimum })
                if requested == Duration::from_millis(249) && minimum == MIN_STALENESS
        );
    }

    #[test]
    fn test_sweep_interval_truncates() {
        let config = TableCacheConfig::bounded(Duration::from_micros(250_999));
        assert_eq!(config.sweep_interval(), Some(Duration::from_millis(125)));

        let config = TableCacheConfig::bounded(Duration::from_millis(1001));
        assert_eq!(config.sweep_interval(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_sweep_interval_capped_for_huge_windows() {
        for staleness in [Duration::MAX, Duration::from_secs(1 << 63)] {
            let config = TableCacheConfig::bounded(staleness);
            assert!(config.validate().is_ok());
            assert_eq!(config.sweep_interval(), Some(MAX_SWEEP_INTERVAL));
        }
    }

    #[test]
    fn test_huge_window_keeps_sweep_alive() {
        for staleness in [Duration::MAX, Duration::from_secs(1 << 63)] {
            let cache: TableCache<Slot> = TableCache::with_staleness(staleness).unwrap();
            let slot = cache.get_table(1, 1, 1);

            std::thread::sleep(Duration::from_millis(50));
            assert!(cache.is_sweeping());
            assert_eq!(cache.sweep_now(), 0);
            assert!(Arc::ptr_eq(&slot, &cache.get_table(1, 1, 1)));

            cache.shutdown();
            assert!(!cache.is_sweeping());
        }
    }

    #[test]
    fn test_bounded_rejects_short_window() {
        let result: Result<TableCache<Slot>> = TableCache::with_staleness(Duration::from_millis(100));
        assert_matches!(result, Err(Error::StalenessOutOfRange { .. }));
    }

    #[test]
    fn test_bounded_accepts_minimum() {
        let cache: TableCache<Slot> = TableCache::with_staleness(MIN_STALENESS).unwrap();
        assert!(cache.is_sweeping());
        assert_eq!(cache.sweep_interval(), Some(Duration::from_millis(125)));
        cache.shutdown();
        assert!(!cache.is_sweeping());
    }

    #[test]
    fn test_get_table_same_instance() {
        let cache: TableCache<Slot> = TableCache::new();

        let a = cache.get_table(1, 2, 3);
        let b = cache.get_table(1, 2, 3);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_table_distinguishes_keys() {
        let cache: TableCache<Slot> = TableCache::new();

        let base = cache.get_table(1, 2, 3);
        assert!(!Arc::ptr_eq(&base, &cache.get_table(2, 1, 3)));
        assert!(!Arc::ptr_eq(&base, &cache.get_table(1, -2, 3)));
        assert!(!Arc::ptr_eq(&base, &cache.get_table(-1, 2, 3)));
        assert!(!Arc::ptr_eq(&base, &cache.get_table(1, 2, 4)));

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.element(1, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_element_peek_does_not_create() {
        let cache: TableCache<Slot> = TableCache::new();
        assert!(cache.element(5, 5).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unbounded_sweep_is_noop() {
        let cache: TableCache<Slot> = TableCache::new();
        cache.get_table(1, 1, 1);

        let far_future = Utc::now() + chrono::Duration::days(365);
        assert_eq!(cache.sweep_at(far_future), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_replaces_stale_element() {
        let cache: TableCache<Slot> = TableCache::with_staleness(Duration::from_secs(60)).unwrap();
        cache.shutdown();

        let old = cache.get_table(1, 1, 1);
        old.set(vec![vec!["cached".to_string()]]).unwrap();

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(cache.sweep_at(later), 1);
        assert!(cache.is_empty());

        let fresh = cache.get_table(1, 1, 1);
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(!fresh.is_populated());
        // Slot handed out before eviction is still usable
        assert!(old.is_populated());
    }

    #[test]
    fn test_sibling_parameter_keeps_element_alive() {
        let cache: TableCache<Slot> = TableCache::with_staleness(Duration::from_secs(60)).unwrap();
        cache.shutdown();

        let a = cache.get_table(1, 1, 10);
        let element = cache.element(1, 1).unwrap();

        let later = Utc::now() + chrono::Duration::seconds(50);
        element.touch_at(later);

        let sweep_time = later + chrono::Duration::seconds(30);
        assert_eq!(cache.sweep_at(sweep_time), 0);
        assert!(Arc::ptr_eq(&a, &cache.get_table(1, 1, 10)));
    }

    #[test]
    fn test_stats() {
        let cache: TableCache<Slot> = TableCache::new();
        cache.get_table(1, 1, 1);
        cache.get_table(1, 1, 2);
        cache.get_table(1, 2, 1);
        cache.get_table(1, 1, 1);

        let stats = cache.stats();
        assert_eq!(stats.elements, 2);
        assert_eq!(stats.slots, 3);
        assert_eq!(stats.lookups, 4);
        assert_eq!(stats.elements_created, 2);
        assert_eq!(stats.slots_created, 3);
        assert_eq!(stats.elements_evicted, 0);
    }

    #[test]
    fn test_shutdown_idempotent() {
        let cache: TableCache<Slot> = TableCache::with_staleness(Duration::from_millis(500)).unwrap();
        let slot = cache.get_table(1, 1, 1);

        cache.shutdown();
        cache.shutdown();

        assert!(Arc::ptr_eq(&slot, &cache.get_table(1, 1, 1)));

        let unbounded: TableCache<Slot> = TableCache::new();
        unbounded.shutdown();
        unbounded.shutdown();
    }

    #[test]
    fn test_debug_output() {
        let cache: TableCache<Slot> = TableCache::new();
        cache.get_table(1, 1, 1);
        let debug = format!("{:?}", cache);
        assert!(debug.contains("elements: 1"));
        assert!(debug.contains("sweeping: false"));
    }
}
