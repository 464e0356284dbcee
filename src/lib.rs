//! Element Table Cache
//!
//! A thread-safe, in-memory, two-level cache of tabular datasets fetched from
//! remote monitored elements. Each dataset is addressed by an owning system
//! id, an element id scoped to that system, and a parameter (table) id scoped
//! to that element.
//!
//! # Architecture
//!
//! ```text
//! caller ─▶ TableCache::get_table(system, element, parameter)
//!               │
//!               ├─▶ ElementCache (created on demand, tracks last activity)
//!               │       └─▶ Arc<Slot> (created empty on demand)
//!               │
//!               └── element sweep (bounded caches only) evicts idle elements
//! ```
//!
//! The cache never fetches anything. It hands out a shared slot, empty on
//! first access, and the caller populates it.
//!
//! # Example
//!
//! ```
//! use element_table_cache::{CacheSlot, TableCache, TableSlot};
//!
//! let cache: TableCache<TableSlot<Vec<String>>> = TableCache::new();
//!
//! let slot = cache.get_table(1, 42, 1000);
//! assert!(!slot.is_populated());
//! slot.get_or_init(|| vec!["row 1".to_string()]);
//!
//! assert!(cache.get_table(1, 42, 1000).is_populated());
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Top-level cache, element sub-caches, slots and the sweep
//! - [`error`] - Error types

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheSlot, CacheStats, ElementCache, ElementKey, TableCache, TableCacheConfig, TableSlot,
    MAX_SWEEP_INTERVAL, MIN_STALENESS,
};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
