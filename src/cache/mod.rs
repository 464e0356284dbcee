//! Two-Level Element Table Cache
//!
//! Keeps parameter tables fetched from remote monitored elements so callers
//! only fetch each table once while it is in use.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                            TableCache                                    │
//! │   DashMap<ElementKey(system, element), Arc<ElementCache>>                │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  ElementCache (1/2)         │  ElementCache (1/3)        │  ...            │
//! │  ┌──────────────────────┐   │  ┌──────────────────────┐  │                 │
//! │  │ param -> Arc<Slot>   │   │  │ param -> Arc<Slot>   │  │                 │
//! │  │ last_activity (UTC)  │   │  │ last_activity (UTC)  │  │                 │
//! │  └──────────────────────┘   │  └──────────────────────┘  │                 │
//! │                              │                            │                 │
//! │               Element sweep (every staleness / 2)                         │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - Get-or-create on both levels via atomic insert-if-absent
//! - Expiry is per element: any parameter lookup keeps the whole element alive
//! - Slots are opaque; the cache only guarantees one instance per key

mod element;
mod key;
mod manager;
mod metrics;
mod slot;
mod sweeper;

#[cfg(test)]
mod proptest;

use std::time::Duration;

pub use element::ElementCache;
pub use key::ElementKey;
pub use manager::{TableCache, TableCacheConfig};
pub use metrics::{CacheMetrics, CacheStats};
pub use slot::{CacheSlot, TableSlot};

/// Smallest accepted staleness window for a bounded cache
pub const MIN_STALENESS: Duration = Duration::from_millis(250);

/// Longest sweep period; keeps very large windows clear of `Instant` overflow
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
