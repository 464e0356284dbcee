//! Element Sweep - Background Staleness Eviction
//!
//! Periodically scans the top-level map and drops every element sub-cache
//! whose last lookup is older than the configured staleness window.
//!
//! # Scheduling
//!
//! The sweep is a tokio task driven by a current-thread runtime on a
//! dedicated `element-sweep` thread. Caller threads and caller runtimes never
//! run it, so eviction proceeds even while every caller is blocked.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::element::ElementCache;
use super::key::ElementKey;
use super::metrics::CacheMetrics;
use super::slot::CacheSlot;
use crate::error::Result;

/// Top-level map shared between the cache and its sweep
pub(crate) type ElementMap<S> = DashMap<ElementKey, Arc<ElementCache<S>>>;

/// Remove every element whose last activity plus `staleness` is before `now`
///
/// Each removal happens under the owning shard's write lock, so a concurrent
/// lookup either sees the element before it goes or recreates it afterwards.
#[instrument(skip(elements, metrics), fields(elements = elements.len()))]
pub(crate) fn sweep_expired<S: CacheSlot>(
    elements: &ElementMap<S>,
    staleness: Duration,
    now: DateTime<Utc>,
    metrics: &CacheMetrics,
) -> usize {
    let mut evicted = 0;

    elements.retain(|key, element| {
        if element.is_stale(staleness, now) {
            debug!(
                element = %key,
                slots = element.len(),
                last_activity = %element.last_activity(),
                "Evicting stale element"
            );
            evicted += 1;
            false
        } else {
            true
        }
    });

    metrics.record_sweep(evicted);
    if evicted > 0 {
        debug!(evicted, remaining = elements.len(), "Sweep complete");
    }

    evicted
}

/// Handle to a running sweep
pub(crate) struct Sweeper {
    token: CancellationToken,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl Sweeper {
    /// Start sweeping `elements` every `period`, first pass after one period
    ///
    /// The sweep always gets its own thread and runtime, so it keeps running
    /// regardless of what the caller's threads or runtimes are doing.
    pub(crate) fn start<S: CacheSlot>(
        elements: Weak<ElementMap<S>>,
        metrics: Arc<CacheMetrics>,
        staleness: Duration,
        period: Duration,
    ) -> Result<Self> {
        let token = CancellationToken::new();
        let sweep = run(elements, metrics, staleness, period, token.clone());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let thread = std::thread::Builder::new()
            .name("element-sweep".to_string())
            .spawn(move || runtime.block_on(sweep))?;

        Ok(Self {
            token,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Whether the sweep thread is alive and has not been told to stop
    pub(crate) fn is_running(&self) -> bool {
        !self.token.is_cancelled()
            && self
                .thread
                .lock()
                .as_ref()
                .is_some_and(|thread| !thread.is_finished())
    }

    /// Stop the sweep and join its thread. Idempotent.
    pub(crate) fn stop(&self) {
        self.token.cancel();

        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if thread.join().is_err() {
            warn!("Element sweep thread panicked");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S: CacheSlot>(
    elements: Weak<ElementMap<S>>,
    metrics: Arc<CacheMetrics>,
    staleness: Duration,
    period: Duration,
    token: CancellationToken,
) {
    info!(?staleness, ?period, "Starting element sweep");

    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Element sweep shutting down");
                break;
            }

            _ = tick.tick() => {
                let Some(elements) = elements.upgrade() else {
                    debug!("Element map dropped, stopping sweep");
                    break;
                };
                sweep_expired(&elements, staleness, Utc::now(), &metrics);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
