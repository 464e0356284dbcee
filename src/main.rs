//! Element Table Cache soak harness
//!
//! Simulates a pool of pollers fetching parameter tables from many monitored
//! elements through a shared [`TableCache`], then reports cache statistics.
//!
//! ```text
//! ┌────────────┐   get_table   ┌──────────────┐   miss   ┌─────────────────┐
//! │  Pollers   │──────────────▶│  TableCache  │─────────▶│ synthetic fetch │
//! │ (threads)  │               │  + sweep     │          │                 │
//! └────────────┘               └──────────────┘          └─────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use element_table_cache::error::{Error, Result};
use element_table_cache::{TableCache, TableCacheConfig, TableSlot};

/// Rows of a parameter table
type Table = Vec<Vec<String>>;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Element Table Cache - concurrent soak of the two-level table cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Evict elements idle for this many milliseconds (0 = never evict)
    #[arg(long, env = "CACHE_STALENESS_MS", default_value = "2000")]
    staleness_ms: u64,

    /// Number of poller threads
    #[arg(long, env = "POLLER_THREADS", default_value = "4")]
    pollers: usize,

    /// Number of systems
    #[arg(long, env = "SYSTEMS", default_value = "2")]
    systems: i32,

    /// Elements per system
    #[arg(long, env = "ELEMENTS_PER_SYSTEM", default_value = "50")]
    elements: i32,

    /// Parameter tables per element
    #[arg(long, env = "TABLES_PER_ELEMENT", default_value = "5")]
    tables: i32,

    /// Elements per system kept hot by the pollers; the rest are touched once
    #[arg(long, env = "HOT_ELEMENTS", default_value = "10")]
    hot_elements: i32,

    /// Delay between poll rounds in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "100")]
    poll_interval_ms: u64,

    /// How long to run in seconds
    #[arg(long, env = "RUN_SECONDS", default_value = "5")]
    run_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn cache_config(&self) -> TableCacheConfig {
        match self.staleness_ms {
            0 => TableCacheConfig::unbounded(),
            ms => TableCacheConfig::bounded(Duration::from_millis(ms)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pollers == 0 {
            return Err(Error::Config("at least one poller is required".into()));
        }
        if self.systems <= 0 || self.elements <= 0 || self.tables <= 0 {
            return Err(Error::Config(
                "systems, elements and tables must be positive".into(),
            ));
        }
        if self.hot_elements < 0 || self.hot_elements > self.elements {
            return Err(Error::Config(format!(
                "hot elements must be between 0 and {}",
                self.elements
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);
    args.validate()?;

    info!("Starting element table cache soak");
    info!("  Staleness: {} ms (0 = unbounded)", args.staleness_ms);
    info!("  Pollers: {}", args.pollers);
    info!(
        "  Keyspace: {} systems x {} elements x {} tables",
        args.systems, args.elements, args.tables
    );
    info!("  Hot elements per system: {}", args.hot_elements);

    let cache: Arc<TableCache<TableSlot<Table>>> =
        Arc::new(TableCache::with_config(args.cache_config()).map_err(|e| {
            error!("Failed to create cache: {}", e);
            e
        })?);
    let fetches = Arc::new(AtomicU64::new(0));

    let deadline = Instant::now() + Duration::from_secs(args.run_seconds);
    let mut pollers = Vec::with_capacity(args.pollers);

    for poller in 0..args.pollers {
        let cache = Arc::clone(&cache);
        let fetches = Arc::clone(&fetches);
        let spec = PollSpec::from(&args);
        pollers.push(tokio::task::spawn_blocking(move || {
            poll_until(poller, &cache, &fetches, &spec, deadline)
        }));
    }

    for poller in pollers {
        if let Err(e) = poller.await {
            error!("Poller failed: {}", e);
        }
    }

    let stats = cache.stats();
    info!(
        elements = stats.elements,
        slots = stats.slots,
        lookups = stats.lookups,
        fetches = fetches.load(Ordering::Relaxed),
        evicted = stats.elements_evicted,
        "Soak complete"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    cache.shutdown();
    info!("Cache shutdown complete");

    Ok(())
}

// =============================================================================
// Poller
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct PollSpec {
    systems: i32,
    elements: i32,
    tables: i32,
    hot_elements: i32,
    interval: Duration,
}

impl From<&Args> for PollSpec {
    fn from(args: &Args) -> Self {
        Self {
            systems: args.systems,
            elements: args.elements,
            tables: args.tables,
            hot_elements: args.hot_elements,
            interval: Duration::from_millis(args.poll_interval_ms),
        }
    }
}

/// Poll every table once, then keep polling only the hot elements
fn poll_until(
    poller: usize,
    cache: &TableCache<TableSlot<Table>>,
    fetches: &AtomicU64,
    spec: &PollSpec,
    deadline: Instant,
) {
    let mut round = 0u64;

    while Instant::now() < deadline {
        let elements = if round == 0 {
            spec.elements
        } else {
            spec.hot_elements
        };

        for system in 1..=spec.systems {
            for element in 1..=elements {
                for table in 1..=spec.tables {
                    let slot = cache.get_table(system, element, table);
                    slot.get_or_init(|| {
                        fetches.fetch_add(1, Ordering::Relaxed);
                        fetch_table(system, element, table)
                    });
                }
            }
        }

        debug!(poller, round, resident = cache.len(), "Poll round complete");
        round += 1;
        std::thread::sleep(spec.interval);
    }
}

/// Stand-in for an expensive remote table read
fn fetch_table(system: i32, element: i32, table: i32) -> Table {
    (0..8)
        .map(|row| {
            vec![
                format!("{}/{}", system, element),
                table.to_string(),
                row.to_string(),
            ]
        })
        .collect()
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
