//! Cache Slot
//!
//! The cache never looks inside a slot. It only creates empty ones and hands
//! out shared references; whoever holds a reference decides how and when the
//! slot gets populated.

use once_cell::sync::OnceCell;

/// A box that starts empty and may later hold a computed table
pub trait CacheSlot: Default + Send + Sync + 'static {
    /// Whether the slot currently holds a computed value
    fn is_populated(&self) -> bool;
}

/// Write-once slot for a cached table
///
/// Concurrent callers racing to populate the same slot are serialized by the
/// underlying [`OnceCell`]; exactly one initializer wins.
#[derive(Debug)]
pub struct TableSlot<T> {
    cell: OnceCell<T>,
}

impl<T> TableSlot<T> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Get the cached value, if populated
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Populate the slot. Returns the value back if it was already populated.
    pub fn set(&self, value: T) -> std::result::Result<(), T> {
        self.cell.set(value)
    }

    /// Get the cached value, computing it on first access
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(f)
    }

    /// Get the cached value, computing it with a fallible fetch on first access
    ///
    /// A failed fetch leaves the slot empty so a later caller can retry.
    pub fn get_or_try_init<F, E>(&self, f: F) -> std::result::Result<&T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.cell.get_or_try_init(f)
    }
}

impl<T> Default for TableSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> CacheSlot for TableSlot<T> {
    fn is_populated(&self) -> bool {
        self.cell.get().is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
