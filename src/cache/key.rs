//! Composite Element Key
//!
//! Identifies a monitored element by its owning system and its element id
//! within that system.

use std::fmt;

/// Composite (system, element) key
///
/// Used directly as the top-level map key. Equality and hashing cover both
/// halves, so pairs that differ only in sign can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey {
    system_id: i32,
    element_id: i32,
}

impl ElementKey {
    /// Create a new element key
    #[inline]
    pub const fn new(system_id: i32, element_id: i32) -> Self {
        Self {
            system_id,
            element_id,
        }
    }

    /// Owning system id
    #[inline]
    pub const fn system_id(&self) -> i32 {
        self.system_id
    }

    /// Element id within the owning system
    #[inline]
    pub const fn element_id(&self) -> i32 {
        self.element_id
    }

    /// Pack into a single 64-bit value: system id in the high half,
    /// element id in the low half.
    ///
    /// Both halves go through `u32` first so a negative element id does not
    /// sign-extend over the system half.
    #[inline]
    pub const fn packed(&self) -> u64 {
        ((self.system_id as u32 as u64) << 32) | (self.element_id as u32 as u64)
    }

    /// Inverse of [`ElementKey::packed`]
    #[inline]
    pub const fn unpack(packed: u64) -> Self {
        Self {
            system_id: (packed >> 32) as u32 as i32,
            element_id: packed as u32 as i32,
        }
    }
}

impl From<(i32, i32)> for ElementKey {
    fn from((system_id, element_id): (i32, i32)) -> Self {
        Self::new(system_id, element_id)
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.system_id, self.element_id)
    }
}

// =============================================================================
// Tests
// =============================================================================
