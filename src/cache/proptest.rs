//! Property-Based Tests for the Element Table Cache
//!
//! # Test Properties
//!
//! 1. **Key Injectivity**: distinct (system, element) pairs never share a packed key
//! 2. **Packing Inverse**: unpack(packed(k)) = k
//! 3. **Singleton per Key**: repeated lookups return the identical slot

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;

use super::key::ElementKey;
use super::manager::TableCache;
use super::slot::TableSlot;

/// Strategy biased towards the sign boundary where naive packing collides
fn id_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![
        any::<i32>(),
        Just(0),
        Just(-1),
        Just(1),
        Just(i32::MIN),
        Just(i32::MAX),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Property: distinct pairs pack to distinct keys.
    #[test]
    fn prop_packing_injective(
        s1 in id_strategy(),
        e1 in id_strategy(),
        s2 in id_strategy(),
        e2 in id_strategy(),
    ) {
        let a = ElementKey::new(s1, e1);
        let b = ElementKey::new(s2, e2);
        prop_assert_eq!(a == b, a.packed() == b.packed());
    }

    /// Property: packing round-trips.
    #[test]
    fn prop_unpack_inverts_pack(s in any::<i32>(), e in any::<i32>()) {
        let key = ElementKey::new(s, e);
        prop_assert_eq!(ElementKey::unpack(key.packed()), key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: every lookup of a key returns the first slot created for it.
    #[test]
    fn prop_slot_identity_per_key(
        lookups in prop::collection::vec((-3i32..3, -3i32..3, -3i32..3), 1..200),
    ) {
        let cache: TableCache<TableSlot<u8>> = TableCache::new();
        let mut first_seen = std::collections::HashMap::new();

        for (s, e, p) in lookups {
            let slot = cache.get_table(s, e, p);
            let first = first_seen.entry((s, e, p)).or_insert_with(|| Arc::clone(&slot));
            prop_assert!(Arc::ptr_eq(first, &slot));
        }

        let elements: std::collections::HashSet<_> =
            first_seen.keys().map(|(s, e, _)| (*s, *e)).collect();
        prop_assert_eq!(cache.len(), elements.len());
        prop_assert_eq!(cache.stats().slots, first_seen.len());
    }
}
