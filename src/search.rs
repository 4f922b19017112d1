//! Ordered-slice helpers shared across the crate.
//!
//! The memtable does not own its search algorithm; it depends on the exact
//! tie-break of [`upper_bound`] to resolve duplicate-key reads to the
//! last-inserted record after a stable sort.

use std::cmp::Ordering;

/// First index in `records` whose key is strictly greater than `key`.
///
/// `records` must be sorted non-decreasing by `key_of`. With duplicate keys
/// the returned index is one past the last duplicate, so `index - 1` names
/// the record that was inserted most recently (stable sort preserves
/// insertion order among equals).
pub fn upper_bound<V, K, F>(records: &[V], key: K, key_of: F) -> usize
where
    K: Ord,
    F: Fn(&V) -> K,
{
    records.partition_point(|record| key_of(record) <= key)
}

/// True iff `records` is non-decreasing by `key_of`.
///
/// Linear scan; used by debug assertions and tests, never on a hot path.
pub fn is_sorted_by_key<V, K, F>(records: &[V], key_of: F) -> bool
where
    K: Ord,
    F: Fn(&V) -> K,
{
    records
        .windows(2)
        .all(|pair| key_of(&pair[0]).cmp(&key_of(&pair[1])) != Ordering::Greater)
}
