//! Keyed list reconciliation
//!
//! Plans the transition from a looper's previous keys to its current keys:
//!
//! 1. `removed = prev - current`
//! 2. `added = current - prev`
//! 3. `kept = current & prev`, with the number of kept items that must move
//!
//! Moves are counted against the longest increasing subsequence of the kept
//! items' previous positions: items on that subsequence stay put, every
//! other kept item moves once.
//!
//! # Complexity
//!
//! - Time: O(n log n)
//! - Space: O(n)

use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

/// One entry of the new item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Planned {
    /// Index of the item in the current iterable
    pub item: usize,
    /// Index in the previous item list, `None` for an added item
    pub prev: Option<usize>,
}

/// Statistics of one reconcile pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
    /// Kept items whose relative order changed
    pub moved: usize,
    /// Kept items whose value changed and were patched
    pub updated: usize,
    pub kept: usize,
}

impl ReconcileStats {
    /// Total number of structural edits (not counting keeps)
    pub fn edit_count(&self) -> usize {
        self.added + self.removed + self.moved
    }

    /// Check if the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.edit_count() == 0 && self.updated == 0
    }
}

impl std::ops::AddAssign for ReconcileStats {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.moved += other.moved;
        self.updated += other.updated;
        self.kept += other.kept;
    }
}

/// Reconcile plan from previous to current keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    /// New item list in order
    pub items: Vec<Planned>,
    /// Previous indices to discard, ascending
    pub removed: Vec<usize>,
    pub stats: ReconcileStats,
}

impl Plan {
    /// Whether kept items changed relative order.
    pub fn order_changed(&self) -> bool {
        self.stats.moved > 0
    }
}

/// Plan the transition from `prev` to `next`.
///
/// When `next` repeats a key, the last occurrence wins and earlier ones are
/// dropped. `prev` is assumed duplicate-free (it is a previous plan's
/// output).
pub fn plan<K: Eq + Hash>(prev: &[K], next: &[K]) -> Plan {
    let mut last: FxHashMap<&K, usize> = FxHashMap::default();
    for (i, key) in next.iter().enumerate() {
        last.insert(key, i);
    }

    let prev_index: FxHashMap<&K, usize> = prev.iter().enumerate().map(|(i, k)| (k, i)).collect();

    let items: Vec<Planned> = next
        .iter()
        .enumerate()
        .filter(|(i, key)| last.get(key) == Some(i))
        .map(|(item, key)| Planned {
            item,
            prev: prev_index.get(key).copied(),
        })
        .collect();

    let current: FxHashSet<&K> = last.keys().copied().collect();
    let removed: Vec<usize> = prev
        .iter()
        .enumerate()
        .filter(|(_, key)| !current.contains(key))
        .map(|(i, _)| i)
        .collect();

    let kept: Vec<usize> = items.iter().filter_map(|p| p.prev).collect();
    let stable = lis_len(&kept);

    let stats = ReconcileStats {
        added: items.len() - kept.len(),
        removed: removed.len(),
        moved: kept.len() - stable,
        updated: 0,
        kept: kept.len(),
    };

    Plan { items, removed, stats }
}

/// Length of the longest strictly increasing subsequence.
fn lis_len(seq: &[usize]) -> usize {
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    for &x in seq {
        match tails.binary_search(&x) {
            Ok(_) => {}
            Err(pos) if pos == tails.len() => tails.push(x),
            Err(pos) => tails[pos] = x,
        }
    }
    tails.len()
}
