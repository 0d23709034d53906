//! Propagation history (§4.4.4).
//!
//! Grounded on `original_source/runtime/history.hh`: a static, insert-only
//! `History<N>` for rules that never need to roll back (there are none in
//! this model, since every propagation rule that keeps a history runs
//! under backtracking) and a `History_dyn<N>`-style variant that tracks,
//! per depth, which tuples were inserted, so `rewind` can undo exactly the
//! ones inserted beyond the target depth — mirroring the original's
//! `Linked_snapshot` / `_values_to_remove` bookkeeping. We only need the
//! dynamic variant since the emitted engine is always under a
//! [`crate::runtime::backtrack::BacktrackManager`].

use crate::runtime::backtrack::Depth;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;
use twox_hash::XxHash64;

type Cid = u64;
/// A sorted tuple of constraint ids — one slot per head constraint whose
/// position does not carry `no_history` (§4.4.4).
pub type Tuple = Vec<Cid>;

/// xxHash rather than `SipHash` for the `seen` set's buckets (§11
/// "xxHash-based hashing for history/index keys").
type TupleHasher = BuildHasherDefault<XxHash64>;

/// One propagation rule's fired-tuple set, with per-depth rollback.
#[derive(Default)]
pub struct History {
    seen: HashSet<Tuple, TupleHasher>,
    /// Tuples inserted at each depth, so `rewind` knows exactly what to
    /// erase (the original's `Linked_snapshot` list, flattened to a map
    /// since we do not need its lock-free append discipline in a
    /// single-threaded cooperative engine, §5).
    inserted_at: HashMap<Depth, Vec<Tuple>>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Inserts `tuple` if absent and returns `true`; returns `false` if the
    /// tuple was already present, meaning the rule must not fire again for
    /// this combination (§6.3, §8 "History correctness").
    pub fn check(&mut self, depth: Depth, tuple: Tuple) -> bool {
        let mut sorted = tuple;
        sorted.sort_unstable();
        if self.seen.contains(&sorted) {
            return false;
        }
        self.inserted_at.entry(depth).or_default().push(sorted.clone());
        self.seen.insert(sorted);
        true
    }

    /// Undoes every insertion recorded at a depth beyond `target`.
    pub fn rewind(&mut self, target: Depth) {
        let stale_depths: Vec<Depth> = self.inserted_at.keys().copied().filter(|d| *d > target).collect();
        for depth in stale_depths {
            if let Some(tuples) = self.inserted_at.remove(&depth) {
                for t in tuples {
                    self.seen.remove(&t);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
