//! Constraint stores (§2 "Runtime: constraint stores", §6.3, §4.4.2).
//!
//! Built directly on [`crate::runtime::bt_list::BtList`] the way the
//! specification's §9 "Arena + indices" note asks: a simple store is just
//! a `BtList`; an indexed store additionally partitions live slots into
//! hash buckets keyed by xxHash of the bound argument positions an
//! occurrence's `use_index` names (§4.3.4). The partitioning key itself is
//! computed by the emitted host code (it knows the argument types); the
//! store only ever sees the resulting `u64`.

use crate::runtime::backtrack::Depth;
use crate::runtime::bt_list::{BtList, SlotId};
use crate::runtime::support::xxhash64;
use std::collections::HashMap;

pub type Cid = u64;

/// One constraint currently asserted in a store: its runtime id (§3.4
/// "Constraint ids assigned at runtime are unique ... and monotonically
/// increasing") plus the host-opaque argument tuple.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub cid: Cid,
    pub args: T,
}

/// A per-symbol backtrackable collection of currently-asserted constraints,
/// optionally partitioned by one or more indexes (§4.3.4).
pub struct Store<T> {
    list: BtList<Entry<T>>,
    partitions: Vec<HashMap<u64, Vec<SlotId>>>,
}

impl<T> Store<T> {
    /// `index_count` must equal the final length of the owning
    /// declaration's `indexes()` once index inference has run (§3.4
    /// "frozen once lowering begins").
    pub fn new(index_count: usize) -> Self {
        Store {
            list: BtList::new(),
            partitions: (0..index_count).map(|_| HashMap::new()).collect(),
        }
    }

    /// `index_keys[i]` is the xxHash of the argument values at the
    /// positions named by index `i`; the caller (emitted host code)
    /// computes it since only it knows the argument types. `add(tuple) ->
    /// iterator` of §6.3.
    pub fn add(&mut self, cid: Cid, args: T, depth: Depth, index_keys: &[u64]) -> SlotId {
        let id = self.list.add(Entry { cid, args }, depth);
        for (partition, key) in self.partitions.iter_mut().zip(index_keys) {
            partition.entry(*key).or_default().push(id);
        }
        id
    }

    pub fn size(&self) -> usize {
        self.list.size()
    }

    pub fn empty(&self) -> bool {
        self.list.empty()
    }

    /// `chr_count(constraint)` (§11 supplement): live cardinality, no
    /// index involved.
    pub fn count(&self) -> usize {
        self.list.size()
    }

    /// `chr_count<index>(constraint)`: live cardinality restricted to one
    /// indexed bucket.
    pub fn count_indexed(&self, index: usize, key: u64) -> usize {
        self.partitions[index]
            .get(&key)
            .map(|ids| ids.iter().filter(|id| self.list.get(**id).is_some()).count())
            .unwrap_or(0)
    }

    pub fn get(&self, id: SlotId) -> Option<&Entry<T>> {
        self.list.get(id)
    }

    pub fn lock(&mut self, id: SlotId) {
        self.list.lock(id);
    }

    pub fn unlock(&mut self, id: SlotId) {
        self.list.unlock(id);
    }

    pub fn kill(&mut self, id: SlotId) {
        self.list.kill(id);
    }

    /// `begin()` (§6.3): an iterator over every live slot.
    pub fn begin(&self) -> StoreIter {
        StoreIter {
            ids: self.list.iter().collect(),
            pos: 0,
        }
    }

    /// `begin_indexed(index_n, key) -> iterator` (§6.3): an iterator over
    /// only the live slots in the named bucket.
    pub fn begin_indexed(&self, index: usize, key: u64) -> StoreIter {
        let ids = self
            .partitions
            .get(index)
            .and_then(|p| p.get(&key))
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.list.get(*id).is_some())
            .collect();
        StoreIter { ids, pos: 0 }
    }

    /// Rewinds the underlying list and drops any partition entries that no
    /// longer point at a live slot (lazily filtered on read otherwise, but
    /// swept here too so a long-lived bucket does not grow unboundedly
    /// across many backtracks).
    pub fn rewind(&mut self, target: Depth) {
        self.list.rewind(target);
        for partition in &mut self.partitions {
            for ids in partition.values_mut() {
                ids.retain(|id| self.list.get(*id).is_some());
            }
        }
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Store::new(0)
    }
}

/// A snapshot-based iterator over a [`Store`]'s slots (§4.4.2). Unlike the
/// original's live linked-list traversal, this holds the set of candidate
/// ids taken at `begin`/`begin_indexed` time — sound under the
/// single-threaded cooperative scheduling model (§5), since nothing else
/// runs between a `next` and the matching step that follows it.
pub struct StoreIter {
    ids: Vec<SlotId>,
    pos: usize,
}

impl StoreIter {
    pub fn at_end(&self) -> bool {
        self.pos >= self.ids.len()
    }

    pub fn valid<T>(&self, store: &Store<T>) -> bool {
        !self.at_end() && store.get(self.ids[self.pos]).is_some()
    }

    pub fn current(&self) -> Option<SlotId> {
        self.ids.get(self.pos).copied()
    }

    /// Pins the current slot so a concurrent removal only tombstones it
    /// (§4.4.2 "locking pins the underlying slot").
    pub fn lock<T>(&self, store: &mut Store<T>) {
        if let Some(id) = self.current() {
            store.lock(id);
        }
    }

    pub fn unlock<T>(&mut self, store: &mut Store<T>) {
        if let Some(id) = self.current() {
            store.unlock(id);
        }
    }

    /// Advances past the current slot and unlocks it in one step — the
    /// common exit used by every matching step that moves on without
    /// removing the partner (§4.4.3's "advances the innermost partner
    /// iterator").
    pub fn next_and_unlock<T>(&mut self, store: &mut Store<T>) {
        self.unlock(store);
        self.pos += 1;
    }

    /// Marks the current slot for removal (§4.4.2, composes with
    /// `unlock`/`next_and_unlock` on the caller's chosen exit path).
    pub fn kill<T>(&self, store: &mut Store<T>) {
        if let Some(id) = self.current() {
            store.kill(id);
        }
    }
}

/// Convenience for emitted code computing an indexed-store key from a
/// fixed-order tuple of already-bound argument values (§4.3.4): hash the
/// textual representation of each value in position order.
pub fn index_key(values: &[&str]) -> u64 {
    xxhash64(&values.join("\u{1}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_indexed_returns_only_matching_bucket() {
        let mut store: Store<&'static str> = Store::new(1);
        let key_a = index_key(&["1"]);
        let key_b = index_key(&["2"]);
        store.add(1, "edge(1,2)", Depth(0), &[key_a]);
        store.add(2, "edge(2,3)", Depth(0), &[key_b]);

        let iter = store.begin_indexed(0, key_a);
        assert_eq!(iter.ids.len(), 1);
        assert_eq!(store.get(iter.ids[0]).unwrap().cid, 1);
    }

    #[test]
    fn killed_slot_drops_out_of_future_indexed_iteration() {
        let mut store: Store<&'static str> = Store::new(1);
        let key = index_key(&["1"]);
        let id = store.add(1, "edge(1,2)", Depth(0), &[key]);
        store.kill(id);
        let iter = store.begin_indexed(0, key);
        assert!(iter.ids.is_empty());
    }

    #[test]
    fn count_indexed_matches_live_members_of_bucket() {
        let mut store: Store<&'static str> = Store::new(1);
        let key = index_key(&["1"]);
        let a = store.add(1, "edge(1,2)", Depth(0), &[key]);
        store.add(2, "edge(1,3)", Depth(0), &[key]);
        assert_eq!(store.count_indexed(0, key), 2);
        store.kill(a);
        assert_eq!(store.count_indexed(0, key), 1);
    }

    #[test]
    fn rewind_past_insertion_depth_empties_the_store() {
        let mut store: Store<&'static str> = Store::new(0);
        store.add(1, "edge(1,2)", Depth(1), &[]);
        store.rewind(Depth(0));
        assert!(store.empty());
    }
}
