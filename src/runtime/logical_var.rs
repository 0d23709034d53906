//! Logical variables: union-find unification with per-variable rollback
//! and observer wake-up (§5 "Union-find on logical variables", §6.3, §9
//! "Cyclic references in the runtime").
//!
//! Grounded on `original_source/runtime/logical_var.hpp`: two separate
//! observer sets (index-update callbacks vs. constraint-wake-up callbacks),
//! drained index-updates-first (§5 "Index-update callbacks are higher
//! priority"), each created through a rollback point the way
//! `ra_schedule` does in the original.

use crate::runtime::backtrack::Depth;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

/// A value a logical variable may hold once ground.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unground,
    Ground(String),
    /// Mutable-mode value, compared by address per §4.4.1; modeled as an
    /// opaque token rather than an actual pointer.
    Mutable(usize),
}

/// Invoked when a variable's root changes (union) or becomes ground.
/// Observers are held weakly so a dropped constraint store or dead
/// constraint activation does not keep a variable pinned (§9).
pub trait VarObserver: Send + Sync {
    fn notify(&self, var: VarId);
}

struct SnapshotEntry {
    depth: Depth,
    old_root: VarId,
    old_value: Value,
}

struct VarNode {
    root: VarId,
    value: Value,
    rank: u32,
    snapshots: Vec<SnapshotEntry>,
    index_observers: Vec<Weak<dyn VarObserver>>,
    constraint_observers: Vec<Weak<dyn VarObserver>>,
}

/// Owns every logical variable in one program instance. Not shared across
/// `Engine`s (§5).
pub struct VarStore {
    nodes: Vec<VarNode>,
}

impl VarStore {
    pub fn new() -> Self {
        VarStore { nodes: Vec::new() }
    }

    pub fn fresh(&mut self) -> VarId {
        let id = VarId(self.nodes.len());
        self.nodes.push(VarNode {
            root: id,
            value: Value::Unground,
            rank: 0,
            snapshots: Vec::new(),
            index_observers: Vec::new(),
            constraint_observers: Vec::new(),
        });
        id
    }

    /// Path-compressing find. Compression itself is not recorded for
    /// rewind (§5: "path compression on read"); only the union step that
    /// changes a root is.
    pub fn find(&mut self, id: VarId) -> VarId {
        let root = self.nodes[id.0].root;
        if root == id {
            return id;
        }
        let real_root = self.find(root);
        self.nodes[id.0].root = real_root;
        real_root
    }

    pub fn value(&mut self, id: VarId) -> Value {
        let root = self.find(id);
        self.nodes[root.0].value.clone()
    }

    pub fn is_ground(&mut self, id: VarId) -> bool {
        matches!(self.value(id), Value::Ground(_) | Value::Mutable(_))
    }

    pub fn register_index_observer(&mut self, id: VarId, depth: Depth, obs: Weak<dyn VarObserver>) {
        let root = self.find(id);
        self.record_snapshot(root, depth);
        self.nodes[root.0].index_observers.push(obs);
    }

    pub fn register_constraint_observer(&mut self, id: VarId, depth: Depth, obs: Weak<dyn VarObserver>) {
        let root = self.find(id);
        self.record_snapshot(root, depth);
        self.nodes[root.0].constraint_observers.push(obs);
    }

    fn record_snapshot(&mut self, root: VarId, depth: Depth) {
        let node = &mut self.nodes[root.0];
        if node.snapshots.last().map(|s| s.depth) != Some(depth) {
            node.snapshots.push(SnapshotEntry {
                depth,
                old_root: node.root,
                old_value: node.value.clone(),
            });
        }
    }

    /// Unifies `a` and `b` (§6.3 `%=` contract): (ground, ground) succeeds
    /// iff equal; (ground, mutable) fails; (unground, *) unions and
    /// succeeds; mutable-to-mutable succeeds iff same root. On success,
    /// drains index-update observers of the absorbed root first, then
    /// constraint-wake-up observers (§5).
    pub fn unify(&mut self, depth: Depth, a: VarId, b: VarId) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return true;
        }

        let va = self.nodes[ra.0].value.clone();
        let vb = self.nodes[rb.0].value.clone();

        let ok = match (&va, &vb) {
            (Value::Ground(x), Value::Ground(y)) => x == y,
            (Value::Ground(_), Value::Mutable(_)) | (Value::Mutable(_), Value::Ground(_)) => false,
            (Value::Mutable(x), Value::Mutable(y)) => x == y,
            _ => true,
        };
        if !ok {
            return false;
        }

        self.record_snapshot(ra, depth);
        self.record_snapshot(rb, depth);

        let (winner, loser) = if self.nodes[ra.0].rank >= self.nodes[rb.0].rank {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.nodes[loser.0].root = winner;
        if self.nodes[ra.0].rank == self.nodes[rb.0].rank {
            self.nodes[winner.0].rank += 1;
        }
        if matches!(self.nodes[winner.0].value, Value::Unground) {
            if let Value::Ground(_) | Value::Mutable(_) = &self.nodes[loser.0].value {
                self.nodes[winner.0].value = self.nodes[loser.0].value.clone();
            }
        }

        self.wake_up(loser);
        true
    }

    fn wake_up(&mut self, id: VarId) {
        let index_obs = std::mem::take(&mut self.nodes[id.0].index_observers);
        for weak in &index_obs {
            if let Some(obs) = weak.upgrade() {
                obs.notify(id);
            }
        }
        let constraint_obs = std::mem::take(&mut self.nodes[id.0].constraint_observers);
        for weak in &constraint_obs {
            if let Some(obs) = weak.upgrade() {
                obs.notify(id);
            }
        }
    }

    /// Rewinds every variable's union-find and value state to what it was
    /// before `target` (§5 "the old root was recorded in a per-variable
    /// snapshot so that rewind restores the pre-union structure").
    pub fn rewind(&mut self, target: Depth) {
        for node in &mut self.nodes {
            while let Some(top) = node.snapshots.last() {
                if top.depth <= target {
                    break;
                }
                let entry = node.snapshots.pop().unwrap();
                node.root = entry.old_root;
                node.value = entry.old_value;
            }
        }
    }
}

impl Default for VarStore {
    fn default() -> Self {
        VarStore::new()
    }
}
