//! Backtrack manager (§4.4.5, §6.3, §9 "Global mutable state").
//!
//! Grounded on `original_source/runtime/backtrack.hh`'s `Depth_t` counter,
//! `ES_CHR` status, and weak-observer wake-up list — reshaped from a
//! process-wide singleton into state owned by one [`crate::runtime::Engine`]
//! per program instance.

use crate::diagnostics::ExecStatus;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Monotonically increasing backtrack depth. Depth 0 is the top level;
/// each `;`-sequence alternative opens one more depth than its enclosing
/// scope (§4.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Depth(pub u64);

impl Depth {
    pub fn next(self) -> Depth {
        Depth(self.0 + 1)
    }
}

/// Implemented by every runtime component that must undo state on rewind
/// (history, logical variable, backtrackable list). `rewind` returns
/// `false` to ask the manager to drop this observer from the wake-up list
/// — used once an observer has nothing left to roll back to, mirroring
/// `Backtrack_observer::rewind` in the original.
pub trait BacktrackObserver: Send + Sync {
    fn rewind(&self, target: Depth) -> bool;
}

/// Owns the current depth, the process-wide (per-`Engine`) failure flag,
/// and the weak-reference observer list `back_to` drains on rewind.
pub struct BacktrackManager {
    depth: Depth,
    failed: bool,
    observers: Mutex<Vec<Weak<dyn BacktrackObserver>>>,
}

impl BacktrackManager {
    pub fn new() -> Self {
        BacktrackManager {
            depth: Depth(0),
            failed: false,
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn inc_depth(&mut self) -> Depth {
        self.depth = self.depth.next();
        self.depth
    }

    /// Registers `observer` for future rewinds. Expired weak references are
    /// pruned lazily at the next `back_to` rather than eagerly here.
    pub fn register(&self, observer: Weak<dyn BacktrackObserver>) {
        self.observers.lock().push(observer);
    }

    /// Rewinds every live observer whose recorded depth exceeds `target`,
    /// then sets the manager's own depth to `target`. Order across
    /// observers is unspecified (§6.3); atomic w.r.t. rule firing because
    /// the emitted engine is single-threaded cooperative (§5).
    pub fn back_to(&mut self, target: Depth) {
        let mut observers = self.observers.lock();
        observers.retain(|weak| match weak.upgrade() {
            Some(obs) => obs.rewind(target),
            None => false,
        });
        self.depth = target;
    }

    /// Sets the failure flag and returns `ExecStatus::Failure`, the value
    /// emitted matching steps propagate by return (§6.3, §7).
    pub fn failure(&mut self) -> ExecStatus {
        self.failed = true;
        ExecStatus::Failure
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Clears the failure flag; called between alternatives of a
    /// `;`-sequence after rewinding (§6.3).
    pub fn reset(&mut self) {
        self.failed = false;
    }
}

impl Default for BacktrackManager {
    fn default() -> Self {
        BacktrackManager::new()
    }
}
