//! The runtime contracts emitted code links against (§6.3).
//!
//! Unlike the C++ original's process-wide `Backtrack_t<T>` singleton, every
//! runtime component here is owned by an explicit [`Engine`], one per
//! program instance (§5 "Shared-resource policy", §9 "Global mutable
//! state"). Emitted code threads `&mut Engine` through every call instead
//! of reaching for statics.

pub mod backtrack;
pub mod bt_list;
pub mod history;
pub mod logical_var;
pub mod store;
pub mod support;

use backtrack::BacktrackManager;
use support::Statistics;

/// Owns one CHR program instance's runtime state. Constraint stores,
/// histories, and variable arenas are *not* shared across `Engine`s (§5).
pub struct Engine {
    pub backtrack: BacktrackManager,
    pub stats: Statistics,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            backtrack: BacktrackManager::new(),
            stats: Statistics::default(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
