//! Runtime support utilities: statistics, trace stringification, and the
//! shared xxHash helper (§2 "Runtime: support", §11 supplement).
//!
//! Grounded on `original_source/runtime/statistics.hh` (per-component
//! counters) and `runtime/utils.hpp`'s `CHR_XXHash`/TIW stringification
//! helpers, reshaped — like every other runtime component here — from
//! process-wide state into something a [`crate::runtime::Engine`] owns.

use std::sync::atomic::{AtomicU64, Ordering};
use twox_hash::XxHash64;

/// Hashes any [`std::hash::Hash`] value with xxHash rather than the
/// default `SipHash`, for the history and indexed-store partitions
/// (§11 "xxHash-based hashing").
pub fn xxhash64<H: std::hash::Hash>(value: &H) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = XxHash64::with_seed(0);
    value.hash(&mut hasher);
    hasher.finish()
}

/// Per-program-instance counters (§11 "Per-rule and per-program
/// statistics"). Exposed read-only to emitted code and tests; every
/// increment happens through the named methods rather than direct field
/// mutation so call sites read like the runtime API they are.
#[derive(Debug, Default)]
pub struct Statistics {
    rule_firings: AtomicU64,
    rule_failures: AtomicU64,
    peak_backtrack_depth: AtomicU64,
    variable_high_water: AtomicU64,
    history_high_water: AtomicU64,
    store_high_water: AtomicU64,
}

impl Statistics {
    pub fn record_firing(&self) {
        self.rule_firings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.rule_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_depth(&self, depth: u64) {
        self.peak_backtrack_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn observe_variable_count(&self, count: u64) {
        self.variable_high_water.fetch_max(count, Ordering::Relaxed);
    }

    pub fn observe_history_size(&self, size: u64) {
        self.history_high_water.fetch_max(size, Ordering::Relaxed);
    }

    pub fn observe_store_size(&self, size: u64) {
        self.store_high_water.fetch_max(size, Ordering::Relaxed);
    }

    pub fn rule_firings(&self) -> u64 {
        self.rule_firings.load(Ordering::Relaxed)
    }

    pub fn rule_failures(&self) -> u64 {
        self.rule_failures.load(Ordering::Relaxed)
    }

    pub fn peak_backtrack_depth(&self) -> u64 {
        self.peak_backtrack_depth.load(Ordering::Relaxed)
    }

    pub fn variable_high_water(&self) -> u64 {
        self.variable_high_water.load(Ordering::Relaxed)
    }

    pub fn history_high_water(&self) -> u64 {
        self.history_high_water.load(Ordering::Relaxed)
    }

    pub fn store_high_water(&self) -> u64 {
        self.store_high_water.load(Ordering::Relaxed)
    }
}

/// TIW ("textual intermediate world") stringification (§11): the runtime's
/// own `to_string` family for printing constraint tuples and variable
/// values in trace output, independent of any `Debug`/`Display` impl a
/// host value type happens to carry.
pub trait ToTrace {
    fn to_trace(&self) -> String;
}

impl ToTrace for crate::runtime::logical_var::Value {
    fn to_trace(&self) -> String {
        match self {
            crate::runtime::logical_var::Value::Unground => "_".to_string(),
            crate::runtime::logical_var::Value::Ground(text) => text.clone(),
            crate::runtime::logical_var::Value::Mutable(token) => format!("<mutable@{token:#x}>"),
        }
    }
}

impl ToTrace for crate::runtime::history::Tuple {
    fn to_trace(&self) -> String {
        let parts: Vec<String> = self.iter().map(|cid| cid.to_string()).collect();
        format!("({})", parts.join(","))
    }
}
