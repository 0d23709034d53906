//! Reordering optimizations (§4.3), all cost-model driven and all
//! individually toggleable via [`crate::config::Config`].

pub mod guard_reorder;
pub mod head_reorder;
pub mod index_inference;
pub mod occurrence_reorder;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::program::OccurrenceRule;

/// Runs the enabled subset of §4.3 over every occurrence rule of a program,
/// in the order the specification implies: head reorder (and the guard
/// re-split it triggers) first, then guard-part reorder within each part,
/// then occurrence reorder across occurrences of the same symbol, then
/// index inference last (it needs the final partner order to know what is
/// bound at each point).
pub fn run(occurrences: &mut Vec<OccurrenceRule>, catalog: &mut Catalog, config: &Config) {
    for occ in occurrences.iter_mut() {
        if config.head_reorder {
            head_reorder::reorder(occ);
        }
        if config.guard_reorder {
            guard_reorder::reorder(occ);
        }
    }
    if config.occurrences_reorder {
        occurrence_reorder::reorder(occurrences);
    }
    for occ in occurrences.iter_mut() {
        index_inference::infer(occ, catalog, config.constraint_store_index);
    }
}
