//! Occurrence reorder (§4.3.3): across occurrences of the same constraint
//! symbol, passive occurrences sort last; everything else keeps its
//! original order. The keep-before-delete preference §4.3.3 mentions is
//! gated behind an option that §6.2 never names as a CLI knob, so it is
//! never enabled here — original order is the tie-break, as the
//! specification allows ("else original order").

use crate::ast::Pragma;
use crate::program::OccurrenceRule;
use std::collections::HashMap;

fn is_passive(occ: &OccurrenceRule) -> bool {
    occ.active.call.pragmas.contains(Pragma::Passive)
}

/// Reorders `occurrences` in place and reassigns `active_constraint_occurrence`
/// to the stable post-reorder numbering, per constraint symbol (§4.2(3),
/// §4.3.3 "the occurrence number ... is the post-reorder number").
pub fn reorder(occurrences: &mut [OccurrenceRule]) {
    occurrences.sort_by_key(is_passive);

    let mut counters: HashMap<String, usize> = HashMap::new();
    for occ in occurrences.iter_mut() {
        let name = occ.active.call.constraint.clone();
        let counter = counters.entry(name).or_insert(0);
        occ.active_constraint_occurrence = *counter;
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{builders::ExprBuilder, ConstraintCall, PragmaSet};
    use crate::catalog::ConstraintId;
    use crate::position::Position;
    use crate::program::{HeadRef, RuleId};

    fn occ(constraint: &str, passive: bool) -> OccurrenceRule {
        let e = ExprBuilder::at(Position::synthetic());
        let mut pragmas = PragmaSet::new();
        if passive {
            pragmas.insert(Pragma::Passive);
        }
        OccurrenceRule {
            rule: RuleId(0),
            active: HeadRef {
                keep: true,
                use_index: None,
                constraint: ConstraintId(0),
                call: ConstraintCall {
                    constraint: constraint.into(),
                    args: vec![e.logical_var("X")],
                    pragmas,
                    position: Position::synthetic(),
                },
            },
            partners: vec![],
            guard_parts: vec![vec![]],
            store_active_constraint: true,
            active_constraint_occurrence: 0,
        }
    }

    #[test]
    fn passive_occurrence_sorts_last() {
        let mut occs = vec![occ("a", true), occ("a", false)];
        reorder(&mut occs);
        assert!(!occs[0].active.call.pragmas.contains(Pragma::Passive));
        assert!(occs[1].active.call.pragmas.contains(Pragma::Passive));
        assert_eq!(occs[0].active_constraint_occurrence, 0);
        assert_eq!(occs[1].active_constraint_occurrence, 1);
    }
}
