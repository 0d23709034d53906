//! Index inference (§4.3.4): for each partner, look up (or append) an index
//! on the parameter positions already bound at the point of matching.

use crate::ast::Expression;
use crate::catalog::Catalog;
use crate::program::OccurrenceRule;
use std::collections::HashSet;

/// Sets `use_index` on every partner of `occ`. With `enabled = false`,
/// every partner gets `None` (the `-1` sentinel of §4.3.4) and no index is
/// ever appended — matching the `constraint_store_index` CLI knob turned off.
pub fn infer(occ: &mut OccurrenceRule, catalog: &mut Catalog, enabled: bool) {
    let mut bound: HashSet<String> = occ.active.call.args.iter().flat_map(Expression::logical_vars).collect();

    for partner in &mut occ.partners {
        if !enabled {
            partner.use_index = None;
            bound.extend(partner.call.args.iter().flat_map(Expression::logical_vars));
            continue;
        }

        let bound_positions: Vec<usize> = partner
            .call
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| is_bound(a, &bound))
            .map(|(i, _)| i)
            .collect();

        partner.use_index = if bound_positions.is_empty() {
            None
        } else {
            let decl = catalog.get_mut(partner.constraint);
            Some(decl.intern_index(bound_positions))
        };

        bound.extend(partner.call.args.iter().flat_map(Expression::logical_vars));
    }
}

fn is_bound(expr: &Expression, bound: &HashSet<String>) -> bool {
    match expr {
        Expression::Literal { .. } => true,
        Expression::LogicalVar { name, .. } => bound.contains(name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{builders::ExprBuilder, ConstraintCall, PragmaSet};
    use crate::catalog::{ConstraintDecl, Mode, Parameter};
    use crate::position::Position;
    use crate::program::{HeadRef, RuleId};

    fn param() -> Parameter {
        Parameter {
            mode: Mode::Ground,
            type_text: "int".into(),
        }
    }

    #[test]
    fn both_args_bound_by_active_yields_index_on_both_positions() {
        let mut catalog = Catalog::new();
        let edge = catalog
            .declare(ConstraintDecl::new("edge", vec![param(), param()], vec![]))
            .unwrap();
        let e = ExprBuilder::at(Position::synthetic());

        let mut occ = OccurrenceRule {
            rule: RuleId(0),
            active: HeadRef {
                keep: true,
                use_index: None,
                constraint: edge,
                call: ConstraintCall {
                    constraint: "edge".into(),
                    args: vec![e.logical_var("X"), e.logical_var("Y")],
                    pragmas: PragmaSet::new(),
                    position: Position::synthetic(),
                },
            },
            partners: vec![HeadRef {
                keep: false,
                use_index: None,
                constraint: edge,
                call: ConstraintCall {
                    constraint: "edge".into(),
                    args: vec![e.logical_var("X"), e.logical_var("Y")],
                    pragmas: PragmaSet::new(),
                    position: Position::synthetic(),
                },
            }],
            guard_parts: vec![vec![], vec![]],
            store_active_constraint: false,
            active_constraint_occurrence: 0,
        };

        infer(&mut occ, &mut catalog, true);
        assert_eq!(occ.partners[0].use_index, Some(0));
        assert_eq!(catalog.get(edge).indexes(), &[vec![0, 1]]);

        // Second pass over the same (already-indexed) program must not
        // append a duplicate.
        infer(&mut occ, &mut catalog, true);
        assert_eq!(catalog.get(edge).indexes().len(), 1);
    }

    #[test]
    fn disabled_option_never_assigns_an_index() {
        let mut catalog = Catalog::new();
        let edge = catalog
            .declare(ConstraintDecl::new("edge", vec![param()], vec![]))
            .unwrap();
        let e = ExprBuilder::at(Position::synthetic());
        let mut occ = OccurrenceRule {
            rule: RuleId(0),
            active: HeadRef {
                keep: true,
                use_index: None,
                constraint: edge,
                call: ConstraintCall {
                    constraint: "edge".into(),
                    args: vec![e.logical_var("X")],
                    pragmas: PragmaSet::new(),
                    position: Position::synthetic(),
                },
            },
            partners: vec![HeadRef {
                keep: false,
                use_index: None,
                constraint: edge,
                call: ConstraintCall {
                    constraint: "edge".into(),
                    args: vec![e.logical_var("X")],
                    pragmas: PragmaSet::new(),
                    position: Position::synthetic(),
                },
            }],
            guard_parts: vec![vec![], vec![]],
            store_active_constraint: false,
            active_constraint_occurrence: 0,
        };
        infer(&mut occ, &mut catalog, false);
        assert_eq!(occ.partners[0].use_index, None);
        assert!(catalog.get(edge).indexes().is_empty());
    }
}
