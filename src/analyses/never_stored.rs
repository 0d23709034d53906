//! Never-stored analysis (§4.1.3).
//!
//! A constraint is never-stored iff every head occurrence of it is in a
//! delete-head and none carries `passive`. Flagging it lets the host
//! lowering skip `STORE_ACTIVE` entirely for that symbol (§8 "Never-stored
//! closure").

use crate::ast::Pragma;
use crate::catalog::Catalog;
use crate::program::Program;

/// Runs the analysis and sets `never_stored` on every qualifying
/// declaration in `catalog`. Must run before [`crate::occurrence`] expansion
/// so `store_active_constraint` can read the flag (§4.1.4).
pub fn run(program: &Program, catalog: &mut Catalog) {
    let names: Vec<String> = catalog.iter().map(|(_, d)| d.name.clone()).collect();
    for name in names {
        let id = catalog.lookup(&name).expect("just listed");
        let mut ever_kept = false;
        let mut ever_passive_occurrence = false;
        for rule in &program.rules {
            for call in &rule.keep_head {
                if call.constraint == name {
                    ever_kept = true;
                    if call.pragmas.contains(Pragma::Passive) {
                        ever_passive_occurrence = true;
                    }
                }
            }
            for call in &rule.delete_head {
                if call.constraint == name && call.pragmas.contains(Pragma::Passive) {
                    ever_passive_occurrence = true;
                }
            }
        }
        let decl = catalog.get_mut(id);
        decl.never_stored = !ever_kept && !ever_passive_occurrence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Body, ConstraintCall, PragmaSet};
    use crate::catalog::{ConstraintDecl, Mode, Parameter};
    use crate::position::Position;
    use crate::program::{Rule, RuleId};

    fn param() -> Parameter {
        Parameter {
            mode: Mode::Any,
            type_text: "int".into(),
        }
    }

    fn call(name: &str) -> ConstraintCall {
        ConstraintCall {
            constraint: name.into(),
            args: vec![],
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        }
    }

    #[test]
    fn constraint_only_ever_deleted_is_never_stored() {
        let mut catalog = Catalog::new();
        catalog.declare(ConstraintDecl::new("a", vec![param()], vec![])).unwrap();
        catalog.declare(ConstraintDecl::new("b", vec![param()], vec![])).unwrap();

        let mut program = Program::new("P", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![],
            delete_head: vec![call("a")],
            guard: vec![],
            body: Body::ChrCall(call("b")),
            position: Position::synthetic(),
        });

        run(&program, &mut catalog);
        assert!(catalog.get(catalog.lookup("a").unwrap()).never_stored);
    }

    #[test]
    fn constraint_ever_kept_is_stored() {
        let mut catalog = Catalog::new();
        catalog.declare(ConstraintDecl::new("m", vec![param()], vec![])).unwrap();

        let mut program = Program::new("P", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![call("m")],
            delete_head: vec![call("m")],
            guard: vec![],
            body: Body::Empty,
            position: Position::synthetic(),
        });

        run(&program, &mut catalog);
        assert!(!catalog.get(catalog.lookup("m").unwrap()).never_stored);
    }
}
