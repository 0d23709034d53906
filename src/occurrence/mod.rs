//! Occurrence-rule expansion (§3.3 "Occurrence rule", §4.2).
//!
//! For a rule with `n` head constraints this produces exactly `n`
//! occurrence rules, one per head position pinned as the active
//! constraint. This module only performs the *initial* expansion and
//! guard split (§4.2 steps 1-5); `crate::reorder` mutates the result
//! in place afterward (head reorder, guard-part reorder, occurrence
//! reorder, index inference) before lowering.

use crate::analyses::late_storage;
use crate::ast::Expression;
use crate::catalog::Catalog;
use crate::program::{HeadRef, OccurrenceRule, Program, Rule, RuleId};
use std::collections::{HashMap, HashSet};

/// Expands every rule in `program` into its occurrence rules, in program
/// order. `active_constraint_occurrence` is assigned here in
/// declaration/appearance order (§4.2(3)); `crate::reorder::occurrence_reorder`
/// reassigns it to the stable post-reorder numbering (§4.3.3).
pub fn expand_program(program: &Program, catalog: &Catalog) -> Vec<OccurrenceRule> {
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for rule in &program.rules {
        out.extend(expand_rule(rule, catalog, &mut counters));
    }
    out
}

/// Expands one rule into its occurrence rules (§4.2).
pub fn expand_rule(rule: &Rule, catalog: &Catalog, counters: &mut HashMap<String, usize>) -> Vec<OccurrenceRule> {
    let head = rule.head();
    let n = head.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let active_call = head[i].clone();
        let active_id = catalog
            .lookup(&active_call.constraint)
            .expect("semantic analysis guarantees every head constraint is declared");
        let keep_active = rule.keep_active(i);

        let partners: Vec<HeadRef> = head
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, call)| {
                let keep = j < rule.keep_head.len();
                let id = catalog
                    .lookup(&call.constraint)
                    .expect("semantic analysis guarantees every head constraint is declared");
                HeadRef {
                    keep,
                    use_index: None,
                    constraint: id,
                    call: (*call).clone(),
                }
            })
            .collect();

        let guard_parts = initial_guard_split(&rule.guard, &active_call.args, &partners);

        let occurrence_number = {
            let counter = counters.entry(active_call.constraint.clone()).or_insert(0);
            let n = *counter;
            *counter += 1;
            n
        };

        let store_active_constraint = if keep_active {
            late_storage::store_active_constraint(catalog, active_id)
        } else {
            false
        };

        out.push(OccurrenceRule {
            rule: rule.id,
            active: HeadRef {
                keep: keep_active,
                use_index: None,
                constraint: active_id,
                call: active_call.clone(),
            },
            partners,
            guard_parts,
            store_active_constraint,
            active_constraint_occurrence: occurrence_number,
        });
    }

    out
}

/// Greedy left-to-right initial guard split (§4.2(4)): clause `g` goes in
/// the first part `i` such that all of `g`'s free variables are bound by
/// the active constraint (part 0) or by partners `0..i-1`.
fn initial_guard_split(
    guard: &[Expression],
    active_args: &[Expression],
    partners: &[HeadRef],
) -> Vec<Vec<Expression>> {
    let mut bound: HashSet<String> = active_args.iter().flat_map(Expression::logical_vars).collect();
    let mut parts: Vec<Vec<Expression>> = vec![Vec::new(); partners.len() + 1];
    let mut remaining: Vec<&Expression> = guard.iter().collect();

    for part_index in 0..parts.len() {
        let (resolvable, unresolved): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|g| g.logical_vars().is_subset(&bound));
        parts[part_index].extend(resolvable.into_iter().cloned());
        remaining = unresolved;
        if part_index < partners.len() {
            bound.extend(partners[part_index].call.args.iter().flat_map(Expression::logical_vars));
        }
    }
    // Anything still unresolved after every partner is bound is placed in the
    // last part; `crate::diagnostics` is responsible for flagging a guard
    // clause that never becomes resolvable as an unbound-variable error.
    if !remaining.is_empty() {
        if let Some(last) = parts.last_mut() {
            last.extend(remaining.into_iter().cloned());
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{builders::ExprBuilder, ConstraintCall, PragmaSet};
    use crate::catalog::{ConstraintDecl, Mode, Parameter};
    use crate::position::Position;
    use crate::program::RuleId;

    fn param() -> Parameter {
        Parameter {
            mode: Mode::Any,
            type_text: "int".into(),
        }
    }

    fn call(name: &str, args: Vec<Expression>) -> ConstraintCall {
        ConstraintCall {
            constraint: name.into(),
            args,
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        }
    }

    #[test]
    fn two_head_rule_produces_two_occurrences() {
        let mut catalog = Catalog::new();
        catalog
            .declare(ConstraintDecl::new("leq", vec![param(), param()], vec![]))
            .unwrap();

        let e = ExprBuilder::at(Position::synthetic());
        let rule = Rule {
            id: RuleId(0),
            name: Some("transitivity".into()),
            keep_head: vec![
                call("leq", vec![e.logical_var("X"), e.logical_var("Y")]),
                call("leq", vec![e.logical_var("Y"), e.logical_var("Z")]),
            ],
            delete_head: vec![],
            guard: vec![],
            body: crate::ast::Body::ChrCall(call("leq", vec![e.logical_var("X"), e.logical_var("Z")])),
            position: Position::synthetic(),
        };

        let mut counters = HashMap::new();
        let occs = expand_rule(&rule, &catalog, &mut counters);
        assert_eq!(occs.len(), 2);
        assert_eq!(occs[0].active_constraint_occurrence, 0);
        assert_eq!(occs[1].active_constraint_occurrence, 1);
        assert_eq!(occs[0].partners.len(), 1);
        assert_eq!(occs[1].partners.len(), 1);
    }

    #[test]
    fn guard_clause_placed_at_earliest_bound_part() {
        let mut catalog = Catalog::new();
        catalog
            .declare(ConstraintDecl::new("m", vec![param()], vec![]))
            .unwrap();
        let e = ExprBuilder::at(Position::synthetic());

        let guard_clause = e.binary("=<", e.logical_var("X"), e.logical_var("Y"));
        let rule = Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![call("m", vec![e.logical_var("X")])],
            delete_head: vec![call("m", vec![e.logical_var("Y")])],
            guard: vec![guard_clause],
            body: crate::ast::Body::Empty,
            position: Position::synthetic(),
        };

        let mut counters = HashMap::new();
        let occs = expand_rule(&rule, &catalog, &mut counters);
        // active = m(X), partner = m(Y): the clause needs Y, so it lands in
        // part 1 (after the one partner is bound), not part 0.
        assert!(occs[0].guard_parts[0].is_empty());
        assert_eq!(occs[0].guard_parts[1].len(), 1);
    }
}
