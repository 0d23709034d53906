//! Head reorder (§4.3.1): permute an occurrence rule's partner list to
//! minimize expected matching cost, then recompute the guard split.

use crate::ast::Expression;
use crate::program::{HeadRef, OccurrenceRule};
use std::collections::HashSet;

/// A partner's rank: higher-selectivity partners (more already-bound
/// arguments) sort first; ties break on smaller expected store size, then
/// original source order (§4.3.1).
fn rank(partner: &HeadRef, bound_so_far: &HashSet<String>, original_index: usize) -> (std::cmp::Reverse<usize>, usize, usize) {
    let bound_arg_count = partner
        .call
        .args
        .iter()
        .filter(|a| is_literal_or_bound(a, bound_so_far))
        .count();
    // No runtime statistics exist at compile time; approximate expected
    // store size by arity (lower arity constraints tend to have fewer
    // possible tuples in these programs) as the tie-break the
    // specification's cost model calls for.
    let expected_store_size = partner.call.args.len();
    (std::cmp::Reverse(bound_arg_count), expected_store_size, original_index)
}

fn is_literal_or_bound(expr: &Expression, bound: &HashSet<String>) -> bool {
    match expr {
        Expression::Literal { .. } => true,
        Expression::LogicalVar { name, .. } => bound.contains(name),
        _ => false,
    }
}

/// Reorders `occ.partners` in place, then recomputes `occ.guard_parts` so
/// each clause sits at the earliest position its free variables are all
/// bound (§4.3.1 last sentence).
pub fn reorder(occ: &mut OccurrenceRule) {
    let active_bound: HashSet<String> = occ.active.call.args.iter().flat_map(Expression::logical_vars).collect();

    let mut indexed: Vec<(usize, HeadRef)> = occ.partners.drain(..).enumerate().collect();
    // Greedily pick, at each step, the partner with the best rank given
    // what is bound so far — this is what "descending selectivity" means
    // once later partners can depend on earlier ones being bound.
    let mut bound = active_bound;
    let mut ordered = Vec::with_capacity(indexed.len());
    while !indexed.is_empty() {
        let (pos, _) = indexed
            .iter()
            .enumerate()
            .min_by_key(|(_, (orig_idx, p))| rank(p, &bound, *orig_idx))
            .expect("non-empty");
        let (_, partner) = indexed.remove(pos);
        bound.extend(partner.call.args.iter().flat_map(Expression::logical_vars));
        ordered.push(partner);
    }
    occ.partners = ordered;

    // Flatten and re-split the guard against the new partner order.
    let guard: Vec<Expression> = occ.guard_parts.drain(..).flatten().collect();
    occ.guard_parts = resplit(&guard, &occ.active.call.args, &occ.partners);
}

fn resplit(guard: &[Expression], active_args: &[Expression], partners: &[HeadRef]) -> Vec<Vec<Expression>> {
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
    if !remaining.is_empty() {
        if let Some(last) = parts.last_mut() {
            last.extend(remaining.into_iter().cloned());
        }
    }
    parts
}
