//! Guard-part reorder (§4.3.2): within each guard part, assignment clauses
//! first, then cheap pure host expressions, then everything else —
//! preserving relative order inside each category.

use crate::ast::Expression;
use crate::program::OccurrenceRule;

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Assignment,
    CheapPure,
    Rest,
}

/// An assignment-shaped clause: `v = expr`, the `=` operator reserved for
/// this in guard position (`%=` is unification and never appears in a
/// guard — §3.1).
fn is_assignment(expr: &Expression) -> bool {
    matches!(expr, Expression::Binary { op, left, .. } if op == "=" && matches!(**left, Expression::LogicalVar { .. } | Expression::HostVar { .. }))
}

/// No nested host-function call anywhere in the expression.
fn is_cheap_pure(expr: &Expression) -> bool {
    let mut has_call = false;
    crate::visitor::walk_expression(expr, &mut |e| {
        if matches!(e, Expression::HostCall { .. }) {
            has_call = true;
        }
    });
    !has_call
}

fn categorize(expr: &Expression) -> Category {
    if is_assignment(expr) {
        Category::Assignment
    } else if is_cheap_pure(expr) {
        Category::CheapPure
    } else {
        Category::Rest
    }
}

/// Reorders every guard part of `occ` in place. A stable sort keeps
/// relative order within each category, which also keeps an assignment's
/// defining clause ahead of any clause reading that variable as long as
/// the defining clause was already earlier in source order (the
/// specification requires this as an invariant, not something this pass
/// re-derives).
pub fn reorder(occ: &mut OccurrenceRule) {
    for part in &mut occ.guard_parts {
        part.sort_by_key(categorize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::ExprBuilder;
    use crate::position::Position;

    #[test]
    fn assignment_clause_moves_to_front() {
        let e = ExprBuilder::at(Position::synthetic());
        let assign = e.binary("=", e.logical_var("V"), e.literal("1"));
        let pure = e.binary(">", e.logical_var("V"), e.literal("0"));
        let mut parts = vec![vec![pure.clone(), assign.clone()]];
        parts[0].sort_by_key(categorize);
        assert_eq!(parts[0][0], assign);
        assert_eq!(parts[0][1], pure);
    }

    #[test]
    fn cheap_pure_sorts_before_host_call() {
        let e = ExprBuilder::at(Position::synthetic());
        let call_expr = e.binary(">", e.host_call("f", "(", ")", vec![e.logical_var("X")]), e.literal("0"));
        let pure = e.binary(">", e.logical_var("X"), e.literal("0"));
        assert!(categorize(&pure) < categorize(&call_expr));
    }
}
