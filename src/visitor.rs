//! Traversal over [`Expression`]/[`Body`] trees (§4 "Visitor polymorphism"
//! design note, §9).
//!
//! The original compiler dispatches via a deep virtual hierarchy; this
//! module replaces that with exhaustive `match` over the AST sum types and
//! exposes traversal as free functions that take closures, not trait
//! objects. Adding a new traversal means writing a new function here, not
//! touching the AST node definitions — the property the original got from
//! virtual dispatch, preserved without vtables.

use crate::ast::{Behavior, Body, Expression, SequenceKind, Try};

/// Calls `f` on `expr` and then recurses into every child expression,
/// pre-order.
pub fn walk_expression(expr: &Expression, f: &mut impl FnMut(&Expression)) {
    f(expr);
    match expr {
        Expression::Literal { .. }
        | Expression::Identifier { .. }
        | Expression::LogicalVar { .. }
        | Expression::HostVar { .. }
        | Expression::ChrCount { .. } => {}
        Expression::Unary { operand, .. } => walk_expression(operand, f),
        Expression::Binary { left, right, .. } => {
            walk_expression(left, f);
            walk_expression(right, f);
        }
        Expression::Ternary { a, b, c, .. } => {
            walk_expression(a, f);
            walk_expression(b, f);
            walk_expression(c, f);
        }
        Expression::HostCall { args, .. } | Expression::ChrCall { args, .. } => {
            for arg in args {
                walk_expression(arg, f);
            }
        }
    }
}

/// Pre-order walk over a [`Body`] tree, visiting every expression reachable
/// from it via `on_expr` and every body node via `on_body`.
pub fn walk_body(body: &Body, on_body: &mut impl FnMut(&Body), on_expr: &mut impl FnMut(&Expression)) {
    on_body(body);
    match body {
        Body::Empty | Body::Keyword { .. } => {}
        Body::HostExpression { expr, .. } => walk_expression(expr, on_expr),
        Body::HostDecl { init, .. } => walk_expression(init, on_expr),
        Body::Unification { left, right, .. } => {
            walk_expression(left, on_expr);
            walk_expression(right, on_expr);
        }
        Body::ChrCall(call) => {
            for arg in &call.args {
                walk_expression(arg, on_expr);
            }
        }
        Body::Sequence { parts, .. } => {
            for part in parts {
                walk_body(part, on_body, on_expr);
            }
        }
        Body::Behavior(b) => walk_behavior(b, on_body, on_expr),
        Body::Try(t) => walk_try(t, on_body, on_expr),
    }
}

fn walk_behavior(b: &Behavior, on_body: &mut impl FnMut(&Body), on_expr: &mut impl FnMut(&Expression)) {
    walk_expression(&b.stop_condition, on_expr);
    walk_body(&b.on_succeeded_alt, on_body, on_expr);
    walk_body(&b.on_failed_alt, on_body, on_expr);
    walk_expression(&b.final_status, on_expr);
    walk_body(&b.on_succeeded_status, on_body, on_expr);
    walk_body(&b.on_failed_status, on_body, on_expr);
    walk_body(&b.behavior_body, on_body, on_expr);
}

fn walk_try(t: &Try, on_body: &mut impl FnMut(&Body), on_expr: &mut impl FnMut(&Expression)) {
    walk_body(&t.body, on_body, on_expr);
}

/// Pretty-prints an expression back into (approximately) the surface
/// syntax it was parsed from — used by the §8 round-trip test and by
/// diagnostic messages that want to show an offending expression.
pub fn print_expression(expr: &Expression) -> String {
    match expr {
        Expression::Literal { text, .. } => text.clone(),
        Expression::Identifier { name, .. }
        | Expression::LogicalVar { name, .. }
        | Expression::HostVar { name, .. } => name.clone(),
        Expression::Unary { op, prefix, operand, .. } => {
            let inner = print_expression(operand);
            if *prefix {
                format!("{op}{inner}")
            } else {
                format!("{inner}{op}")
            }
        }
        Expression::Binary { op, left, right, .. } => {
            format!("{} {} {}", print_expression(left), op, print_expression(right))
        }
        Expression::Ternary { op1, op2, a, b, c, .. } => {
            format!(
                "{} {} {} {} {}",
                print_expression(a),
                op1,
                print_expression(b),
                op2,
                print_expression(c)
            )
        }
        Expression::HostCall {
            name,
            l_delim,
            r_delim,
            args,
            ..
        } => {
            let args_str: Vec<String> = args.iter().map(print_expression).collect();
            format!("{name}{l_delim}{}{r_delim}", args_str.join(", "))
        }
        Expression::ChrCall { constraint, args, .. } => {
            let args_str: Vec<String> = args.iter().map(print_expression).collect();
            format!("{constraint}({})", args_str.join(", "))
        }
        Expression::ChrCount {
            use_index,
            constraint,
            ..
        } => match use_index {
            Some(ix) => format!("chr_count<{ix}>({constraint})"),
            None => format!("chr_count({constraint})"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn walk_expression_visits_all_nested_args() {
        let inner = Expression::LogicalVar {
            name: "X".into(),
            position: Position::synthetic(),
        };
        let outer = Expression::HostCall {
            name: "f".into(),
            l_delim: "(".into(),
            r_delim: ")".into(),
            args: vec![inner],
            position: Position::synthetic(),
        };
        let mut count = 0;
        walk_expression(&outer, &mut |_| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn print_expression_roundtrips_binary() {
        let e = Expression::Binary {
            op: "+".into(),
            left: Box::new(Expression::Literal {
                text: "1".into(),
                position: Position::synthetic(),
            }),
            right: Box::new(Expression::Literal {
                text: "2".into(),
                position: Position::synthetic(),
            }),
            position: Position::synthetic(),
        };
        assert_eq!(print_expression(&e), "1 + 2");
    }
}
