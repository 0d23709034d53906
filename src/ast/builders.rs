//! Fluent construction helpers for [`Expression`] and [`Body`] trees.
//!
//! These exist so the parser (and tests, and the behavior-desugaring pass)
//! can build AST fragments without spelling out every `Position` and
//! `PragmaSet` by hand. They do no validation; `crate::diagnostics`
//! validates after the tree is built.

use super::{
    Behavior, Body, ConstraintCall, Expression, Keyword, Pragma, PragmaSet, SequenceKind, Try,
    UNIFY_OP,
};
use crate::position::Position;

/// Builds an [`Expression`] tree, defaulting every node to a given position
/// unless a more specific one is supplied.
pub struct ExprBuilder {
    position: Position,
}

impl ExprBuilder {
    pub fn at(position: Position) -> Self {
        ExprBuilder { position }
    }

    pub fn literal(&self, text: impl Into<String>) -> Expression {
        Expression::Literal {
            text: text.into(),
            position: self.position.clone(),
        }
    }

    pub fn logical_var(&self, name: impl Into<String>) -> Expression {
        Expression::LogicalVar {
            name: name.into(),
            position: self.position.clone(),
        }
    }

    pub fn host_var(&self, name: impl Into<String>) -> Expression {
        Expression::HostVar {
            name: name.into(),
            position: self.position.clone(),
        }
    }

    /// Builds an `Identifier` node; callers resolve it to a logical or host
    /// variable later via [`super::Expression::looks_like_logical_var`].
    pub fn identifier(&self, name: impl Into<String>) -> Expression {
        Expression::Identifier {
            name: name.into(),
            position: self.position.clone(),
        }
    }

    pub fn unary(&self, op: impl Into<String>, prefix: bool, operand: Expression) -> Expression {
        Expression::Unary {
            op: op.into(),
            prefix,
            operand: Box::new(operand),
            position: self.position.clone(),
        }
    }

    pub fn binary(&self, op: impl Into<String>, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
            position: self.position.clone(),
        }
    }

    pub fn unify(&self, left: Expression, right: Expression) -> Expression {
        self.binary(UNIFY_OP, left, right)
    }

    pub fn ternary(
        &self,
        op1: impl Into<String>,
        op2: impl Into<String>,
        a: Expression,
        b: Expression,
        c: Expression,
    ) -> Expression {
        Expression::Ternary {
            op1: op1.into(),
            op2: op2.into(),
            a: Box::new(a),
            b: Box::new(b),
            c: Box::new(c),
            position: self.position.clone(),
        }
    }

    pub fn host_call(
        &self,
        name: impl Into<String>,
        l_delim: impl Into<String>,
        r_delim: impl Into<String>,
        args: Vec<Expression>,
    ) -> Expression {
        Expression::HostCall {
            name: name.into(),
            l_delim: l_delim.into(),
            r_delim: r_delim.into(),
            args,
            position: self.position.clone(),
        }
    }

    pub fn chr_call(&self, constraint: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::ChrCall {
            constraint: constraint.into(),
            args,
            position: self.position.clone(),
        }
    }

    pub fn chr_count(&self, constraint: impl Into<String>) -> Expression {
        Expression::ChrCount {
            use_index: None,
            constraint: constraint.into(),
            position: self.position.clone(),
        }
    }
}

/// Builds a [`Body`] tree.
pub struct BodyBuilder {
    position: Position,
}

impl BodyBuilder {
    pub fn at(position: Position) -> Self {
        BodyBuilder { position }
    }

    pub fn success(&self) -> Body {
        Body::Keyword {
            keyword: Keyword::Success,
            position: self.position.clone(),
        }
    }

    pub fn failure(&self) -> Body {
        Body::Keyword {
            keyword: Keyword::Failure,
            position: self.position.clone(),
        }
    }

    pub fn stop(&self) -> Body {
        Body::Keyword {
            keyword: Keyword::Stop,
            position: self.position.clone(),
        }
    }

    pub fn host_expr(&self, expr: Expression) -> Body {
        Body::HostExpression {
            expr,
            pragmas: PragmaSet::new(),
        }
    }

    pub fn host_expr_with(&self, expr: Expression, pragmas: PragmaSet) -> Body {
        Body::HostExpression { expr, pragmas }
    }

    pub fn host_decl(&self, var_type: impl Into<String>, var_name: impl Into<String>, init: Expression) -> Body {
        Body::HostDecl {
            var_type: var_type.into(),
            var_name: var_name.into(),
            init,
            position: self.position.clone(),
        }
    }

    pub fn unify(&self, left: Expression, right: Expression) -> Body {
        Body::Unification {
            left,
            right,
            position: self.position.clone(),
        }
    }

    pub fn chr_call(&self, constraint: impl Into<String>, args: Vec<Expression>) -> Body {
        Body::ChrCall(ConstraintCall {
            constraint: constraint.into(),
            args,
            pragmas: PragmaSet::new(),
            position: self.position.clone(),
        })
    }

    pub fn chr_call_with(
        &self,
        constraint: impl Into<String>,
        args: Vec<Expression>,
        pragmas: PragmaSet,
    ) -> Body {
        Body::ChrCall(ConstraintCall {
            constraint: constraint.into(),
            args,
            pragmas,
            position: self.position.clone(),
        })
    }

    pub fn conjunction(&self, parts: Vec<Body>) -> Body {
        Body::conjunction(parts)
    }

    pub fn disjunction(&self, parts: Vec<Body>) -> Body {
        if parts.len() == 1 {
            parts.into_iter().next().unwrap()
        } else {
            Body::Sequence {
                kind: SequenceKind::Disjunctive,
                parts,
            }
        }
    }

    pub fn try_node(&self, always_rewind: bool, outcome_var: impl Into<String>, body: Body) -> Body {
        Body::Try(Box::new(Try {
            always_rewind,
            outcome_var: outcome_var.into(),
            body,
            position: self.position.clone(),
        }))
    }

    /// Expands `behavior { ... }` into a [`Body::Behavior`] node. `exists`/
    /// `forall`/`*_it` sugar is expanded by the parser into a call to this
    /// plus a prefix sequence of initializers (§3.2) before reaching here.
    pub fn behavior(
        &self,
        stop_condition: Expression,
        on_succeeded_alt: Body,
        on_failed_alt: Body,
        final_status: Expression,
        on_succeeded_status: Body,
        on_failed_status: Body,
        behavior_body: Body,
    ) -> Body {
        Body::Behavior(Box::new(Behavior {
            stop_condition,
            on_succeeded_alt,
            on_failed_alt,
            final_status,
            on_succeeded_status,
            on_failed_status,
            behavior_body,
            position: self.position.clone(),
        }))
    }

    pub fn pragmas(&self, pragmas: impl IntoIterator<Item = Pragma>) -> PragmaSet {
        pragmas.into_iter().collect()
    }
}
