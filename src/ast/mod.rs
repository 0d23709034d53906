//! # CHR Abstract Syntax Tree
//!
//! Sum types for CHR expressions and rule bodies (§3.1, §3.2 of the
//! specification). These are the types the parser produces and every
//! downstream analysis consumes; they are uniquely owned by their parent
//! node until program lowering completes (see `crate::catalog` and
//! `crate::program` for the shared, arena-indexed types rule heads and
//! occurrence rules reference instead of owning).

pub mod builders;

use crate::position::Position;
use std::collections::HashSet;

/// Reserved operator sentinel: `%=` denotes unification, never host
/// assignment.
pub const UNIFY_OP: &str = "%=";

/// A host-language or CHR expression (§3.1).
///
/// Host-language syntax itself is out of the core's scope (§1); `Literal`
/// and `HostVariable` below carry opaque source text rather than a further
/// parsed subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An opaque textual constant from the host language (a numeral, a
    /// quoted string, `nullptr`, ...).
    Literal { text: String, position: Position },

    /// A bare identifier whose role (logical variable vs. host variable)
    /// has not yet been resolved. The surface parser only produces this
    /// for identifiers it cannot classify; `Identifier::resolve` turns it
    /// into `LogicalVar`/`HostVar` using the uppercase-first-letter
    /// convention (§3.1).
    Identifier { name: String, position: Position },

    /// A logical (unification) variable. By convention its name begins
    /// with an uppercase letter.
    LogicalVar { name: String, position: Position },

    /// A variable bound in host code, untouched by unification.
    HostVar { name: String, position: Position },

    /// Prefix or postfix unary operator applied to one operand.
    Unary {
        op: String,
        prefix: bool,
        operand: Box<Expression>,
        position: Position,
    },

    /// Binary infix operator.
    Binary {
        op: String,
        left: Box<Expression>,
        right: Box<Expression>,
        position: Position,
    },

    /// Ternary operator, e.g. `a ? b : c` (`op1` = `?`, `op2` = `:`).
    Ternary {
        op1: String,
        op2: String,
        a: Box<Expression>,
        b: Box<Expression>,
        c: Box<Expression>,
        position: Position,
    },

    /// A host-language function call. `l_delim`/`r_delim` record the
    /// surface delimiters (`(`/`)`, `[`/`]`, ...) so the host-code lowering
    /// can reproduce them without the core needing to know host syntax.
    HostCall {
        name: String,
        l_delim: String,
        r_delim: String,
        args: Vec<Expression>,
        position: Position,
    },

    /// A CHR constraint call used as an expression (only legal where §7
    /// semantic rules permit it, e.g. nowhere inside a plain host
    /// expression — enforcement lives in `crate::diagnostics`, not here).
    ChrCall {
        constraint: String,
        args: Vec<Expression>,
        position: Position,
    },

    /// `chr_count<use_index>(constraint)` — live cardinality of a store
    /// (§11 supplement). `use_index` is `None` until index inference
    /// (§4.3.4) assigns one.
    ChrCount {
        use_index: Option<usize>,
        constraint: String,
        position: Position,
    },
}

impl Expression {
    pub fn position(&self) -> &Position {
        match self {
            Expression::Literal { position, .. }
            | Expression::Identifier { position, .. }
            | Expression::LogicalVar { position, .. }
            | Expression::HostVar { position, .. }
            | Expression::Unary { position, .. }
            | Expression::Binary { position, .. }
            | Expression::Ternary { position, .. }
            | Expression::HostCall { position, .. }
            | Expression::ChrCall { position, .. }
            | Expression::ChrCount { position, .. } => position,
        }
    }

    /// True if this expression denotes the unification operator applied at
    /// the top level (used by the body builder to distinguish `X %= Y` from
    /// a plain host expression statement).
    pub fn is_unification(&self) -> bool {
        matches!(self, Expression::Binary { op, .. } if op == UNIFY_OP)
    }

    /// Collect the names of every logical variable free in this expression.
    pub fn logical_vars(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_logical_vars(&mut out);
        out
    }

    fn collect_logical_vars(&self, out: &mut HashSet<String>) {
        match self {
            Expression::LogicalVar { name, .. } => {
                out.insert(name.clone());
            }
            Expression::Literal { .. } | Expression::Identifier { .. } | Expression::HostVar { .. } => {}
            Expression::Unary { operand, .. } => operand.collect_logical_vars(out),
            Expression::Binary { left, right, .. } => {
                left.collect_logical_vars(out);
                right.collect_logical_vars(out);
            }
            Expression::Ternary { a, b, c, .. } => {
                a.collect_logical_vars(out);
                b.collect_logical_vars(out);
                c.collect_logical_vars(out);
            }
            Expression::HostCall { args, .. } | Expression::ChrCall { args, .. } => {
                for a in args {
                    a.collect_logical_vars(out);
                }
            }
            Expression::ChrCount { .. } => {}
        }
    }

    /// True by the naming convention in §3.1: identifiers beginning with an
    /// uppercase letter denote logical variables.
    pub fn looks_like_logical_var(name: &str) -> bool {
        name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }

    /// Turns a bare `Identifier` into a `LogicalVar`/`HostVar` using the
    /// uppercase-first-letter convention, recursing into every child so a
    /// whole tree built with `ExprBuilder::identifier` comes out fully
    /// classified. Non-`Identifier` nodes recurse unchanged (§3.1).
    pub fn resolve(self) -> Expression {
        match self {
            Expression::Identifier { name, position } => {
                if Expression::looks_like_logical_var(&name) {
                    Expression::LogicalVar { name, position }
                } else {
                    Expression::HostVar { name, position }
                }
            }
            Expression::Unary { op, prefix, operand, position } => Expression::Unary {
                op,
                prefix,
                operand: Box::new(operand.resolve()),
                position,
            },
            Expression::Binary { op, left, right, position } => Expression::Binary {
                op,
                left: Box::new(left.resolve()),
                right: Box::new(right.resolve()),
                position,
            },
            Expression::Ternary { op1, op2, a, b, c, position } => Expression::Ternary {
                op1,
                op2,
                a: Box::new(a.resolve()),
                b: Box::new(b.resolve()),
                c: Box::new(c.resolve()),
                position,
            },
            Expression::HostCall { name, l_delim, r_delim, args, position } => Expression::HostCall {
                name,
                l_delim,
                r_delim,
                args: args.into_iter().map(Expression::resolve).collect(),
                position,
            },
            Expression::ChrCall { constraint, args, position } => Expression::ChrCall {
                constraint,
                args: args.into_iter().map(Expression::resolve).collect(),
                position,
            },
            other => other,
        }
    }
}

/// Pragmas attach to head constraints, body calls, or declarations and
/// alter lowering (§3.2, §6.1). Each is legal only on the node classes
/// enumerated in the specification; `crate::diagnostics` rejects
/// misplaced pragmas during semantic analysis, not this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pragma {
    CatchFailure,
    Passive,
    Bang,
    NoHistory,
    Persistent,
    NoReactivate,
}

/// A set of pragmas, kept sorted so two logically-equal sets compare equal
/// regardless of surface order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PragmaSet(Vec<Pragma>);

impl PragmaSet {
    pub fn new() -> Self {
        PragmaSet(Vec::new())
    }

    pub fn insert(&mut self, p: Pragma) {
        if !self.0.contains(&p) {
            self.0.push(p);
            self.0.sort();
        }
    }

    pub fn contains(&self, p: Pragma) -> bool {
        self.0.contains(&p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pragma> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Pragma> for PragmaSet {
    fn from_iter<T: IntoIterator<Item = Pragma>>(iter: T) -> Self {
        let mut set = PragmaSet::new();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

/// Separator of a `Body::Sequence` (§3.2): `,` is conjunctive (left-to-right,
/// first failure aborts), `;` is disjunctive (a choice point, §4.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Conjunctive,
    Disjunctive,
}

/// Reserved body keywords (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Success,
    Failure,
    Stop,
}

/// A CHR constraint call appearing in a rule head or a rule body.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintCall {
    pub constraint: String,
    pub args: Vec<Expression>,
    pub pragmas: PragmaSet,
    pub position: Position,
}

impl ConstraintCall {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn logical_vars(&self) -> HashSet<String> {
        self.args.iter().flat_map(Expression::logical_vars).collect()
    }

    /// Resolves every bare `Identifier` argument (§3.1), as produced by the
    /// parser before classification.
    pub fn resolve(self) -> ConstraintCall {
        ConstraintCall {
            constraint: self.constraint,
            args: self.args.into_iter().map(Expression::resolve).collect(),
            pragmas: self.pragmas,
            position: self.position,
        }
    }
}

/// A rule body (§3.2). Behavior/try nodes are modeled as their own variants
/// rather than re-using `Sequence`, matching the specification's explicit
/// enumeration of the sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Keyword { keyword: Keyword, position: Position },
    HostExpression { expr: Expression, pragmas: PragmaSet },
    /// `T v = expr;` — a host variable declaration plus its initializing
    /// assignment, kept as one node because the two never occur apart in
    /// CHR bodies.
    HostDecl {
        var_type: String,
        var_name: String,
        init: Expression,
        position: Position,
    },
    Unification {
        left: Expression,
        right: Expression,
        position: Position,
    },
    ChrCall(ConstraintCall),
    Sequence {
        kind: SequenceKind,
        parts: Vec<Body>,
    },
    Behavior(Box<Behavior>),
    Try(Box<Try>),
}

impl Body {
    pub fn conjunction(parts: Vec<Body>) -> Body {
        match parts.len() {
            0 => Body::Empty,
            1 => parts.into_iter().next().unwrap(),
            _ => Body::Sequence {
                kind: SequenceKind::Conjunctive,
                parts,
            },
        }
    }

    /// True if, along every control-flow path, the terminal statement of
    /// this body is a CHR call to `constraint` — the precondition for the
    /// tail-call rewrite in §4.4.6.
    pub fn is_tail_call_to(&self, constraint: &str) -> bool {
        match self {
            Body::ChrCall(call) => call.constraint == constraint,
            Body::Sequence {
                kind: SequenceKind::Conjunctive,
                parts,
            } => parts.last().is_some_and(|b| b.is_tail_call_to(constraint)),
            Body::Sequence {
                kind: SequenceKind::Disjunctive,
                parts,
            } => !parts.is_empty() && parts.iter().all(|b| b.is_tail_call_to(constraint)),
            _ => false,
        }
    }

    /// Resolves every bare `Identifier` reachable from this body (§3.1),
    /// recursing through sequences, behavior, and try nodes.
    pub fn resolve(self) -> Body {
        match self {
            Body::Empty | Body::Keyword { .. } => self,
            Body::HostExpression { expr, pragmas } => Body::HostExpression {
                expr: expr.resolve(),
                pragmas,
            },
            Body::HostDecl { var_type, var_name, init, position } => Body::HostDecl {
                var_type,
                var_name,
                init: init.resolve(),
                position,
            },
            Body::Unification { left, right, position } => Body::Unification {
                left: left.resolve(),
                right: right.resolve(),
                position,
            },
            Body::ChrCall(call) => Body::ChrCall(call.resolve()),
            Body::Sequence { kind, parts } => Body::Sequence {
                kind,
                parts: parts.into_iter().map(Body::resolve).collect(),
            },
            Body::Behavior(b) => Body::Behavior(Box::new(b.resolve())),
            Body::Try(t) => Body::Try(Box::new(t.resolve())),
        }
    }
}

/// A bounded search loop (§3.2 "Behavior node"). `exists`/`forall`/
/// `exists_it`/`forall_it` are sugar the body builder expands into one of
/// these plus an initializer prefix; no separate AST node survives parsing
/// for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub stop_condition: Expression,
    pub on_succeeded_alt: Body,
    pub on_failed_alt: Body,
    pub final_status: Expression,
    pub on_succeeded_status: Body,
    pub on_failed_status: Body,
    pub behavior_body: Body,
    pub position: Position,
}

impl Behavior {
    fn resolve(self) -> Behavior {
        Behavior {
            stop_condition: self.stop_condition.resolve(),
            on_succeeded_alt: self.on_succeeded_alt.resolve(),
            on_failed_alt: self.on_failed_alt.resolve(),
            final_status: self.final_status.resolve(),
            on_succeeded_status: self.on_succeeded_status.resolve(),
            on_failed_status: self.on_failed_status.resolve(),
            behavior_body: self.behavior_body.resolve(),
            position: self.position,
        }
    }
}

/// A bounded choice with an outcome variable (§3.2 "Try node"). `always_rewind`
/// distinguishes `try` (`false`, rewind only on failure) from `try_bt`
/// (`true`, always rewind) per the §11 supplement.
#[derive(Debug, Clone, PartialEq)]
pub struct Try {
    pub always_rewind: bool,
    pub outcome_var: String,
    pub body: Body,
    pub position: Position,
}

impl Try {
    fn resolve(self) -> Try {
        Try {
            always_rewind: self.always_rewind,
            outcome_var: self.outcome_var,
            body: self.body.resolve(),
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Expression {
        Expression::Literal {
            text: s.to_string(),
            position: Position::synthetic(),
        }
    }

    fn lvar(s: &str) -> Expression {
        Expression::LogicalVar {
            name: s.to_string(),
            position: Position::synthetic(),
        }
    }

    #[test]
    fn pragma_set_dedupes_and_sorts() {
        let mut set = PragmaSet::new();
        set.insert(Pragma::Bang);
        set.insert(Pragma::Passive);
        set.insert(Pragma::Bang);
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn logical_vars_collects_from_nested_calls() {
        let call = Expression::HostCall {
            name: "f".into(),
            l_delim: "(".into(),
            r_delim: ")".into(),
            args: vec![lvar("X"), lit("1")],
            position: Position::synthetic(),
        };
        let vars = call.logical_vars();
        assert_eq!(vars.len(), 1);
        assert!(vars.contains("X"));
    }

    #[test]
    fn tail_call_detection_through_conjunction() {
        let body = Body::conjunction(vec![
            Body::HostExpression {
                expr: lit("step()"),
                pragmas: PragmaSet::new(),
            },
            Body::ChrCall(ConstraintCall {
                constraint: "gcd".into(),
                args: vec![],
                pragmas: PragmaSet::new(),
                position: Position::synthetic(),
            }),
        ]);
        assert!(body.is_tail_call_to("gcd"));
        assert!(!body.is_tail_call_to("other"));
    }

    #[test]
    fn looks_like_logical_var_uses_uppercase_convention() {
        assert!(Expression::looks_like_logical_var("X"));
        assert!(!Expression::looks_like_logical_var("x"));
    }

    #[test]
    fn resolve_classifies_identifiers_by_case() {
        let e = Expression::Identifier {
            name: "X".into(),
            position: Position::synthetic(),
        }
        .resolve();
        assert!(matches!(e, Expression::LogicalVar { .. }));

        let e = Expression::Identifier {
            name: "acc".into(),
            position: Position::synthetic(),
        }
        .resolve();
        assert!(matches!(e, Expression::HostVar { .. }));
    }

    #[test]
    fn resolve_recurses_into_nested_calls() {
        let e = Expression::HostCall {
            name: "f".into(),
            l_delim: "(".into(),
            r_delim: ")".into(),
            args: vec![Expression::Identifier {
                name: "X".into(),
                position: Position::synthetic(),
            }],
            position: Position::synthetic(),
        }
        .resolve();
        match e {
            Expression::HostCall { args, .. } => assert!(matches!(args[0], Expression::LogicalVar { .. })),
            _ => panic!("expected HostCall"),
        }
    }
}
