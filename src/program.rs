//! The CHR program model (§3.3): constraint declarations (in
//! [`crate::catalog`]), rules, and the occurrence rules derived from them.

use crate::ast::{Body, ConstraintCall, Expression};
use crate::catalog::ConstraintId;
use crate::position::Position;

/// A `(type, name)` pair — a program or template parameter (§3.3).
#[derive(Debug, Clone, PartialEq)]
pub struct TypedName {
    pub type_text: String,
    pub name: String,
}

/// Fresh, program-unique identifier for a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// The four rule shapes (§3.3 "Rule kinds"), derived from head shape rather
/// than stored redundantly — see [`Rule::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `keep_head` empty.
    Simplification,
    /// `delete_head` empty; `keep_head` holds every head constraint.
    Propagation,
    /// A `Propagation` whose keep-head has at least one `no_history` pragma.
    PropagationNoHistory,
    /// Both heads non-empty.
    Simpagation,
}

/// A CHR rule (§3.3).
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub name: Option<String>,
    pub keep_head: Vec<ConstraintCall>,
    pub delete_head: Vec<ConstraintCall>,
    /// Guard clauses, ANDed together; order matters for §4.2(4)'s greedy
    /// left-to-right initial split.
    pub guard: Vec<Expression>,
    pub body: Body,
    pub position: Position,
}

impl Rule {
    /// The rule kind, derived from head shape rather than stored (§3.3).
    pub fn kind(&self) -> RuleKind {
        if self.keep_head.is_empty() {
            RuleKind::Simplification
        } else if self.delete_head.is_empty() {
            if self.keep_head.iter().any(|c| c.pragmas.contains(crate::ast::Pragma::NoHistory)) {
                RuleKind::PropagationNoHistory
            } else {
                RuleKind::Propagation
            }
        } else {
            RuleKind::Simpagation
        }
    }

    /// Head constraints in source order: keep-head first, then delete-head
    /// (§3.3 "Occurrence rule", §4.2).
    pub fn head(&self) -> Vec<&ConstraintCall> {
        self.keep_head.iter().chain(self.delete_head.iter()).collect()
    }

    pub fn head_len(&self) -> usize {
        self.keep_head.len() + self.delete_head.len()
    }

    /// True when position `i` in [`Rule::head`] order names a kept
    /// constraint (§4.2(2)).
    pub fn keep_active(&self, i: usize) -> bool {
        i < self.keep_head.len()
    }

    /// A propagation rule maintains a history unless it is
    /// `PropagationNoHistory` (§4.4.4); simplification and simpagation
    /// rules never do, since the delete-head guarantees no repeat firing.
    pub fn has_history(&self) -> bool {
        matches!(self.kind(), RuleKind::Propagation)
    }
}

/// A head-constraint descriptor inside an occurrence rule: whether it comes
/// from the keep-head, its inferred store index (§4.3.4, `-1`/`None` if
/// unindexed), and the constraint it names (§3.3 "Occurrence rule").
#[derive(Debug, Clone)]
pub struct HeadRef {
    pub keep: bool,
    pub use_index: Option<usize>,
    pub constraint: ConstraintId,
    pub call: ConstraintCall,
}

/// One occurrence rule (§3.3, §4.2): a rule viewed with one head position
/// pinned as the *active constraint*.
#[derive(Debug, Clone)]
pub struct OccurrenceRule {
    pub rule: RuleId,
    pub active: HeadRef,
    pub partners: Vec<HeadRef>,
    /// Guard split into `partners.len() + 1` parts (§3.3, §4.2(4), §4.3.2).
    pub guard_parts: Vec<Vec<Expression>>,
    pub store_active_constraint: bool,
    /// Occurrence number among all occurrences of `active.constraint` in
    /// the program, assigned post-reorder (§4.2(3), §4.3.3).
    pub active_constraint_occurrence: usize,
}

impl OccurrenceRule {
    pub fn partner_count(&self) -> usize {
        self.partners.len()
    }
}

/// A complete CHR program (§3.3): declarations live in the accompanying
/// [`crate::catalog::Catalog`]; this struct owns the rules and program-level
/// metadata.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub template_parameters: Vec<TypedName>,
    pub auto_persistent: bool,
    pub auto_catch_failure: bool,
    pub position: Position,
    pub rules: Vec<Rule>,
}

impl Program {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Program {
            name: name.into(),
            parameters: Vec::new(),
            template_parameters: Vec::new(),
            auto_persistent: false,
            auto_catch_failure: false,
            position,
            rules: Vec::new(),
        }
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn next_rule_id(&self) -> RuleId {
        RuleId(self.rules.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PragmaSet;

    fn call(name: &str) -> ConstraintCall {
        ConstraintCall {
            constraint: name.into(),
            args: vec![],
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        }
    }

    #[test]
    fn rule_kind_simplification_when_keep_head_empty() {
        let rule = Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![],
            delete_head: vec![call("gcd")],
            guard: vec![],
            body: Body::Empty,
            position: Position::synthetic(),
        };
        assert_eq!(rule.kind(), RuleKind::Simplification);
    }

    #[test]
    fn rule_kind_simpagation_when_both_heads_nonempty() {
        let rule = Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![call("m")],
            delete_head: vec![call("m")],
            guard: vec![],
            body: Body::Empty,
            position: Position::synthetic(),
        };
        assert_eq!(rule.kind(), RuleKind::Simpagation);
    }
}
