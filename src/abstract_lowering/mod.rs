//! Abstract lowering (§2 "Abstract lowering", §4.4): the central algorithm,
//! rendered first into a language-neutral pseudo-program.
//!
//! [`crate::host_lowering`] is what actually emits host source text; this
//! module exists so the central matching algorithm of §4.4 can be built
//! and tested once, independent of any textual surface syntax — exactly
//! the separation the specification draws between "the emitted program's
//! *semantics*" (normative, owned here) and "the textual form" (owned by
//! the host-code lowering, out of core scope per §1).

use crate::ast::{Body, Expression, Keyword, Pragma, SequenceKind};
use crate::catalog::{Catalog, ConstraintId, Mode};
use crate::program::{OccurrenceRule, Program};
use std::collections::HashSet;

/// How the active constraint's argument at one position is matched
/// against the incoming tuple (§4.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveParamTest {
    /// `+` — exact equality against the provided argument.
    Ground,
    /// `?` — exact equality, plus a runtime groundness check.
    Any,
    /// `-` — address comparison.
    Mutable,
}

impl From<Mode> for ActiveParamTest {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ground => ActiveParamTest::Ground,
            Mode::Any => ActiveParamTest::Any,
            Mode::Mutable => ActiveParamTest::Mutable,
        }
    }
}

/// Identifies a head constraint inside the occurrence rule being lowered:
/// the active constraint, or one of its partners by position in
/// [`OccurrenceRule::partners`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadPosition {
    Active,
    Partner(usize),
}

/// Where control goes when a body statement fails (`failure`, a failed
/// `%=`, or a nested CHR call returning
/// [`crate::diagnostics::ExecStatus::Failure`]) — §4.4.5's rewind-and-retry
/// is just one instance of this, so every failing body step carries its
/// own target rather than the module hardcoding one failure path.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlTarget {
    /// No enclosing choice/try/behavior: failure ends the whole
    /// activation.
    AbortRule,
    /// Breaks a body-local labeled block, falling through to whatever
    /// follows it (the next `;`-alternative's rewind, or a `try`/`behavior`
    /// node's failure branch). `value` is `Some` when the block is typed
    /// (e.g. a `try` node's boolean outcome).
    BreakLabel { label: String, value: Option<bool> },
}

/// One step of the language-neutral pseudo-program §4.4 describes. This
/// is not executed anywhere in this crate (§1 "the core performs no
/// execution at compile time"); it exists to be inspected, printed, and
/// tested, and to be walked by [`crate::host_lowering`].
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractStep {
    /// Block entry, labeled by `(symbol, occurrence#)` (§4.4).
    EnterOccurrence { constraint: String, occurrence: usize },
    /// `STORE_ACTIVE`.
    StoreActive,
    /// `if S.empty: goto O_inapplicable`, for one partner's store.
    CheckPartnerStoreNonEmpty { partner: usize },
    /// Test the active constraint's argument at `position` against the
    /// incoming tuple; jumps to `O_inapplicable` on mismatch (§4.4.1).
    TestActiveArg { position: usize, mode: ActiveParamTest },
    /// Bind a local to the active constraint's argument at `position`
    /// (only reached when the position is a fresh logical variable, not a
    /// literal or already-bound repeat).
    BindActiveLocal { position: usize },
    /// A repeated logical variable within the active constraint's own
    /// head pattern implies an equality constraint between two of its
    /// positions (§4.4.1 last sentence).
    RequireHeadEquality { a: usize, b: usize },
    /// Evaluate guard part `part` (0 = right after the active constraint).
    EmitGuardPart { part: usize },
    /// Opens an iteration loop over partner `partner`'s store, optionally
    /// through an index (§4.4.2).
    OpenPartnerLoop { partner: usize, indexed: Option<usize> },
    /// Test partner `partner`'s argument at `position` against the bound
    /// tuple; on mismatch, continues the innermost loop without removing.
    TestPartnerArg { partner: usize, position: usize },
    BindPartnerLocal { partner: usize, position: usize },
    /// Two head positions name the same symbol: their constraint ids must
    /// differ unless a `bang` pragma is present on either side (§4.4.2,
    /// §13 open question 1 — "suppress more, not less").
    RequireCidInequality { a: HeadPosition, b: HeadPosition },
    /// Propagation-with-history check (§4.4.4): on failure, behaves like
    /// [`AbstractStep::GotoNextMatching`] targeting `retry_at`.
    HistoryCheck { retry_at: Option<usize> },
    /// Advances the loop at `partner` without removing its constraint —
    /// reached when a guard clause in the part right after `partner`
    /// fails (§4.4.3).
    GotoNextMatching { partner: Option<usize> },
    /// The rule fires: statistics increment (§11 "Per-rule... statistics").
    CommitRule,
    RemoveActive,
    RemovePartner { partner: usize },

    // --- Body lowering (§4.4.5, §4.4.6, §3.2 "Behavior"/"Try" nodes) ---
    /// `stop` — the body terminates early; the activation still succeeds.
    BodyStop,
    /// `failure`, a failed `%=`, or a nested CHR call that returned
    /// [`crate::diagnostics::ExecStatus::Failure`].
    BodyFail { on_failure: ControlTarget },
    /// A plain host-expression statement.
    BodyHostExpr { expr: Expression },
    /// `T v = expr;`.
    BodyHostDecl { var_type: String, var_name: String, init: Expression },
    /// `left %= right`.
    BodyUnify {
        left: Expression,
        right: Expression,
        on_failure: ControlTarget,
    },
    /// A CHR call in the body that is *not* the §4.4.6 tail-call case.
    BodyChrCall {
        constraint: String,
        args: Vec<Expression>,
        on_failure: ControlTarget,
    },
    /// First read of a body-local existential variable (not bound by the
    /// head): allocated once, before the step that reads it.
    DeclareFreshVar { name: String },
    /// §4.4.6: the body's terminal statement calls the active constraint's
    /// own symbol on every control-flow path — rebind the arguments and
    /// goto (rather than recurse into) the symbol's own entry point instead
    /// of growing the call stack.
    TailCallGoto { args: Vec<Expression> },

    /// Opens a `;`-disjunction choice point (§4.4.5): records the depth
    /// every alternative starts from.
    OpenChoice { id: usize },
    /// Begins alternative `index` of choice `id`. Every alternative after
    /// the first first rewinds to the depth `OpenChoice` recorded, then all
    /// alternatives open one fresh depth for their own attempt.
    BeginAlternative { id: usize, index: usize },
    /// Ends alternative `index`: reached only if it ran to completion
    /// without diverting to its `on_failure` target, meaning it succeeded —
    /// so this breaks out of the whole choice.
    EndAlternative { id: usize, index: usize },
    CloseChoice { id: usize },

    /// `try`/`try_bt` (§11 supplement): opens a depth and binds
    /// `outcome_var` to whether `body` completed without failing.
    OpenTry { id: usize, outcome_var: String },
    /// Closes the try block; rewinds the depth `OpenTry` opened when the
    /// body failed, or unconditionally when `always_rewind` (`try_bt`).
    CloseTry {
        id: usize,
        outcome_var: String,
        always_rewind: bool,
    },

    /// `behavior { ... }` (§3.2 "Behavior node"): opens the bounded-search
    /// loop `exists`/`forall` desugar into.
    OpenBehaviorLoop { id: usize },
    /// `if stop_condition { break }`.
    BehaviorStopCheck { id: usize, stop_condition: Expression },
    /// Begins `behavior_body`'s own labeled block, whose outcome selects
    /// `on_succeeded_alt`/`on_failed_alt`.
    OpenBehaviorBody { id: usize },
    CloseBehaviorBody { id: usize },
    /// Branches on `behavior_body`'s outcome into `on_succeeded_alt`
    /// (`BranchElse` switches to `on_failed_alt`, `BranchEnd` closes it).
    BranchOnBehaviorOutcome { id: usize },
    CloseBehaviorLoop { id: usize },
    /// After the loop: branches on `final_status` into
    /// `on_succeeded_status`/`on_failed_status`.
    BehaviorStatusBranch { id: usize, final_status: Expression },
    /// Generic two-way branch arm switch/close, shared by both
    /// `BranchOnBehaviorOutcome` and `BehaviorStatusBranch`.
    BranchElse,
    BranchEnd,

    CheckAliveActive,
    CheckAlivePartner { partner: usize },
    AdvancePartnerIterator { partner: usize },
    ExitSuccessOfActivation,
    /// Closes loops in LIFO order, i.e. innermost first.
    ClosePartnerLoop { partner: usize },
    /// `O_inapplicable:` — fallthrough target for every "mismatch" jump
    /// above.
    InapplicableLabel,
}

/// Lowers one occurrence rule into its ordered abstract-step program
/// (§4.4's central pseudocode, transcribed step for step).
pub fn lower_occurrence(program: &Program, catalog: &Catalog, occ: &OccurrenceRule) -> Vec<AbstractStep> {
    let rule = program.rule(occ.rule);
    let mut steps = Vec::new();

    steps.push(AbstractStep::EnterOccurrence {
        constraint: catalog.get(occ.active.constraint).name.clone(),
        occurrence: occ.active_constraint_occurrence,
    });

    if occ.active.call.pragmas.contains(Pragma::Bang) {
        steps.push(AbstractStep::StoreActive);
    }

    for (i, _partner) in occ.partners.iter().enumerate() {
        steps.push(AbstractStep::CheckPartnerStoreNonEmpty { partner: i });
    }

    let active_decl = catalog.get(occ.active.constraint);
    let mut seen_positions: Vec<(usize, &str)> = Vec::new();
    for (i, param) in active_decl.params.iter().enumerate() {
        if let Some(arg) = occ.active.call.args.get(i) {
            if let crate::ast::Expression::LogicalVar { name, .. } = arg {
                if let Some((earlier, _)) = seen_positions.iter().find(|(_, n)| n == name) {
                    steps.push(AbstractStep::RequireHeadEquality { a: *earlier, b: i });
                } else {
                    steps.push(AbstractStep::BindActiveLocal { position: i });
                    seen_positions.push((i, name));
                }
                continue;
            }
        }
        steps.push(AbstractStep::TestActiveArg {
            position: i,
            mode: ActiveParamTest::from(param.mode),
        });
    }

    steps.push(AbstractStep::EmitGuardPart { part: 0 });

    for (k, partner) in occ.partners.iter().enumerate() {
        steps.push(AbstractStep::OpenPartnerLoop {
            partner: k,
            indexed: partner.use_index,
        });

        let partner_decl = catalog.get(partner.constraint);
        let mut partner_seen: Vec<(usize, &str)> = Vec::new();
        for (pos, _p) in partner_decl.params.iter().enumerate() {
            if let Some(arg) = partner.call.args.get(pos) {
                if let crate::ast::Expression::LogicalVar { name, .. } = arg {
                    if partner_seen.iter().any(|(_, n)| n == name) {
                        // repeat within this partner's own pattern behaves
                        // like a test, not a bind
                        steps.push(AbstractStep::TestPartnerArg { partner: k, position: pos });
                    } else {
                        steps.push(AbstractStep::BindPartnerLocal { partner: k, position: pos });
                        partner_seen.push((pos, name));
                    }
                    continue;
                }
            }
            steps.push(AbstractStep::TestPartnerArg { partner: k, position: pos });
        }

        steps.push(AbstractStep::EmitGuardPart { part: k + 1 });

        let same_symbol_before = same_symbol_requires_inequality(occ, k, catalog);
        for other in same_symbol_before {
            steps.push(AbstractStep::RequireCidInequality {
                a: other,
                b: HeadPosition::Partner(k),
            });
        }
    }

    let innermost_deletable = innermost_deletable_partner(occ);
    if rule.has_history() {
        steps.push(AbstractStep::HistoryCheck {
            retry_at: innermost_deletable,
        });
    }

    steps.push(AbstractStep::CommitRule);

    debug_assert!(
        !(never_stored(catalog, occ.active.constraint) && occ.store_active_constraint),
        "never-stored constraint must not be marked for storage (§8 \"Never-stored closure\")"
    );
    if occ.store_active_constraint {
        steps.push(AbstractStep::StoreActive);
    } else if !occ.active.keep {
        steps.push(AbstractStep::RemoveActive);
    }

    for (k, partner) in occ.partners.iter().enumerate().rev() {
        if !partner.keep {
            steps.push(AbstractStep::RemovePartner { partner: k });
        }
    }

    let active_name = catalog.get(occ.active.constraint).name.clone();
    let tail_call_eligible = rule.body.is_tail_call_to(&active_name);
    let mut ctx = BodyLoweringCtx {
        active_name,
        head_vars: head_var_names(occ),
        declared_fresh: HashSet::new(),
        next_id: 0,
    };
    lower_body(&rule.body, tail_call_eligible, &ControlTarget::AbortRule, &mut ctx, &mut steps);

    if occ.active.keep {
        if occ.store_active_constraint {
            steps.push(AbstractStep::CheckAliveActive);
        }
        let kept_partners: Vec<usize> = occ
            .partners
            .iter()
            .enumerate()
            .filter(|(_, p)| p.keep)
            .map(|(i, _)| i)
            .collect();
        for (idx, &partner) in kept_partners.iter().enumerate() {
            if idx + 1 < kept_partners.len() {
                steps.push(AbstractStep::CheckAlivePartner { partner });
            } else {
                steps.push(AbstractStep::AdvancePartnerIterator { partner });
            }
        }
    } else {
        steps.push(AbstractStep::ExitSuccessOfActivation);
    }

    for k in (0..occ.partners.len()).rev() {
        steps.push(AbstractStep::ClosePartnerLoop { partner: k });
    }

    steps.push(AbstractStep::InapplicableLabel);

    steps
}

/// Lowers every occurrence rule of a program, in the order given.
pub fn lower_program(program: &Program, catalog: &Catalog, occurrences: &[OccurrenceRule]) -> Vec<Vec<AbstractStep>> {
    occurrences.iter().map(|occ| lower_occurrence(program, catalog, occ)).collect()
}

/// Head positions, among the active constraint and partners `0..k`, that
/// name the same symbol as partner `k` and therefore need a cid
/// inequality test against it — unless a `bang` pragma on either side
/// suppresses it (§4.4.2, §13 OQ1: a `bang` on *either* side suppresses).
fn same_symbol_requires_inequality(occ: &OccurrenceRule, k: usize, catalog: &Catalog) -> Vec<HeadPosition> {
    let this_name = &catalog.get(occ.partners[k].constraint).name;
    let this_bang = occ.partners[k].call.pragmas.contains(Pragma::Bang);
    let mut out = Vec::new();

    let active_name = &catalog.get(occ.active.constraint).name;
    if active_name == this_name {
        let active_bang = occ.active.call.pragmas.contains(Pragma::Bang);
        if !this_bang && !active_bang {
            out.push(HeadPosition::Active);
        }
    }

    for j in 0..k {
        let other_name = &catalog.get(occ.partners[j].constraint).name;
        if other_name == this_name {
            let other_bang = occ.partners[j].call.pragmas.contains(Pragma::Bang);
            if !this_bang && !other_bang {
                out.push(HeadPosition::Partner(j));
            }
        }
    }
    out
}

/// The innermost partner in a delete position, if any — where a failed
/// history check resumes the search (§4.4, "goto next matching step at
/// innermost deletable partner").
fn innermost_deletable_partner(occ: &OccurrenceRule) -> Option<usize> {
    occ.partners.iter().enumerate().rev().find(|(_, p)| !p.keep).map(|(i, _)| i)
}

/// True if any never-stored constraint reachable from `id` would make
/// `STORE_ACTIVE` on `id` dead code — used by tests asserting §8's
/// "Never-stored closure" invariant against the lowered step stream.
pub fn emits_store_active_for(steps: &[AbstractStep]) -> bool {
    steps.iter().any(|s| matches!(s, AbstractStep::StoreActive))
}

/// True if `id` is declared `never_stored` — checked against
/// `store_active_constraint` in [`lower_occurrence`] (§8 "Never-stored
/// closure": a never-stored constraint must never reach `STORE_ACTIVE`).
fn never_stored(catalog: &Catalog, id: ConstraintId) -> bool {
    catalog.get(id).never_stored
}

/// Names of every logical variable bound by the occurrence's head (active
/// constraint plus all partners) — the set [`lower_body`] checks a body
/// `LogicalVar` against to decide whether it is already bound or needs a
/// fresh allocation (§3.2, §4.4.6).
fn head_var_names(occ: &OccurrenceRule) -> HashSet<String> {
    let mut out = HashSet::new();
    for arg in &occ.active.call.args {
        if let Expression::LogicalVar { name, .. } = arg {
            out.insert(name.clone());
        }
    }
    for partner in &occ.partners {
        for arg in &partner.call.args {
            if let Expression::LogicalVar { name, .. } = arg {
                out.insert(name.clone());
            }
        }
    }
    out
}

/// Threaded through [`lower_body`]'s recursion: which head variables are
/// already bound, which body-local existentials have already been declared,
/// and the next fresh id for a choice/try/behavior block's labels.
struct BodyLoweringCtx {
    active_name: String,
    head_vars: HashSet<String>,
    declared_fresh: HashSet<String>,
    next_id: usize,
}

/// Pushes a [`AbstractStep::DeclareFreshVar`] for every logical variable
/// `expr` reads that is neither head-bound nor already declared, in sorted
/// order so the emitted step stream is deterministic regardless of
/// `HashSet` iteration order (§8 "Index set monotonicity" holds the wider
/// repo to this same determinism bar).
fn declare_fresh_vars(expr: &Expression, ctx: &mut BodyLoweringCtx, out: &mut Vec<AbstractStep>) {
    let mut names: Vec<String> = expr.logical_vars().into_iter().collect();
    names.sort();
    for name in names {
        if !ctx.head_vars.contains(&name) && ctx.declared_fresh.insert(name.clone()) {
            out.push(AbstractStep::DeclareFreshVar { name });
        }
    }
}

/// Walks a rule body into the ordered step stream §4.4.5/§4.4.6 describe.
///
/// `is_tail_position` starts as `body.is_tail_call_to(active_name)` at the
/// call in [`lower_occurrence`] and is threaded down using exactly that
/// method's own recursion rules (last part of a `,`-sequence, every part of
/// a `;`-sequence) — so a `ChrCall` leaf only becomes a
/// [`AbstractStep::TailCallGoto`] where `is_tail_call_to` itself would have
/// returned `true` for the whole body.
fn lower_body(body: &Body, is_tail_position: bool, on_failure: &ControlTarget, ctx: &mut BodyLoweringCtx, out: &mut Vec<AbstractStep>) {
    match body {
        Body::Empty => {}
        Body::Keyword { keyword: Keyword::Success, .. } => {}
        Body::Keyword { keyword: Keyword::Stop, .. } => out.push(AbstractStep::BodyStop),
        Body::Keyword { keyword: Keyword::Failure, .. } => out.push(AbstractStep::BodyFail {
            on_failure: on_failure.clone(),
        }),
        Body::HostExpression { expr, .. } => {
            declare_fresh_vars(expr, ctx, out);
            out.push(AbstractStep::BodyHostExpr { expr: expr.clone() });
        }
        Body::HostDecl { var_type, var_name, init, .. } => {
            declare_fresh_vars(init, ctx, out);
            out.push(AbstractStep::BodyHostDecl {
                var_type: var_type.clone(),
                var_name: var_name.clone(),
                init: init.clone(),
            });
        }
        Body::Unification { left, right, .. } => {
            declare_fresh_vars(left, ctx, out);
            declare_fresh_vars(right, ctx, out);
            out.push(AbstractStep::BodyUnify {
                left: left.clone(),
                right: right.clone(),
                on_failure: on_failure.clone(),
            });
        }
        Body::ChrCall(call) => {
            for arg in &call.args {
                declare_fresh_vars(arg, ctx, out);
            }
            if is_tail_position && call.constraint == ctx.active_name {
                out.push(AbstractStep::TailCallGoto { args: call.args.clone() });
            } else {
                out.push(AbstractStep::BodyChrCall {
                    constraint: call.constraint.clone(),
                    args: call.args.clone(),
                    on_failure: on_failure.clone(),
                });
            }
        }
        Body::Sequence {
            kind: SequenceKind::Conjunctive,
            parts,
        } => {
            for (i, part) in parts.iter().enumerate() {
                let last = i + 1 == parts.len();
                lower_body(part, is_tail_position && last, on_failure, ctx, out);
            }
        }
        Body::Sequence {
            kind: SequenceKind::Disjunctive,
            parts,
        } => {
            let id = ctx.next_id;
            ctx.next_id += 1;
            out.push(AbstractStep::OpenChoice { id });
            for (i, part) in parts.iter().enumerate() {
                let is_last = i + 1 == parts.len();
                out.push(AbstractStep::BeginAlternative { id, index: i });
                let alt_failure = if is_last {
                    on_failure.clone()
                } else {
                    ControlTarget::BreakLabel {
                        label: format!("alt_{id}_{i}"),
                        value: None,
                    }
                };
                lower_body(part, is_tail_position, &alt_failure, ctx, out);
                out.push(AbstractStep::EndAlternative { id, index: i });
            }
            out.push(AbstractStep::CloseChoice { id });
        }
        Body::Try(t) => {
            let id = ctx.next_id;
            ctx.next_id += 1;
            out.push(AbstractStep::OpenTry {
                id,
                outcome_var: t.outcome_var.clone(),
            });
            let body_failure = ControlTarget::BreakLabel {
                label: format!("try_{id}_body"),
                value: Some(false),
            };
            lower_body(&t.body, false, &body_failure, ctx, out);
            out.push(AbstractStep::CloseTry {
                id,
                outcome_var: t.outcome_var.clone(),
                always_rewind: t.always_rewind,
            });
        }
        Body::Behavior(b) => {
            let id = ctx.next_id;
            ctx.next_id += 1;
            declare_fresh_vars(&b.stop_condition, ctx, out);
            out.push(AbstractStep::OpenBehaviorLoop { id });
            out.push(AbstractStep::BehaviorStopCheck {
                id,
                stop_condition: b.stop_condition.clone(),
            });
            out.push(AbstractStep::OpenBehaviorBody { id });
            let body_failure = ControlTarget::BreakLabel {
                label: format!("behavior_{id}_body"),
                value: Some(false),
            };
            lower_body(&b.behavior_body, false, &body_failure, ctx, out);
            out.push(AbstractStep::CloseBehaviorBody { id });
            out.push(AbstractStep::BranchOnBehaviorOutcome { id });
            lower_body(&b.on_succeeded_alt, false, on_failure, ctx, out);
            out.push(AbstractStep::BranchElse);
            lower_body(&b.on_failed_alt, false, on_failure, ctx, out);
            out.push(AbstractStep::BranchEnd);
            out.push(AbstractStep::CloseBehaviorLoop { id });
            declare_fresh_vars(&b.final_status, ctx, out);
            out.push(AbstractStep::BehaviorStatusBranch {
                id,
                final_status: b.final_status.clone(),
            });
            lower_body(&b.on_succeeded_status, false, on_failure, ctx, out);
            out.push(AbstractStep::BranchElse);
            lower_body(&b.on_failed_status, false, on_failure, ctx, out);
            out.push(AbstractStep::BranchEnd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{builders::ExprBuilder, Body, ConstraintCall, PragmaSet};
    use crate::catalog::{ConstraintDecl, Mode, Parameter};
    use crate::occurrence::expand_program;
    use crate::position::Position;
    use crate::program::{Rule, RuleId};
    use crate::reorder;
    use crate::config::Config;

    fn ground_param() -> Parameter {
        Parameter {
            mode: Mode::Any,
            type_text: "int".into(),
        }
    }

    fn leq_program() -> (Program, Catalog) {
        let mut catalog = Catalog::new();
        catalog
            .declare(ConstraintDecl::new("leq", vec![ground_param(), ground_param()], vec![]))
            .unwrap();
        let e = ExprBuilder::at(Position::synthetic());
        let call = |args: Vec<crate::ast::Expression>| ConstraintCall {
            constraint: "leq".into(),
            args,
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        };
        let mut program = Program::new("LEQ", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: Some("transitivity".into()),
            keep_head: vec![
                call(vec![e.logical_var("X"), e.logical_var("Y")]),
                call(vec![e.logical_var("Y"), e.logical_var("Z")]),
            ],
            delete_head: vec![],
            guard: vec![],
            body: Body::ChrCall(call(vec![e.logical_var("X"), e.logical_var("Z")])),
            position: Position::synthetic(),
        });
        (program, catalog)
    }

    #[test]
    fn leq_occurrence_zero_emits_history_check_before_commit() {
        let (program, mut catalog) = leq_program();
        let mut occurrences = expand_program(&program, &catalog);
        reorder::run(&mut occurrences, &mut catalog, &Config::default());

        let steps = lower_occurrence(&program, &catalog, &occurrences[0]);
        let history_pos = steps.iter().position(|s| matches!(s, AbstractStep::HistoryCheck { .. }));
        let commit_pos = steps.iter().position(|s| matches!(s, AbstractStep::CommitRule));
        assert!(history_pos.is_some());
        assert!(history_pos.unwrap() < commit_pos.unwrap());
    }

    #[test]
    fn kept_active_never_stored_skips_store_active() {
        let (program, mut catalog) = leq_program();
        catalog.get_mut(catalog.lookup("leq").unwrap()).never_stored = true;
        let mut occurrences = expand_program(&program, &catalog);
        // force the late-storage decision consistent with never_stored
        for occ in &mut occurrences {
            occ.store_active_constraint = false;
        }
        reorder::run(&mut occurrences, &mut catalog, &Config::default());
        for occ in &occurrences {
            let steps = lower_occurrence(&program, &catalog, occ);
            assert!(!emits_store_active_for(&steps));
        }
    }

    #[test]
    fn bang_on_partner_suppresses_cid_inequality_against_active() {
        let mut catalog = Catalog::new();
        catalog
            .declare(ConstraintDecl::new("a", vec![ground_param()], vec![]))
            .unwrap();
        let e = ExprBuilder::at(Position::synthetic());
        let mut bang_pragmas = PragmaSet::new();
        bang_pragmas.insert(Pragma::Bang);
        let active_call = ConstraintCall {
            constraint: "a".into(),
            args: vec![e.logical_var("X")],
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        };
        let partner_call = ConstraintCall {
            constraint: "a".into(),
            args: vec![e.logical_var("Y")],
            pragmas: bang_pragmas,
            position: Position::synthetic(),
        };
        let mut program = Program::new("P", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![active_call, partner_call],
            delete_head: vec![],
            guard: vec![],
            body: Body::Empty,
            position: Position::synthetic(),
        });
        let mut occurrences = expand_program(&program, &catalog);
        reorder::run(&mut occurrences, &mut catalog, &Config::default());

        let steps = lower_occurrence(&program, &catalog, &occurrences[0]);
        assert!(!steps.iter().any(|s| matches!(s, AbstractStep::RequireCidInequality { .. })));
    }
}
