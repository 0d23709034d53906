//! Host-code lowering (§2 "Host-code lowering", §4.4, §4.5).
//!
//! Walks the [`crate::abstract_lowering`] step stream for every occurrence
//! rule and renders it into the real textual matching program the
//! specification describes — one labeled block per occurrence, nested
//! nowhere a `goto` would do instead (§9 "Coroutine-like partner
//! iteration": "emit them as explicit loops with labels rather than
//! coroutines"). The specification is explicit that the *textual form* of
//! the host language is out of the core's scope (§1); what follows is one
//! reasonable rendering, kept close to Rust syntax so the emitted source
//! reads like ordinary code linked against [`crate::runtime`] rather than
//! an invented templating language.

use crate::abstract_lowering::{self, AbstractStep, ActiveParamTest, ControlTarget, HeadPosition};
use crate::ast::Expression;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::program::{OccurrenceRule, Program};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Lowers every occurrence rule of a program into its host dispatch
/// functions (§4.5), one per CHR constraint symbol, in the order the
/// occurrences were given (i.e. after §4.3's reordering has already run).
pub fn lower_program(program: &Program, catalog: &Catalog, occurrences: &[OccurrenceRule], config: &Config) -> String {
    let mut out = String::new();
    let mut order: Vec<String> = Vec::new();
    let mut by_symbol: std::collections::HashMap<String, Vec<&OccurrenceRule>> = std::collections::HashMap::new();
    for occ in occurrences {
        let name = catalog.get(occ.active.constraint).name.clone();
        if !by_symbol.contains_key(&name) {
            order.push(name.clone());
        }
        by_symbol.entry(name).or_default().push(occ);
    }

    for name in &order {
        emit_dispatch(&mut out, program, catalog, name, &by_symbol[name], config);
    }
    out
}

fn emit_dispatch(out: &mut String, program: &Program, catalog: &Catalog, name: &str, occs: &[&OccurrenceRule], config: &Config) {
    let decl = catalog.get(catalog.lookup(name).expect("declared constraint"));

    if config.line_error {
        writeln!(out, "// --- {name}: {} occurrence(s) ---", occs.len()).unwrap();
    }

    writeln!(out, "fn do_{name}(engine: &mut Engine, tuple: &Tuple, mut it: PartnerIter) -> ExecStatus {{").unwrap();
    if config.trace {
        writeln!(out, "    tracing::trace!(constraint = \"{name}\", \"dispatch entered\");").unwrap();
    }
    for occ in occs {
        emit_occurrence_block(out, program, catalog, occ, config);
    }
    if decl.never_stored {
        // §8 "Never-stored closure": no STORE_ACTIVE fallthrough path exists.
        writeln!(out, "    ExecStatus::Success").unwrap();
    } else {
        writeln!(out, "    engine.store_{name}(tuple.clone());").unwrap();
        writeln!(out, "    ExecStatus::Success").unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "fn {name}(engine: &mut Engine, args: Tuple) -> ExecStatus {{").unwrap();
    writeln!(out, "    let cid = engine.fresh_cid();").unwrap();
    writeln!(out, "    do_{name}(engine, &args, PartnerIter::sentinel())").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn emit_occurrence_block(out: &mut String, program: &Program, catalog: &Catalog, occ: &OccurrenceRule, config: &Config) {
    let steps = abstract_lowering::lower_occurrence(program, catalog, occ);
    let name = catalog.get(occ.active.constraint).name.clone();
    let block_label = format!("{name}_{}", occ.active_constraint_occurrence);
    let regs = head_var_registers(occ);

    writeln!(out, "    '{block_label}: loop {{").unwrap();
    let mut indent: usize = 2;
    let pad = |n: usize| "    ".repeat(n);

    for step in &steps {
        match step {
            AbstractStep::EnterOccurrence { constraint, occurrence } => {
                writeln!(out, "{}// enter {constraint}_{occurrence}", pad(indent)).unwrap();
            }
            AbstractStep::StoreActive => {
                writeln!(out, "{}engine.store_{name}(tuple.clone());", pad(indent)).unwrap();
            }
            AbstractStep::CheckPartnerStoreNonEmpty { partner } => {
                writeln!(
                    out,
                    "{}if engine.store_{}().empty() {{ break '{block_label}; }}",
                    pad(indent),
                    partner_symbol(occ, catalog, *partner)
                )
                .unwrap();
            }
            AbstractStep::TestActiveArg { position, mode } => {
                writeln!(out, "{}{}", pad(indent), test_expr("tuple", *position, *mode)).unwrap();
            }
            AbstractStep::BindActiveLocal { position } => {
                writeln!(out, "{}let a{position} = tuple.arg({position});", pad(indent)).unwrap();
            }
            AbstractStep::RequireHeadEquality { a, b } => {
                writeln!(
                    out,
                    "{}if !engine.vars.unify(depth, tuple.arg({a}), tuple.arg({b})) {{ break '{block_label}; }}",
                    pad(indent)
                )
                .unwrap();
            }
            AbstractStep::EmitGuardPart { part } => {
                writeln!(out, "{}/* guard part {part} */", pad(indent)).unwrap();
            }
            AbstractStep::OpenPartnerLoop { partner, indexed } => {
                let label = format!("{block_label}_p{partner}");
                let source = match indexed {
                    Some(ix) => format!("engine.store_{}().begin_indexed({ix}, key_p{partner})", partner_symbol(occ, catalog, *partner)),
                    None => format!("engine.store_{}().begin()", partner_symbol(occ, catalog, *partner)),
                };
                writeln!(out, "{}let mut it_p{partner} = {source};", pad(indent)).unwrap();
                writeln!(out, "{}'{label}: while !it_p{partner}.at_end() {{", pad(indent)).unwrap();
                indent += 1;
                writeln!(out, "{}it_p{partner}.lock(engine.store_mut_{}());", pad(indent), partner_symbol(occ, catalog, *partner)).unwrap();
            }
            AbstractStep::TestPartnerArg { partner, position } => {
                writeln!(
                    out,
                    "{}if !p{partner}_eq({position}) {{ it_p{partner}.next_and_unlock(engine.store_mut_{}()); continue '{block_label}_p{partner}; }}",
                    pad(indent),
                    partner_symbol(occ, catalog, *partner)
                )
                .unwrap();
            }
            AbstractStep::BindPartnerLocal { partner, position } => {
                writeln!(out, "{}let p{partner}_a{position} = it_p{partner}.current_arg({position});", pad(indent)).unwrap();
            }
            AbstractStep::RequireCidInequality { a, b } => {
                writeln!(
                    out,
                    "{}if {} == {} {{ continue '{block_label}_{}; }}",
                    pad(indent),
                    head_cid_expr(a),
                    head_cid_expr(b),
                    partner_label_suffix(b)
                )
                .unwrap();
            }
            AbstractStep::HistoryCheck { retry_at } => {
                let target = match retry_at {
                    Some(p) => format!("'{block_label}_p{p}"),
                    None => format!("'{block_label}"),
                };
                writeln!(
                    out,
                    "{}if !engine.history_{name}_{}.check(depth, vec![{}]) {{ continue {target}; }}",
                    pad(indent),
                    occ.active_constraint_occurrence,
                    history_tuple_expr(occ)
                )
                .unwrap();
            }
            AbstractStep::GotoNextMatching { partner } => {
                let target = match partner {
                    Some(p) => format!("'{block_label}_p{p}"),
                    None => format!("'{block_label}"),
                };
                writeln!(out, "{}continue {target};", pad(indent)).unwrap();
            }
            AbstractStep::CommitRule => {
                writeln!(out, "{}engine.stats.record_firing();", pad(indent)).unwrap();
            }
            AbstractStep::RemoveActive => {
                writeln!(out, "{}// active constraint not kept: never reaches the store", pad(indent)).unwrap();
            }
            AbstractStep::RemovePartner { partner } => {
                writeln!(out, "{}it_p{partner}.kill(engine.store_mut_{}());", pad(indent), partner_symbol(occ, catalog, *partner)).unwrap();
            }
            AbstractStep::BodyStop => {
                writeln!(out, "{}return ExecStatus::Success;", pad(indent)).unwrap();
            }
            AbstractStep::BodyFail { on_failure } => {
                writeln!(out, "{}{}", pad(indent), render_control_target(on_failure, &block_label)).unwrap();
            }
            AbstractStep::BodyHostExpr { expr } => {
                writeln!(out, "{}{};", pad(indent), render_expr(expr, &regs)).unwrap();
            }
            AbstractStep::BodyHostDecl { var_type, var_name, init } => {
                writeln!(out, "{}let mut {var_name}: {var_type} = {};", pad(indent), render_expr(init, &regs)).unwrap();
            }
            AbstractStep::BodyUnify { left, right, on_failure } => {
                writeln!(
                    out,
                    "{}if !engine.vars.unify(depth, {}, {}) {{ {} }}",
                    pad(indent),
                    render_expr(left, &regs),
                    render_expr(right, &regs),
                    render_control_target(on_failure, &block_label)
                )
                .unwrap();
            }
            AbstractStep::BodyChrCall { constraint, args, on_failure } => {
                writeln!(
                    out,
                    "{}if {}(engine, Tuple::new(vec![{}])) == ExecStatus::Failure {{ {} }}",
                    pad(indent),
                    constraint,
                    render_args(args, &regs),
                    render_control_target(on_failure, &block_label)
                )
                .unwrap();
            }
            AbstractStep::DeclareFreshVar { name: var } => {
                writeln!(out, "{}let v_{var} = engine.vars.fresh();", pad(indent)).unwrap();
            }
            AbstractStep::TailCallGoto { args } => {
                writeln!(out, "{}return {name}(engine, Tuple::new(vec![{}]));", pad(indent), render_args(args, &regs)).unwrap();
            }
            AbstractStep::OpenChoice { id } => {
                writeln!(out, "{}let choice_depth_{id} = engine.backtrack.depth();", pad(indent)).unwrap();
                writeln!(out, "{}'choice_{id}: loop {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::BeginAlternative { id, index } => {
                if *index > 0 {
                    writeln!(out, "{}engine.backtrack.back_to(choice_depth_{id});", pad(indent)).unwrap();
                    writeln!(out, "{}engine.backtrack.reset();", pad(indent)).unwrap();
                }
                writeln!(out, "{}engine.backtrack.inc_depth();", pad(indent)).unwrap();
                writeln!(out, "{}'alt_{id}_{index}: {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::EndAlternative { id, .. } => {
                writeln!(out, "{}break 'choice_{id};", pad(indent)).unwrap();
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}}", pad(indent)).unwrap();
            }
            AbstractStep::CloseChoice { id } => {
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}}", pad(indent)).unwrap();
                let _ = id;
            }
            AbstractStep::OpenTry { id, outcome_var } => {
                writeln!(out, "{}let try_depth_{id} = engine.backtrack.depth();", pad(indent)).unwrap();
                writeln!(out, "{}engine.backtrack.inc_depth();", pad(indent)).unwrap();
                writeln!(out, "{}let {outcome_var} = 'try_{id}_body: {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::CloseTry { id, outcome_var, always_rewind } => {
                writeln!(out, "{}true", pad(indent)).unwrap();
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}};", pad(indent)).unwrap();
                if *always_rewind {
                    writeln!(out, "{}engine.backtrack.back_to(try_depth_{id});", pad(indent)).unwrap();
                    writeln!(out, "{}engine.backtrack.reset();", pad(indent)).unwrap();
                } else {
                    writeln!(
                        out,
                        "{}if !{outcome_var} {{ engine.backtrack.back_to(try_depth_{id}); engine.backtrack.reset(); }}",
                        pad(indent)
                    )
                    .unwrap();
                }
            }
            AbstractStep::OpenBehaviorLoop { id } => {
                writeln!(out, "{}let behavior_final_{id};", pad(indent)).unwrap();
                writeln!(out, "{}'behavior_{id}: loop {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::BehaviorStopCheck { id, stop_condition } => {
                writeln!(out, "{}if {} {{ break 'behavior_{id}; }}", pad(indent), render_expr(stop_condition, &regs)).unwrap();
            }
            AbstractStep::OpenBehaviorBody { id } => {
                writeln!(out, "{}let behavior_body_ok_{id} = 'behavior_{id}_body: {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::CloseBehaviorBody { id } => {
                writeln!(out, "{}true", pad(indent)).unwrap();
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}};", pad(indent)).unwrap();
                let _ = id;
            }
            AbstractStep::BranchOnBehaviorOutcome { id } => {
                writeln!(out, "{}if behavior_body_ok_{id} {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::CloseBehaviorLoop { id } => {
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}}", pad(indent)).unwrap();
                let _ = id;
            }
            AbstractStep::BehaviorStatusBranch { id, final_status } => {
                writeln!(out, "{}behavior_final_{id} = {};", pad(indent), render_expr(final_status, &regs)).unwrap();
                writeln!(out, "{}if behavior_final_{id} {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::BranchElse => {
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}} else {{", pad(indent)).unwrap();
                indent += 1;
            }
            AbstractStep::BranchEnd => {
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}}", pad(indent)).unwrap();
            }
            AbstractStep::CheckAliveActive => {
                writeln!(out, "{}if !engine.store_{name}().get(active_slot).is_some() {{ break '{block_label}; }}", pad(indent)).unwrap();
            }
            AbstractStep::CheckAlivePartner { partner } => {
                writeln!(
                    out,
                    "{}if !it_p{partner}.valid(engine.store_{}()) {{ break '{block_label}; }}",
                    pad(indent),
                    partner_symbol(occ, catalog, *partner)
                )
                .unwrap();
            }
            AbstractStep::AdvancePartnerIterator { partner } => {
                writeln!(out, "{}it_p{partner}.next_and_unlock(engine.store_mut_{}());", pad(indent), partner_symbol(occ, catalog, *partner)).unwrap();
            }
            AbstractStep::ExitSuccessOfActivation => {
                writeln!(out, "{}return ExecStatus::Success;", pad(indent)).unwrap();
            }
            AbstractStep::ClosePartnerLoop { partner } => {
                writeln!(out, "{}it_p{partner}.unlock(engine.store_mut_{}());", pad(indent), partner_symbol(occ, catalog, *partner)).unwrap();
                indent = indent.saturating_sub(1);
                writeln!(out, "{}}}", pad(indent)).unwrap();
            }
            AbstractStep::InapplicableLabel => {
                writeln!(out, "{}break '{block_label};", pad(indent)).unwrap();
            }
        }
    }
    writeln!(out, "    }}").unwrap();
}

fn partner_symbol(occ: &OccurrenceRule, catalog: &Catalog, partner: usize) -> String {
    catalog.get(occ.partners[partner].constraint).name.clone()
}

fn partner_label_suffix(pos: &HeadPosition) -> String {
    match pos {
        HeadPosition::Active => "active".to_string(),
        HeadPosition::Partner(p) => format!("p{p}"),
    }
}

fn head_cid_expr(pos: &HeadPosition) -> String {
    match pos {
        HeadPosition::Active => "cid".to_string(),
        HeadPosition::Partner(p) => format!("it_p{p}.current_cid()"),
    }
}

fn history_tuple_expr(occ: &OccurrenceRule) -> String {
    let mut parts = vec!["cid".to_string()];
    for p in 0..occ.partners.len() {
        parts.push(format!("it_p{p}.current_cid()"));
    }
    parts.join(", ")
}

fn test_expr(tuple: &str, position: usize, mode: ActiveParamTest) -> String {
    match mode {
        ActiveParamTest::Ground => format!("if {tuple}.arg({position}) != arg{position} {{ break; }}"),
        ActiveParamTest::Any => {
            format!("if !engine.vars.is_ground({tuple}.arg({position})) || {tuple}.arg({position}) != arg{position} {{ break; }}")
        }
        ActiveParamTest::Mutable => format!("if !std::ptr::eq({tuple}.arg({position}), arg{position}) {{ break; }}"),
    }
}

/// Maps every logical variable bound in `occ`'s head to the register that
/// holds it in the emitted occurrence block: `a{i}` for the active
/// constraint's position `i`, `p{k}_a{i}` for partner `k`'s position `i`
/// (mirrors [`abstract_lowering::lower_occurrence`]'s own
/// `BindActiveLocal`/`BindPartnerLocal` naming).
fn head_var_registers(occ: &OccurrenceRule) -> HashMap<String, String> {
    let mut regs = HashMap::new();
    for (i, arg) in occ.active.call.args.iter().enumerate() {
        if let Expression::LogicalVar { name, .. } = arg {
            regs.entry(name.clone()).or_insert_with(|| format!("a{i}"));
        }
    }
    for (k, partner) in occ.partners.iter().enumerate() {
        for (pos, arg) in partner.call.args.iter().enumerate() {
            if let Expression::LogicalVar { name, .. } = arg {
                regs.entry(name.clone()).or_insert_with(|| format!("p{k}_a{pos}"));
            }
        }
    }
    regs
}

/// Renders a body expression: head-bound logical variables resolve through
/// `regs` to their register, body-local ones fall back to the `v_{name}`
/// binding a preceding [`abstract_lowering::AbstractStep::DeclareFreshVar`]
/// introduced.
fn render_expr(expr: &Expression, regs: &HashMap<String, String>) -> String {
    match expr {
        Expression::Literal { text, .. } => text.clone(),
        Expression::Identifier { name, .. } => name.clone(),
        Expression::LogicalVar { name, .. } => regs.get(name).cloned().unwrap_or_else(|| format!("v_{name}")),
        Expression::HostVar { name, .. } => name.clone(),
        Expression::Unary { op, prefix, operand, .. } => {
            let inner = render_expr(operand, regs);
            if *prefix {
                format!("{op}{inner}")
            } else {
                format!("{inner}{op}")
            }
        }
        Expression::Binary { op, left, right, .. } => {
            format!("({} {op} {})", render_expr(left, regs), render_expr(right, regs))
        }
        Expression::Ternary { op1, op2, a, b, c, .. } => {
            format!("({} {op1} {} {op2} {})", render_expr(a, regs), render_expr(b, regs), render_expr(c, regs))
        }
        Expression::HostCall { name, l_delim, r_delim, args, .. } => {
            format!("{name}{l_delim}{}{r_delim}", render_args(args, regs))
        }
        Expression::ChrCall { constraint, args, .. } => {
            format!("{constraint}(engine, Tuple::new(vec![{}]))", render_args(args, regs))
        }
        Expression::ChrCount { constraint, .. } => format!("engine.store_{constraint}().count()"),
    }
}

fn render_args(args: &[Expression], regs: &HashMap<String, String>) -> String {
    args.iter().map(|a| render_expr(a, regs)).collect::<Vec<_>>().join(", ")
}

/// Renders where control goes on a body step's failure (§4.4.5): either out
/// of the whole occurrence block, or out of an enclosing choice/try/behavior
/// labeled block.
fn render_control_target(target: &ControlTarget, abort_label: &str) -> String {
    match target {
        ControlTarget::AbortRule => format!("break '{abort_label};"),
        ControlTarget::BreakLabel { label, value: None } => format!("break '{label};"),
        ControlTarget::BreakLabel { label, value: Some(v) } => format!("break '{label} {v};"),
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

    fn param() -> Parameter {
        Parameter {
            mode: Mode::Any,
            type_text: "int".into(),
        }
    }

    #[test]
    fn leq_emits_one_dispatch_function_with_two_labeled_blocks() {
        let mut catalog = Catalog::new();
        catalog
            .declare(ConstraintDecl::new("leq", vec![param(), param()], vec![]))
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

        let mut occurrences = expand_program(&program, &catalog);
        let config = Config::default();
        reorder::run(&mut occurrences, &mut catalog, &config);

        let text = lower_program(&program, &catalog, &occurrences, &config);
        assert!(text.contains("fn do_leq("));
        assert!(text.contains("'leq_0: loop"));
        assert!(text.contains("'leq_1: loop"));
        assert!(text.contains("engine.store_leq(tuple.clone());"));
    }

    #[test]
    fn never_stored_constraint_has_no_store_fallthrough() {
        let mut catalog = Catalog::new();
        let id = catalog.declare(ConstraintDecl::new("a", vec![param()], vec![])).unwrap();
        catalog.get_mut(id).never_stored = true;
        let e = ExprBuilder::at(Position::synthetic());
        let call = |args: Vec<crate::ast::Expression>| ConstraintCall {
            constraint: "a".into(),
            args,
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        };
        let mut program = Program::new("P", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: None,
            keep_head: vec![],
            delete_head: vec![call(vec![e.logical_var("X")])],
            guard: vec![],
            body: Body::Empty,
            position: Position::synthetic(),
        });
        let mut occurrences = expand_program(&program, &catalog);
        let config = Config::default();
        reorder::run(&mut occurrences, &mut catalog, &config);

        let text = lower_program(&program, &catalog, &occurrences, &config);
        assert!(!text.contains("engine.store_a(tuple.clone());"));
    }

    #[test]
    fn disjunctive_body_renders_a_choice_point_with_rewind_between_alternatives() {
        let mut catalog = Catalog::new();
        catalog.declare(ConstraintDecl::new("a", vec![param()], vec![])).unwrap();
        catalog.declare(ConstraintDecl::new("b", vec![param()], vec![])).unwrap();
        catalog.declare(ConstraintDecl::new("c", vec![param()], vec![])).unwrap();
        let e = ExprBuilder::at(Position::synthetic());
        let call = |constraint: &str, args: Vec<crate::ast::Expression>| ConstraintCall {
            constraint: constraint.into(),
            args,
            pragmas: PragmaSet::new(),
            position: Position::synthetic(),
        };
        let mut program = Program::new("P", Position::synthetic());
        program.rules.push(Rule {
            id: RuleId(0),
            name: Some("split".into()),
            keep_head: vec![],
            delete_head: vec![call("a", vec![e.logical_var("X")])],
            guard: vec![],
            body: Body::Sequence {
                kind: crate::ast::SequenceKind::Disjunctive,
                parts: vec![
                    Body::ChrCall(call("b", vec![e.logical_var("X")])),
                    Body::ChrCall(call("c", vec![e.logical_var("X")])),
                ],
            },
            position: Position::synthetic(),
        });
        let mut occurrences = expand_program(&program, &catalog);
        let config = Config::default();
        reorder::run(&mut occurrences, &mut catalog, &config);

        let text = lower_program(&program, &catalog, &occurrences, &config);
        assert!(text.contains("'choice_0: loop"));
        assert!(text.contains("'alt_0_0:"));
        assert!(text.contains("'alt_0_1:"));
        assert!(text.contains("engine.backtrack.back_to(choice_depth_0);"));
        assert!(text.contains("if b(engine, Tuple::new(vec![a0])) == ExecStatus::Failure { break 'alt_0_0; }"));
    }
}
