//! Top-level pipeline orchestration (§2 "Data flow", §10.2 `PipelineTrace`).
//!
//! Wires together every stage the rest of the crate implements in
//! isolation: parse → semantic check → program analyses (§4.1) →
//! occurrence expansion (§4.2) → reordering (§4.3) → lowering (§4.4, §4.5).
//! Grounded on the teacher's `DatalogEngine::parse`/`execute` staging in
//! `lib.rs`: each stage is a plain function call, its result threaded into
//! the next, with a trace struct recording what happened at each step for
//! `--trace` output and tests — not a generic visitor-driven "pass
//! manager", matching the teacher's own straight-line pipeline shape.

use crate::analyses::{dependency_graph::DependencyGraph, never_stored, unused_rule};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::diagnostics::{CompileError, SemanticError, Warning};
use crate::parser::{self, ParsedProgram};
use crate::program::{OccurrenceRule, Program};
use crate::{host_lowering, occurrence, reorder};
use rayon::prelude::*;

/// Per-stage counters recorded while compiling one program, the way the
/// teacher's `PipelineTrace`/`OptimizationStats` records IR node counts
/// before/after optimization (§10.2).
#[derive(Debug, Clone, Default)]
pub struct PipelineTrace {
    pub rule_count: usize,
    pub occurrence_count: usize,
    pub indexes_added: usize,
    pub never_stored_constraints: usize,
    pub unused_rule_warnings: usize,
    pub never_activated_constraints: usize,
}

/// Everything produced by compiling one `<chr>` block: the expanded,
/// reordered occurrence rules, the frozen catalog they reference, every
/// non-fatal diagnostic collected along the way, the rendered host source,
/// and a trace of what each stage did.
pub struct CompiledProgram {
    pub program: Program,
    pub catalog: Catalog,
    pub occurrences: Vec<OccurrenceRule>,
    pub warnings: Vec<Warning>,
    pub host_source: String,
    pub trace: PipelineTrace,
}

/// Checks the invariants §3.4 assigns to parsing's output that the parser
/// itself cannot check locally (forward references): every CHR constraint
/// named in a rule head or body is declared somewhere in the program.
/// Arity is already checked at parse time against whatever was declared
/// *before* the call site (see `crate::parser`); a forward reference's
/// arity is checked here too, once every declaration is known.
fn check_undeclared_constraints(program: &Program, catalog: &Catalog) -> Result<(), CompileError> {
    for rule in &program.rules {
        for call in rule.head() {
            match catalog.lookup(&call.constraint) {
                None => {
                    return Err(CompileError::Semantic(SemanticError::UndeclaredConstraint {
                        position: call.position.clone(),
                        name: call.constraint.clone(),
                    }))
                }
                Some(id) => {
                    let decl = catalog.get(id);
                    if decl.arity() != call.arity() {
                        return Err(CompileError::Parse(crate::diagnostics::ParseError::ArityMismatch {
                            position: call.position.clone(),
                            name: call.constraint.clone(),
                            found: call.arity(),
                            expected: decl.arity(),
                        }));
                    }
                }
            }
        }
        check_body_constraints(&rule.body, catalog)?;
    }
    Ok(())
}

fn check_body_constraints(body: &crate::ast::Body, catalog: &Catalog) -> Result<(), CompileError> {
    let mut error = None;
    crate::visitor::walk_body(
        body,
        &mut |b| {
            if error.is_some() {
                return;
            }
            if let crate::ast::Body::ChrCall(call) = b {
                match catalog.lookup(&call.constraint) {
                    None => {
                        error = Some(CompileError::Semantic(SemanticError::UndeclaredConstraint {
                            position: call.position.clone(),
                            name: call.constraint.clone(),
                        }));
                    }
                    Some(id) => {
                        let decl = catalog.get(id);
                        if decl.arity() != call.arity() {
                            error = Some(CompileError::Parse(crate::diagnostics::ParseError::ArityMismatch {
                                position: call.position.clone(),
                                name: call.constraint.clone(),
                                found: call.arity(),
                                expected: decl.arity(),
                            }));
                        }
                    }
                }
            }
        },
        &mut |_| {},
    );
    match error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs the full pipeline over one already-parsed `<chr>` block (§2's
/// whole data-flow diagram, minus parsing itself which the caller already
/// did via `crate::parser::parse_source`).
#[tracing::instrument(skip(parsed, config), fields(program = %parsed.program.name))]
pub fn compile_program(parsed: ParsedProgram, config: &Config) -> Result<CompiledProgram, CompileError> {
    let ParsedProgram { program, mut catalog } = parsed;
    let mut trace = PipelineTrace {
        rule_count: program.rules.len(),
        ..Default::default()
    };

    check_undeclared_constraints(&program, &catalog)?;
    tracing::debug!(rules = trace.rule_count, "parsed and semantically checked");

    if config.never_stored {
        never_stored::run(&program, &mut catalog);
    }
    trace.never_stored_constraints = catalog.iter().filter(|(_, d)| d.never_stored).count();

    let dep_graph = DependencyGraph::build(&program, &catalog);
    trace.never_activated_constraints = dep_graph.never_activated(&catalog).len();

    let mut warnings = Vec::new();
    if config.warning_unused_rule {
        let unused = unused_rule::run(&program);
        trace.unused_rule_warnings = unused.len();
        for u in unused {
            tracing::warn!(rule = ?u.rule_name, "{}", u.warning.message);
            warnings.push(u.warning);
        }
    }

    let mut occurrences = occurrence::expand_program(&program, &catalog);
    trace.occurrence_count = occurrences.len();
    tracing::debug!(occurrences = trace.occurrence_count, "expanded into occurrence rules");

    reorder::run(&mut occurrences, &mut catalog, config);
    trace.indexes_added = catalog.iter().map(|(_, d)| d.indexes().len()).sum();
    tracing::debug!(indexes = trace.indexes_added, "reordering and index inference complete");

    catalog.freeze_all();

    let host_source = host_lowering::lower_program(&program, &catalog, &occurrences, config);
    tracing::debug!(bytes = host_source.len(), "host code lowered");

    Ok(CompiledProgram {
        program,
        catalog,
        occurrences,
        warnings,
        host_source,
        trace,
    })
}

/// Parses `source` and compiles every `<chr>` block found in it. Per §7's
/// propagation policy, one program's failure is collected rather than
/// aborting the rest; the first error (if any) is still returned to the
/// caller by convention of `parse_source` itself failing fast on parse
/// errors, but semantic/compile errors discovered per-program here are
/// gathered so all of them can be reported.
///
/// Independently-extracted `<chr>` blocks share no state (each owns its
/// own `Catalog`), so they are compiled in parallel with `rayon` rather
/// than one at a time — the one place in this crate with real
/// parallelism to exploit, since the compilation of any single program is
/// itself an inherently sequential pipeline (§5 "single-threaded
/// cooperative" binds the *emitted* engine, not this compiler).
pub fn compile_source(source: &str, file: &str, config: &Config) -> (Vec<CompiledProgram>, Vec<CompileError>) {
    let parsed = match parser::parse_source(source, file) {
        Ok(p) => p,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let results: Vec<Result<CompiledProgram, CompileError>> =
        parsed.into_par_iter().map(|p| compile_program(p, config)).collect();

    let mut compiled = Vec::new();
    let mut errors = Vec::new();
    for r in results {
        match r {
            Ok(c) => compiled.push(c),
            Err(e) => errors.push(e),
        }
    }
    (compiled, errors)
}
