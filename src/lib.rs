//! # chrc — a CHR rule compiler
//!
//! Source-to-source compiler for Constraint Handling Rules (CHR) embedded
//! inside a host systems language. Input files interleave host-language
//! code with `<chr>...</chr>` blocks; this crate extracts each block,
//! analyzes the CHR program it contains under the refined operational
//! semantics, and emits an equivalent imperative matching program plus the
//! runtime support library that program links against.
//!
//! ## Pipeline
//!
//! ```text
//! source text
//!     |  crate::parser::parse_source
//!     v
//! ParsedProgram (AST + Catalog)
//!     |  crate::compiler::compile_program
//!     |    - semantic check (undeclared constraints, arity)
//!     |    - crate::analyses (never-stored, unused-rule, dependency graph)
//!     |    - crate::occurrence (expand each rule into its occurrence rules)
//!     |    - crate::reorder (head/guard/occurrence reorder, index inference)
//!     |    - crate::abstract_lowering (language-neutral matching steps)
//!     |    - crate::host_lowering (rendered host source)
//!     v
//! CompiledProgram (occurrence rules, frozen catalog, warnings, host source)
//! ```
//!
//! The runtime contracts the emitted code links against — backtrack
//! manager, backtrackable list, logical variables, constraint stores,
//! history — live under [`runtime`], one [`runtime::Engine`] per program
//! instance rather than the process-wide singletons the original CHR++
//! runtime uses (§5, §9 "Global mutable state").
//!
//! Lexing/parsing of the host language embedded in guards and bodies, CLI
//! file-splitting, and include-file resolution are explicitly out of this
//! crate's scope; see `DESIGN.md` for what the `bin/chrc` binary does
//! instead.

pub mod abstract_lowering;
pub mod analyses;
pub mod ast;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod host_lowering;
pub mod occurrence;
pub mod parser;
pub mod position;
pub mod program;
pub mod reorder;
pub mod runtime;
pub mod visitor;

pub use compiler::{compile_program, compile_source, CompiledProgram, PipelineTrace};
pub use config::Config;
pub use diagnostics::{CompileError, ExecStatus, ParseError, SemanticError, Warning};
