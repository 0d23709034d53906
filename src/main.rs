//! `chrc` — the CHR rule compiler CLI (§6.2).
//!
//! Thin binary over [`chrc::compiler`]: reads a mixed host/CHR source file
//! (or stdin), extracts and compiles every `<chr>` block, and writes the
//! generated host source to `output_dir` (or stdout). File-splitting of
//! mixed host/CHR input, include-file resolution, and header/source
//! pretty-printing are explicitly out of the core's scope (§1) — this
//! binary writes one `<program-name>.chr.out` file per compiled program
//! and nothing else.

use clap::Parser;
use chrc::{compile_source, Config};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "chrc")]
#[command(about = "Source-to-source compiler for Constraint Handling Rules", long_about = None)]
struct Args {
    /// Input file. Ignored when `--stdin` is given.
    input: Option<PathBuf>,

    /// Print version `MAJOR.MINOR` and exit 0.
    #[arg(long)]
    version: bool,

    /// Print space-separated CHR program names found in input; exit 0.
    #[arg(long)]
    chr_prg_names_only: bool,

    /// Print output filenames that would be produced; exit 0.
    #[arg(long)]
    chr_output_files_only: bool,

    /// Emit runtime trace statements in generated output.
    #[arg(long)]
    trace: bool,

    /// Read input from stdin instead of a file.
    #[arg(long)]
    stdin: bool,

    /// Write all output to stdout instead of `output_dir`.
    #[arg(long)]
    stdout: bool,

    /// Destination directory for generated files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long = "enable-warning_unused_rule", action = clap::ArgAction::SetTrue)]
    enable_warning_unused_rule: bool,
    #[arg(long = "disable-warning_unused_rule", action = clap::ArgAction::SetTrue)]
    disable_warning_unused_rule: bool,

    #[arg(long = "enable-never_stored", action = clap::ArgAction::SetTrue)]
    enable_never_stored: bool,
    #[arg(long = "disable-never_stored", action = clap::ArgAction::SetTrue)]
    disable_never_stored: bool,

    #[arg(long = "enable-head_reorder", action = clap::ArgAction::SetTrue)]
    enable_head_reorder: bool,
    #[arg(long = "disable-head_reorder", action = clap::ArgAction::SetTrue)]
    disable_head_reorder: bool,

    #[arg(long = "enable-guard_reorder", action = clap::ArgAction::SetTrue)]
    enable_guard_reorder: bool,
    #[arg(long = "disable-guard_reorder", action = clap::ArgAction::SetTrue)]
    disable_guard_reorder: bool,

    #[arg(long = "enable-occurrences_reorder", action = clap::ArgAction::SetTrue)]
    enable_occurrences_reorder: bool,
    #[arg(long = "disable-occurrences_reorder", action = clap::ArgAction::SetTrue)]
    disable_occurrences_reorder: bool,

    #[arg(long = "enable-constraint_store_index", action = clap::ArgAction::SetTrue)]
    enable_constraint_store_index: bool,
    #[arg(long = "disable-constraint_store_index", action = clap::ArgAction::SetTrue)]
    disable_constraint_store_index: bool,

    #[arg(long = "enable-line_error", action = clap::ArgAction::SetTrue)]
    enable_line_error: bool,
    #[arg(long = "disable-line_error", action = clap::ArgAction::SetTrue)]
    disable_line_error: bool,
}

impl Args {
    /// Applies every `--enable-*`/`--disable-*` knob on top of a loaded
    /// [`Config`] (CLI overrides file/env, §10.3).
    fn apply_to(&self, config: &mut Config) {
        macro_rules! apply {
            ($field:ident, $enable:ident, $disable:ident) => {
                if self.$enable {
                    config.$field = true;
                }
                if self.$disable {
                    config.$field = false;
                }
            };
        }
        apply!(warning_unused_rule, enable_warning_unused_rule, disable_warning_unused_rule);
        apply!(never_stored, enable_never_stored, disable_never_stored);
        apply!(head_reorder, enable_head_reorder, disable_head_reorder);
        apply!(guard_reorder, enable_guard_reorder, disable_guard_reorder);
        apply!(occurrences_reorder, enable_occurrences_reorder, disable_occurrences_reorder);
        apply!(constraint_store_index, enable_constraint_store_index, disable_constraint_store_index);
        apply!(line_error, enable_line_error, disable_line_error);
        if self.trace {
            config.trace = true;
        }
    }
}

fn install_tracing(config: &Config) {
    let filter = if config.trace {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
    );
    if config.logging.format == "json" {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn read_input(args: &Args) -> Result<(String, String), String> {
    if args.stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(|e| e.to_string())?;
        return Ok((buf, "<stdin>".to_string()));
    }
    let path = args.input.as_ref().ok_or_else(|| "no input file given (pass a path or --stdin)".to_string())?;
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((text, path.display().to_string()))
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.version {
        println!("{}.{}", env!("CARGO_PKG_VERSION_MAJOR"), env!("CARGO_PKG_VERSION_MINOR"));
        return ExitCode::SUCCESS;
    }

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    args.apply_to(&mut config);
    install_tracing(&config);

    let (source, file) = match read_input(&args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{file}: error: {e}", file = "chrc");
            return ExitCode::FAILURE;
        }
    };

    let parsed = match chrc::parser::parse_source(&source, &file) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", format_compile_error(&e));
            return ExitCode::FAILURE;
        }
    };

    if args.chr_prg_names_only {
        let names: Vec<&str> = parsed.iter().map(|p| p.program.name.as_str()).collect();
        println!("{}", names.join(" "));
        return ExitCode::SUCCESS;
    }

    if args.chr_output_files_only {
        for p in &parsed {
            println!("{}.chr.out", p.program.name);
        }
        println!("{file}.stripped");
        return ExitCode::SUCCESS;
    }

    let mut had_error = false;
    let mut outputs: Vec<(String, String)> = Vec::new();
    for p in parsed {
        let name = p.program.name.clone();
        match chrc::compiler::compile_program(p, &config) {
            Ok(compiled) => {
                for w in &compiled.warnings {
                    eprintln!("{w}");
                }
                outputs.push((name, compiled.host_source));
            }
            Err(e) => {
                eprintln!("{}", format_compile_error(&e));
                had_error = true;
            }
        }
    }

    if had_error {
        return ExitCode::FAILURE;
    }

    if args.stdout {
        for (name, text) in &outputs {
            println!("// === {name} ===");
            println!("{text}");
        }
        return ExitCode::SUCCESS;
    }

    let out_dir = args.output_dir.unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("error: creating {}: {e}", out_dir.display());
        return ExitCode::FAILURE;
    }
    for (name, text) in &outputs {
        let path = out_dir.join(format!("{name}.chr.out"));
        if let Err(e) = std::fs::File::create(&path).and_then(|mut f| f.write_all(text.as_bytes())) {
            eprintln!("error: writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn format_compile_error(e: &chrc::CompileError) -> String {
    format!("error: {e}")
}
