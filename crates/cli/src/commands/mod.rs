//! CLI commands module.

use crate::grammar::{GrammarConfig, LexiconAction, LexiconGrammar};
use anyhow::{Context, Result};
use clap::Subcommand;
use cmdflow_compiler::{Compilation, Compiler, CompilerOptions};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod check;
pub mod disasm;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a script and report diagnostics
    Check(check::CheckArgs),
    /// Compile a script and dump its AST and instructions
    Disasm(disasm::DisasmArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Check(args) => check::run(args),
        Commands::Disasm(args) => disasm::run(args),
    }
}

/// Read `file` and compile it against the lexicon at `grammar`.
pub fn compile_file(
    file: &Path,
    grammar: Option<&Path>,
    id: Option<&str>,
    options: CompilerOptions,
) -> Result<Compilation<LexiconAction>> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read source file: {}", file.display()))?;
    let lines: Vec<&str> = source.lines().collect();

    let config = GrammarConfig::load_or_default(grammar)?;
    let compiler = Compiler::with_options(LexiconGrammar::new(config), options);

    let id = id.map(str::to_string).unwrap_or_else(|| function_id(file));
    tracing::debug!(%id, lines = lines.len(), "compiling");

    Ok(compiler.compile(id, &lines))
}

/// `<namespace>:<name>` from the parent directory and the file stem.
pub fn function_id(file: &Path) -> String {
    let name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main");
    let namespace = file
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or("local");
    format!("{}:{}", namespace, name)
}

/// Print a diagnostic report with levels highlighted.
pub fn print_report(report: &str) {
    for line in report.lines() {
        if line.starts_with("ERROR") {
            println!("{}", line.red().bold());
        } else if line.starts_with("WARNING") {
            println!("{}", line.yellow().bold());
        } else if line.ends_with("<- HERE") {
            println!("{}", line.bright_white());
        } else {
            println!("{}", line.bright_black());
        }
    }
}

#[derive(clap::Args)]
pub struct SourceArgs {
    /// Path to the script
    pub file: PathBuf,

    /// Grammar lexicon (JSON) to check commands against
    #[arg(short, long)]
    pub grammar: Option<PathBuf>,

    /// Function id used in diagnostics (default: <dir>:<file stem>)
    #[arg(long)]
    pub id: Option<String>,
}
