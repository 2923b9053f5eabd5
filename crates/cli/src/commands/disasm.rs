//! Disasm command: compile with the debug dump forced on.

use super::{compile_file, print_report, SourceArgs};
use anyhow::{Context, Result};
use clap::Args;
use cmdflow_compiler::{CompilerOptions, Feature};
use colored::Colorize;

#[derive(Args)]
pub struct DisasmArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Print the compiled function as JSON instead of the dumps
    #[arg(long)]
    json: bool,
}

pub fn run(args: DisasmArgs) -> Result<()> {
    let output = disassemble(&args)?;
    println!("{}", output);
    Ok(())
}

fn disassemble(args: &DisasmArgs) -> Result<String> {
    let mut options = CompilerOptions::default();
    options.features.set(Feature::DebugDump, true);

    let compilation = compile_file(
        &args.source.file,
        args.source.grammar.as_deref(),
        args.source.id.as_deref(),
        options,
    )?;

    if !compilation.is_ok() {
        print_report(&compilation.report.text);
    }
    let Some(function) = &compilation.function else {
        anyhow::bail!(
            "{} rejected with {} error(s)",
            compilation.id,
            compilation.diagnostics.error_count()
        );
    };

    if args.json {
        return serde_json::to_string_pretty(function).context("Failed to serialize function");
    }

    // A script can switch the dump back off with `pragma disable debug`.
    let ast = compilation.ast_dump.as_deref().unwrap_or("(disabled by pragma)");
    let code = compilation.disassembly.as_deref().unwrap_or("(disabled by pragma)\n");

    Ok(format!(
        "{}\n{}\n{}\n{}",
        "AST".bold().cyan(),
        ast,
        "Instructions".bold().cyan(),
        code.trim_end()
    ))
}
