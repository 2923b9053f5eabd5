//! Check command: compile a script and report diagnostics.

use super::{compile_file, print_report, SourceArgs};
use anyhow::Result;
use clap::Args;
use cmdflow_compiler::CompilerOptions;
use colored::Colorize;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Lines of context shown around each diagnostic
    #[arg(short, long, default_value = "2")]
    context: usize,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let options = CompilerOptions {
        context_radius: args.context,
        ..CompilerOptions::default()
    };
    let compilation = compile_file(
        &args.source.file,
        args.source.grammar.as_deref(),
        args.source.id.as_deref(),
        options,
    )?;

    print_report(&compilation.report.text);

    let errors = compilation.diagnostics.error_count();
    let warnings = compilation.diagnostics.warning_count();

    match &compilation.function {
        Some(function) => {
            println!(
                "{}  {}: {} instructions ({} commands), {} warning(s)",
                "✓".green().bold(),
                compilation.id.to_string().bright_yellow(),
                function.len(),
                function.plain_count(),
                warnings
            );
            Ok(())
        }
        None => anyhow::bail!(
            "{} rejected with {} error(s), {} warning(s)",
            compilation.id,
            errors,
            warnings
        ),
    }
}
