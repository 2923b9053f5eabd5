//! Script to linear instruction compiler for cmdflow.
//!
//! Compiles line-oriented command scripts with structured control flow
//! (`run`/`loop` blocks, subroutines, `break`, `return`, pragmas) into a flat
//! instruction array for a resumable stack VM. Single statements are opaque:
//! they are bound by a host-supplied [`CommandGrammar`].
//!
//! # Example
//!
//! ```
//! use cmdflow_compiler::Compiler;
//! use cmdflow_core::{CommandGrammar, SelectorKind, SyntaxError};
//!
//! struct Echo;
//!
//! impl CommandGrammar for Echo {
//!     type Action = String;
//!
//!     fn parse_command(&self, text: &str) -> Result<String, SyntaxError> {
//!         Ok(text.to_string())
//!     }
//!
//!     fn parse_selector(&self, _kind: SelectorKind, text: &str) -> Result<String, SyntaxError> {
//!         Ok(text.to_string())
//!     }
//! }
//!
//! let source = ["say start", "run as @a {", "  say hi", "}"];
//! let function = Compiler::new(Echo)
//!     .compile("demo:hello", &source)
//!     .into_result()
//!     .expect("failed to compile");
//! println!("Compiled {} instructions", function.len());
//! ```
//!
//! # Pipeline
//!
//! 1. **Lines** - Merge continuations, drop comments, flag legacy syntax
//! 2. **Parser** - Keyword-dispatched recursive descent into an AST
//! 3. **Codegen** - Two-pass emission:
//!    - Pass 1: Emit instructions, bind labels, queue deferred instructions
//!    - Pass 2: Link every deferred instruction against resolved offsets
//!
//! Every user-facing problem is collected as a diagnostic; a compile with
//! any error yields no artifact.

pub mod ast;
pub mod codegen;
pub mod diagnostic;
pub mod features;
pub mod lexer;
pub mod lines;
pub mod parser;

use ast::Ast;
use cmdflow_core::{CommandGrammar, CompiledFunction, FunctionId};
use codegen::{CodeGenerator, CodegenContext, DebugCodeGenerator, Emitter};
use parser::{ParseOutput, Parser, StatementHandler, StatementTable};
use thiserror::Error;

/// Compiler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("function '{id}' rejected with {errors} error(s)\n{report}")]
    Rejected {
        id: FunctionId,
        errors: usize,
        report: String,
    },
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Per-compiler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Source lines shown either side of a diagnostic.
    pub context_radius: usize,
    /// Flags in effect before the first pragma.
    pub features: FeatureSet,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            context_radius: 2,
            features: FeatureSet::new(),
        }
    }
}

/// Everything one compile produced.
#[derive(Debug, Clone)]
pub struct Compilation<A> {
    pub id: FunctionId,
    /// `None` when any error was reported.
    pub function: Option<CompiledFunction<A>>,
    pub diagnostics: Diagnostics,
    pub report: RenderedReport,
    /// Set when the `debug` feature was on.
    pub ast_dump: Option<String>,
    /// Set when the `debug` feature was on.
    pub disassembly: Option<String>,
}

impl<A> Compilation<A> {
    pub fn is_ok(&self) -> bool {
        self.function.is_some()
    }

    pub fn into_result(self) -> Result<CompiledFunction<A>> {
        match self.function {
            Some(function) => Ok(function),
            None => Err(CompileError::Rejected {
                id: self.id,
                errors: self.diagnostics.error_count(),
                report: self.report.text,
            }),
        }
    }
}

/// Compiles scripts against one host grammar.
///
/// The statement table is built at construction and only read by
/// [`Compiler::compile`], so one compiler can serve any number of compiles.
pub struct Compiler<G: CommandGrammar> {
    grammar: G,
    statements: StatementTable<G>,
    options: CompilerOptions,
}

impl<G: CommandGrammar> Compiler<G> {
    pub fn new(grammar: G) -> Self {
        Self::with_options(grammar, CompilerOptions::default())
    }

    pub fn with_options(grammar: G, options: CompilerOptions) -> Self {
        Self {
            grammar,
            statements: StatementTable::builtin(),
            options,
        }
    }

    /// Add or replace a statement form.
    pub fn register(&mut self, keyword: &str, handler: StatementHandler<G>) -> &mut Self {
        self.statements.register(keyword, handler);
        self
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile `lines` into a function named `id`.
    pub fn compile<S: AsRef<str>>(&self, id: impl Into<FunctionId>, lines: &[S]) -> Compilation<G::Action> {
        let id = id.into();
        let mut diagnostics = Diagnostics::new();

        let assembled = crate::lines::assemble_lines(lines, &mut diagnostics);
        let ParseOutput { ast: tree, features } = Parser::new(
            &self.grammar,
            &self.statements,
            assembled,
            &mut diagnostics,
            self.options.features,
        )
        .parse_top_level();

        // Codegen runs even after parse errors so that codegen-level problems
        // (unknown subroutines, misplaced breaks) are reported in the same pass.
        let mut context = CodegenContext::new();
        let (function, ast_dump, disassembly) = if features.is_debug_dump() {
            let mut codegen: DebugCodeGenerator<G::Action> = DebugCodeGenerator::new();
            emit(&tree, &mut diagnostics, &mut context, &mut codegen);
            codegen.link();

            let ast_dump = ast::dump(&tree);
            let disassembly = codegen.dump_disassembly();
            tracing::info!(
                function = %id,
                "AST dump:\n{}\nCodegen dump:\n{}----",
                ast_dump,
                disassembly
            );
            (codegen.define(id.clone()), Some(ast_dump), Some(disassembly))
        } else {
            let mut codegen: CodeGenerator<G::Action> = CodeGenerator::new();
            emit(&tree, &mut diagnostics, &mut context, &mut codegen);
            (codegen.define(id.clone()), None, None)
        };

        let report = diagnostics.render(&id, self.options.context_radius, lines);
        if !report.text.is_empty() {
            tracing::warn!(function = %id, "\n{}", report.text);
        }

        let function = if report.has_errors {
            tracing::debug!(function = %id, errors = diagnostics.error_count(), "compile rejected");
            None
        } else {
            Some(function)
        };

        Compilation {
            id,
            function,
            diagnostics,
            report,
            ast_dump,
            disassembly,
        }
    }
}

fn emit<A: Clone + std::fmt::Debug + 'static>(
    tree: &TopLevel<A>,
    diagnostics: &mut Diagnostics,
    context: &mut CodegenContext,
    emitter: &mut dyn Emitter<A>,
) {
    tree.emit(diagnostics, context, emitter);
}

/// Compile with default options and the built-in statement forms.
///
/// # Example
///
/// ```
/// use cmdflow_compiler::compile;
/// use cmdflow_core::{CommandGrammar, SelectorKind, SyntaxError};
///
/// struct Upper;
///
/// impl CommandGrammar for Upper {
///     type Action = String;
///
///     fn parse_command(&self, text: &str) -> Result<String, SyntaxError> {
///         Ok(text.to_uppercase())
///     }
///
///     fn parse_selector(&self, _kind: SelectorKind, text: &str) -> Result<String, SyntaxError> {
///         Ok(text.to_uppercase())
///     }
/// }
///
/// let function = compile(Upper, "demo:upper", &["say hi"]).unwrap();
/// assert_eq!(function.plain_count(), 1);
/// ```
///
/// # Errors
///
/// Returns [`CompileError::Rejected`] with the rendered report if any
/// error-level diagnostic was produced.
pub fn compile<G: CommandGrammar, S: AsRef<str>>(
    grammar: G,
    id: impl Into<FunctionId>,
    lines: &[S],
) -> Result<CompiledFunction<G::Action>> {
    Compiler::new(grammar).compile(id, lines).into_result()
}

// Re-export commonly used types
pub use ast::{Block, Iteration, Node, SubroutineDefinition, TopLevel};
pub use codegen::Label;
pub use diagnostic::{Diagnostic, Diagnostics, Level, RenderedReport};
pub use features::{ControlFlowSyntax, Feature, FeatureSet, UnknownFeature};
pub use lines::SourceLine;
pub use parser::{Outcome, Statement};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::Words;
    use cmdflow_core::{ControlOp, Instruction};

    fn compile_lines(source: &str) -> Compilation<String> {
        let lines: Vec<&str> = source.lines().collect();
        Compiler::new(Words).compile("test:fn", &lines)
    }

    #[test]
    fn test_plain_commands_have_no_overhead() {
        let compilation = compile_lines("say a\n# note\n\nsay b\nsay \\\n  c");

        let function = compilation.into_result().unwrap();
        assert_eq!(function.len(), 3);
        assert_eq!(function.plain_count(), 3);
        assert_eq!(function.get(2), Some(&Instruction::Plain("say c".to_string())));
    }

    #[test]
    fn test_run_and_loop_share_frame_shape() {
        let run = compile_lines("run as @a {\n}").into_result().unwrap();
        let looped = compile_lines("loop as @a {\n}").into_result().unwrap();

        let has = |f: &CompiledFunction<String>, m: &str| f.iter().any(|i| i.mnemonic() == m);
        assert!(!has(&run, "push_instr_address"));
        assert!(!has(&run, "call"));
        assert!(has(&run, "branch"));
        assert!(has(&looped, "push_instr_address"));
        assert!(has(&looped, "call"));
        assert!(has(&looped, "branch"));

        let frame_ops = |f: &CompiledFunction<String>| -> Vec<&'static str> {
            f.iter()
                .filter(|i| matches!(i, Instruction::Control(_)))
                .map(|i| i.mnemonic())
                .collect()
        };
        assert_eq!(frame_ops(&run), frame_ops(&looped));
        assert_eq!(frame_ops(&run), vec![
            "push_source_and_match",
            "pop_source_or_branch",
            "pop_frame",
        ]);
    }

    #[test]
    fn test_run_size_is_independent_of_body_runs() {
        let empty = compile_lines("run as @a {\n}").into_result().unwrap();
        assert_eq!(empty.len(), 4);
        assert_eq!(
            empty.get(0),
            Some(&Instruction::Control(ControlOp::PushSourceAndMatch {
                selector: "run:@a".to_string()
            }))
        );
    }

    #[test]
    fn test_pragma_round_trip() {
        let source = "pragma enable subroutines\nsubroutine_call foo\nsubroutine foo\nsay hi\nsubroutine_return\nend";
        let compilation = compile_lines(source);

        assert!(compilation.diagnostics.is_empty());
        assert!(compilation.report.text.is_empty());
        let function = compilation.into_result().unwrap();
        assert_eq!(function.instructions, vec![
            Instruction::SubroutineCall { target: 2 },
            Instruction::exit(),
            Instruction::Plain("say hi".to_string()),
            Instruction::SubroutineReturn,
            Instruction::SubroutineReturn,
        ]);
    }

    #[test]
    fn test_codegen_errors_reject() {
        let compilation = compile_lines("pragma enable subroutines\nsubroutine_call missing\nbreak");

        assert!(!compilation.is_ok());
        assert_eq!(compilation.diagnostics.error_count(), 2);

        let err = compilation.into_result().unwrap_err();
        let CompileError::Rejected { id, errors, report } = err;
        assert_eq!(id.as_str(), "test:fn");
        assert_eq!(errors, 2);
        assert!(report.contains("ERROR (test:fn:2): subroutine 'missing' not defined"));
        assert!(report.contains("3 * break <- HERE"));
    }

    #[test]
    fn test_warnings_do_not_reject() {
        let compilation = compile_lines("subroutine_call foo");

        assert!(compilation.is_ok());
        assert_eq!(compilation.diagnostics.warning_count(), 1);
        assert!(compilation.report.text.starts_with("While compiling function 'test:fn'"));
        assert!(!compilation.report.has_errors);
    }

    #[test]
    fn test_debug_dump() {
        let compilation = compile_lines("pragma enable debug\nloop as @a {\nsay x\n}");

        let disassembly = compilation.disassembly.clone().unwrap();
        assert!(disassembly.starts_with("0: loop::push_instr_address\nloop.wrapper@"));
        assert!(disassembly.contains("loop::call"));
        assert!(disassembly.contains("plain"));
        assert!(compilation.ast_dump.as_deref().unwrap().starts_with("TopLevel\n  Block\n    Loop["));

        let plain = compile_lines("loop as @a {\nsay x\n}");
        assert!(plain.disassembly.is_none());
        assert_eq!(compilation.function, plain.function);
    }

    #[test]
    fn test_initial_features_from_options() {
        let options = CompilerOptions {
            features: {
                let mut features = FeatureSet::new();
                features.set(Feature::ControlFlowV2, true);
                features
            },
            ..CompilerOptions::default()
        };
        let compiler = Compiler::with_options(Words, options);
        let compilation = compiler.compile("test:cfv2", &["run as @a {", "}"]);

        assert_eq!(compilation.diagnostics.warning_count(), 1);
        assert_eq!(compilation.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_compile_helper() {
        assert!(compile(Words, "test:ok", &["say a"]).is_ok());
        assert!(compile(Words, "test:bad", &["bad"]).is_err());
    }
}
