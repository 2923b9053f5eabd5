//! Abstract syntax tree and its emission into a code generator.
//!
//! Every node emits itself given the diagnostics of the current compile,
//! the codegen context (subroutine labels, break target) and an emitter.
//! `run` and `loop` lower to frame-stack operations so that the whole
//! continuation lives in VM state, never in native recursion:
//!
//! ```text
//! run <sel> { body }                 loop <sel> { body }
//!
//!   push_source_and_match <sel>        push_instr_address &end
//! loop_begin:                        wrapper:
//!   pop_source_or_branch &loop_exit    push_source_and_match <sel>
//!   body                             loop_begin:
//!   branch &loop_begin                 pop_source_or_branch &loop_exit
//! loop_exit:                           body
//!   pop_frame                          call &wrapper
//!                                      branch &loop_begin
//!                                    loop_exit:
//!                                      pop_frame
//!                                      return
//!                                    end:
//! ```

use crate::codegen::{CodegenContext, Emitter, Label, Linkable};
use crate::diagnostic::Diagnostics;
use cmdflow_core::{ControlOp, Instruction, SelectorKind};
use std::collections::HashMap;
use std::fmt::{self, Write as _};

/// A tree node that can lower itself to instructions.
pub trait Ast<A> {
    /// Append this node's instructions to `emitter`.
    fn emit(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    );

    /// Call `visitor` once per direct child.
    fn visit(&self, visitor: &mut dyn FnMut(&dyn Ast<A>));

    /// One-line description for tree dumps.
    fn describe(&self) -> String;
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Node<A> {
    Block(Block<A>),
    /// One host action.
    Command(A),
    Run(Iteration<A>),
    Loop(Iteration<A>),
    /// Only meaningful at the top level, where it is hoisted out of the
    /// main body. A nested definition has already been diagnosed and
    /// emits nothing.
    SubroutineDefinition(SubroutineDefinition<A>),
    SubroutineCall { name: String, line: usize },
    SubroutineReturn,
    Break { line: usize },
    /// Terminate the whole invocation.
    Exit,
}

/// Ordered statement sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Block<A> {
    pub children: Vec<Node<A>>,
}

impl<A> Block<A> {
    pub fn new(children: Vec<Node<A>>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<A> Default for Block<A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Body of a `run` or `loop` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration<A> {
    /// `None` when the selector failed to parse (already diagnosed).
    pub selector: Option<A>,
    pub body: Block<A>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDefinition<A> {
    pub name: String,
    pub line: usize,
    pub body: Block<A>,
}

/// Root of a compiled function: the main body plus the hoisted subroutines,
/// which are laid out after it.
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevel<A> {
    pub block: Block<A>,
    pub subroutines: Vec<SubroutineDefinition<A>>,
}

impl<A> TopLevel<A> {
    pub fn new(block: Block<A>, subroutines: Vec<SubroutineDefinition<A>>) -> Self {
        Self { block, subroutines }
    }
}

/// Render `root` and its descendants, two spaces of indent per level.
pub fn dump<A>(root: &dyn Ast<A>) -> String {
    fn walk<A>(node: &dyn Ast<A>, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.describe());
        node.visit(&mut |child| walk(child, depth + 1, out));
    }

    let mut out = String::new();
    walk(root, 0, &mut out);
    out
}

fn describe_selector<A: fmt::Debug>(selector: &Option<A>) -> String {
    match selector {
        Some(selector) => format!("{:?}", selector),
        None => "<invalid>".to_string(),
    }
}

/// Operation and label names for one iteration construct.
struct FrameNames {
    push_source_and_match: &'static str,
    pop_source_or_branch: &'static str,
    branch: &'static str,
    pop_frame: &'static str,
    loop_begin: &'static str,
    loop_exit: &'static str,
}

const RUN_NAMES: FrameNames = FrameNames {
    push_source_and_match: "run::push_source_and_match",
    pop_source_or_branch: "run::pop_source_or_branch",
    branch: "run::branch",
    pop_frame: "run::pop_frame",
    loop_begin: "run.loop_begin",
    loop_exit: "run.loop_exit",
};

const LOOP_NAMES: FrameNames = FrameNames {
    push_source_and_match: "loop::push_source_and_match",
    pop_source_or_branch: "loop::pop_source_or_branch",
    branch: "loop::branch",
    pop_frame: "loop::pop_frame",
    loop_begin: "loop.loop_begin",
    loop_exit: "loop.loop_exit",
};

impl<A: Clone + fmt::Debug + 'static> Iteration<A> {
    /// Emit the frame-stack loop shared by `run` and `loop`. `recurse`, when
    /// set, is the wrapper label re-entered after each body execution.
    fn emit_frame_loop(
        &self,
        names: &FrameNames,
        recurse: Option<Label>,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        let loop_exit = emitter.define_label(names.loop_exit);

        let Some(selector) = &self.selector else {
            // Still walk the body so nested problems get reported.
            self.emit_body(loop_exit, diagnostics, context, emitter);
            emitter.emit_label(loop_exit);
            return;
        };

        let loop_begin = emitter.define_label(names.loop_begin);

        emitter.emit_control_named(
            names.push_source_and_match,
            Instruction::Control(ControlOp::PushSourceAndMatch {
                selector: selector.clone(),
            }),
        );
        emitter.emit_label(loop_begin);
        emitter.emit_control_linkable(names.pop_source_or_branch, vec![loop_exit], |at| {
            Instruction::Control(ControlOp::PopSourceOrBranch { exit: at[0] })
        });

        self.emit_body(loop_exit, diagnostics, context, emitter);

        if let Some(wrapper) = recurse {
            emitter.emit_linkable(Linkable::call("loop::call", wrapper));
        }
        emitter.emit_linkable(Linkable::branch(names.branch, loop_begin));

        emitter.emit_label(loop_exit);
        emitter.emit_control_named(names.pop_frame, Instruction::Control(ControlOp::PopFrame));
    }

    fn emit_body(
        &self,
        loop_exit: Label,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        let saved = context.push_break_target(loop_exit);
        self.body.emit(diagnostics, context, emitter);
        context.restore_break_target(saved);
    }

    fn emit_run(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        self.emit_frame_loop(&RUN_NAMES, None, diagnostics, context, emitter);
    }

    fn emit_loop(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        if self.selector.is_none() {
            self.emit_frame_loop(&LOOP_NAMES, None, diagnostics, context, emitter);
            return;
        }

        let wrapper = emitter.define_label("loop.wrapper");
        let end = emitter.define_label("loop.end");

        emitter.emit_linkable(Linkable::push_instr_address("loop::push_instr_address", end));
        emitter.emit_label(wrapper);

        self.emit_frame_loop(&LOOP_NAMES, Some(wrapper), diagnostics, context, emitter);

        emitter.emit_control_named("loop::return", Instruction::Return);
        emitter.emit_label(end);
    }

    fn describe(&self, kind: SelectorKind) -> String {
        let name = match kind {
            SelectorKind::Run => "Run",
            SelectorKind::Loop => "Loop",
        };
        format!("{}[{}]", name, describe_selector(&self.selector))
    }
}

impl<A: Clone + fmt::Debug + 'static> Ast<A> for Node<A> {
    fn emit(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        match self {
            Node::Block(block) => block.emit(diagnostics, context, emitter),
            Node::Command(action) => emitter.emit_plain(action.clone()),
            Node::Run(iteration) => iteration.emit_run(diagnostics, context, emitter),
            Node::Loop(iteration) => iteration.emit_loop(diagnostics, context, emitter),
            Node::SubroutineDefinition(_) => {}
            Node::SubroutineCall { name, line } => match context.subroutine(name) {
                Some(target) => {
                    emitter.emit_linkable(Linkable::subroutine_call("subroutine::call", target))
                }
                None => diagnostics.error(*line, format!("subroutine '{}' not defined", name)),
            },
            Node::SubroutineReturn => {
                emitter.emit_control_named("subroutine::return", Instruction::SubroutineReturn)
            }
            Node::Break { line } => match context.break_target() {
                Some(target) => emitter.emit_linkable(Linkable::branch("break", target)),
                None => diagnostics.error(
                    *line,
                    "'break' may only be used inside iterative control flow",
                ),
            },
            Node::Exit => emitter.emit_control_named("exit", Instruction::exit()),
        }
    }

    fn visit(&self, visitor: &mut dyn FnMut(&dyn Ast<A>)) {
        match self {
            Node::Block(block) => block.visit(visitor),
            Node::Run(iteration) | Node::Loop(iteration) => visitor(&iteration.body),
            Node::SubroutineDefinition(definition) => visitor(&definition.body),
            _ => {}
        }
    }

    fn describe(&self) -> String {
        match self {
            Node::Block(block) => block.describe(),
            Node::Command(action) => format!("Command[{:?}]", action),
            Node::Run(iteration) => iteration.describe(SelectorKind::Run),
            Node::Loop(iteration) => iteration.describe(SelectorKind::Loop),
            Node::SubroutineDefinition(definition) => definition.describe(),
            Node::SubroutineCall { name, .. } => format!("SubroutineCall[{}]", name),
            Node::SubroutineReturn => "SubroutineReturn".to_string(),
            Node::Break { .. } => "Break".to_string(),
            Node::Exit => "Exit".to_string(),
        }
    }
}

impl<A: Clone + fmt::Debug + 'static> Ast<A> for Block<A> {
    fn emit(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        for child in &self.children {
            child.emit(diagnostics, context, emitter);
        }
    }

    fn visit(&self, visitor: &mut dyn FnMut(&dyn Ast<A>)) {
        for child in &self.children {
            visitor(child);
        }
    }

    fn describe(&self) -> String {
        "Block".to_string()
    }
}

impl<A: Clone + fmt::Debug + 'static> Ast<A> for SubroutineDefinition<A> {
    /// Out-of-line body: entry label, body, subroutine return. The entry
    /// label must already be declared in `context`.
    fn emit(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        let Some(entry) = context.subroutine(&self.name) else {
            panic!("internal error: subroutine '{}' emitted before it was declared", self.name);
        };

        emitter.emit_label(entry);
        self.body.emit(diagnostics, context, emitter);
        emitter.emit_control_named("subroutine::return", Instruction::SubroutineReturn);
    }

    fn visit(&self, visitor: &mut dyn FnMut(&dyn Ast<A>)) {
        visitor(&self.body);
    }

    fn describe(&self) -> String {
        format!("SubroutineDefinition[{}]", self.name)
    }
}

impl<A: Clone + fmt::Debug + 'static> Ast<A> for TopLevel<A> {
    fn emit(
        &self,
        diagnostics: &mut Diagnostics,
        context: &mut CodegenContext,
        emitter: &mut dyn Emitter<A>,
    ) {
        // Declare every subroutine before emitting anything so calls can
        // refer to definitions further down the file.
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut unique = Vec::new();

        for definition in &self.subroutines {
            if let Some(previous) = first_seen.get(definition.name.as_str()) {
                diagnostics.error(
                    definition.line,
                    format!(
                        "re-definition of subroutine '{}' (previously defined on line {})",
                        definition.name,
                        previous + 1
                    ),
                );
                continue;
            }
            first_seen.insert(&definition.name, definition.line);

            let entry = emitter.define_label(&format!("subroutine.{}", definition.name));
            context.declare_subroutine(&definition.name, entry);
            unique.push(definition);
        }

        self.block.emit(diagnostics, context, emitter);

        if !self.subroutines.is_empty() {
            emitter.emit_control_named("top_level::exit", Instruction::exit());
        }

        for definition in unique {
            definition.emit(diagnostics, context, emitter);
        }
    }

    fn visit(&self, visitor: &mut dyn FnMut(&dyn Ast<A>)) {
        visitor(&self.block);
        for definition in &self.subroutines {
            visitor(definition);
        }
    }

    fn describe(&self) -> String {
        "TopLevel".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodeGenerator;
    use cmdflow_core::{CompiledFunction, EXIT_TARGET};

    fn command(text: &'static str) -> Node<&'static str> {
        Node::Command(text)
    }

    fn iteration(selector: &'static str, body: Vec<Node<&'static str>>) -> Iteration<&'static str> {
        Iteration {
            selector: Some(selector),
            body: Block::new(body),
            line: 0,
        }
    }

    fn subroutine(
        name: &str,
        line: usize,
        body: Vec<Node<&'static str>>,
    ) -> SubroutineDefinition<&'static str> {
        SubroutineDefinition {
            name: name.to_string(),
            line,
            body: Block::new(body),
        }
    }

    fn compile(
        root: &dyn Ast<&'static str>,
    ) -> (CompiledFunction<&'static str>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut context = CodegenContext::new();
        let mut codegen: CodeGenerator<&'static str> = CodeGenerator::new();
        root.emit(&mut diagnostics, &mut context, &mut codegen);
        (codegen.define("test:ast"), diagnostics)
    }

    #[test]
    fn test_run_layout() {
        let (function, diagnostics) = compile(&Node::Run(iteration("sel", vec![command("x")])));

        assert!(diagnostics.is_empty());
        assert_eq!(function.instructions, vec![
            Instruction::Control(ControlOp::PushSourceAndMatch { selector: "sel" }),
            Instruction::Control(ControlOp::PopSourceOrBranch { exit: 4 }),
            Instruction::Plain("x"),
            Instruction::Branch { target: 1 },
            Instruction::Control(ControlOp::PopFrame),
        ]);
    }

    #[test]
    fn test_loop_layout() {
        let (function, diagnostics) = compile(&Node::Loop(iteration("sel", vec![command("x")])));

        assert!(diagnostics.is_empty());
        assert_eq!(function.instructions, vec![
            Instruction::PushInstrAddress { target: 8 },
            Instruction::Control(ControlOp::PushSourceAndMatch { selector: "sel" }),
            Instruction::Control(ControlOp::PopSourceOrBranch { exit: 6 }),
            Instruction::Plain("x"),
            Instruction::Call { target: 1 },
            Instruction::Branch { target: 2 },
            Instruction::Control(ControlOp::PopFrame),
            Instruction::Return,
        ]);
    }

    #[test]
    fn test_break_targets_innermost_exit() {
        let inner = Node::Run(iteration("inner", vec![Node::Break { line: 2 }]));
        let (function, diagnostics) = compile(&Node::Run(iteration("outer", vec![inner])));

        assert!(diagnostics.is_empty());
        // outer: 0 push, 1 pop_or_branch, inner: 2 push, 3 pop_or_branch,
        // 4 break, 5 branch, 6 pop_frame; outer: 7 branch, 8 pop_frame
        assert_eq!(function.get(4), Some(&Instruction::Branch { target: 6 }));
        assert_eq!(
            function.get(1),
            Some(&Instruction::Control(ControlOp::PopSourceOrBranch { exit: 8 }))
        );
    }

    #[test]
    fn test_break_outside_iteration() {
        let (function, diagnostics) = compile(&Block::new(vec![Node::Break { line: 3 }]));

        assert!(function.is_empty());
        let errors: Vec<_> = diagnostics.iter().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 3);
        assert_eq!(errors[0].message, "'break' may only be used inside iterative control flow");
    }

    #[test]
    fn test_invalid_selector_still_emits_body() {
        let node = Node::Loop(Iteration {
            selector: None,
            body: Block::new(vec![command("x"), Node::Break { line: 1 }]),
            line: 0,
        });
        let (function, diagnostics) = compile(&node);

        assert!(diagnostics.is_empty());
        assert_eq!(function.instructions, vec![
            Instruction::Plain("x"),
            Instruction::Branch { target: 2 },
        ]);
    }

    #[test]
    fn test_top_level_subroutines() {
        let top = TopLevel::new(
            Block::new(vec![
                Node::SubroutineCall { name: "later".to_string(), line: 0 },
                command("main"),
            ]),
            vec![subroutine("later", 2, vec![command("in later")])],
        );
        let (function, diagnostics) = compile(&top);

        assert!(diagnostics.is_empty());
        assert_eq!(function.instructions, vec![
            Instruction::SubroutineCall { target: 3 },
            Instruction::Plain("main"),
            Instruction::Branch { target: EXIT_TARGET },
            Instruction::Plain("in later"),
            Instruction::SubroutineReturn,
        ]);
    }

    #[test]
    fn test_no_exit_without_subroutines() {
        let top = TopLevel::new(Block::new(vec![command("a")]), Vec::new());
        let (function, _) = compile(&top);
        assert_eq!(function.instructions, vec![Instruction::Plain("a")]);
    }

    #[test]
    fn test_duplicate_subroutine_keeps_first() {
        let top = TopLevel::new(
            Block::new(vec![Node::SubroutineCall { name: "foo".to_string(), line: 0 }]),
            vec![
                subroutine("foo", 2, vec![command("first")]),
                subroutine("foo", 6, vec![command("second")]),
            ],
        );
        let (function, diagnostics) = compile(&top);

        let errors: Vec<_> = diagnostics.iter().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 6);
        assert_eq!(
            errors[0].message,
            "re-definition of subroutine 'foo' (previously defined on line 3)"
        );

        assert_eq!(function.get(0), Some(&Instruction::SubroutineCall { target: 2 }));
        assert_eq!(function.get(2), Some(&Instruction::Plain("first")));
        assert!(!function.instructions.contains(&Instruction::Plain("second")));
    }

    #[test]
    fn test_unknown_subroutine_call() {
        let top = TopLevel::new(
            Block::new(vec![Node::SubroutineCall { name: "ghost".to_string(), line: 4 }]),
            Vec::new(),
        );
        let (function, diagnostics) = compile(&top);

        assert!(function.is_empty());
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.iter().next().map(|d| d.message.as_str()),
            Some("subroutine 'ghost' not defined")
        );
    }

    #[test]
    fn test_dump() {
        let top = TopLevel::new(
            Block::new(vec![
                Node::Loop(iteration("sel", vec![command("x"), Node::Exit])),
                Node::SubroutineCall { name: "foo".to_string(), line: 1 },
            ]),
            vec![subroutine("foo", 3, vec![Node::SubroutineReturn])],
        );

        assert_eq!(dump(&top), [
            "TopLevel",
            "  Block",
            "    Loop[\"sel\"]",
            "      Block",
            "        Command[\"x\"]",
            "        Exit",
            "    SubroutineCall[foo]",
            "  SubroutineDefinition[foo]",
            "    Block",
            "      SubroutineReturn",
            "",
        ].join("\n"));
    }
}
