//! Recursive-descent statement parser.
//!
//! Each logical line is dispatched on its leading keyword through a
//! [`StatementTable`]. A handler either produces a node, consumes the line
//! without producing one, or falls through to the host command grammar.
//! Handlers may be gated by a feature predicate; a gated-off keyword gets a
//! warning and is then parsed as an ordinary command.

pub mod base;
pub mod control_flow;
pub mod subroutine;

use crate::ast::{Block, Node, SubroutineDefinition, TopLevel};
use crate::diagnostic::Diagnostics;
use crate::features::FeatureSet;
use crate::lexer::leading_keyword;
use crate::lines::{LineCursor, SourceLine};
use cmdflow_core::CommandGrammar;
use std::collections::HashMap;

/// The line a handler is asked to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// 0-based physical line number
    pub line: usize,
    pub top_level: bool,
    pub in_subroutine: bool,
}

/// What a statement handler did with its line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<A> {
    /// Produced a node; the cursor is past the statement.
    Node(Node<A>),
    /// Consumed the line without producing a node.
    Consumed,
    /// Not this handler's form after all; the cursor has not moved.
    Fallthrough,
}

pub type HandlerFn<G> =
    fn(&mut Parser<'_, G>, &Statement) -> Outcome<<G as CommandGrammar>::Action>;

/// Feature predicate guarding a handler.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub enabled: fn(&FeatureSet) -> bool,
    /// Warning reported when the predicate fails.
    pub message: &'static str,
}

/// One registered statement form.
pub struct StatementHandler<G: CommandGrammar> {
    pub parse: HandlerFn<G>,
    pub gate: Option<Gate>,
}

impl<G: CommandGrammar> StatementHandler<G> {
    pub fn new(parse: HandlerFn<G>) -> Self {
        Self { parse, gate: None }
    }

    pub fn gated(parse: HandlerFn<G>, enabled: fn(&FeatureSet) -> bool, message: &'static str) -> Self {
        Self {
            parse,
            gate: Some(Gate { enabled, message }),
        }
    }
}

impl<G: CommandGrammar> Clone for StatementHandler<G> {
    fn clone(&self) -> Self {
        Self {
            parse: self.parse,
            gate: self.gate,
        }
    }
}

/// Keyword-to-handler dispatch table.
///
/// Built once, then only read while compiling.
pub struct StatementTable<G: CommandGrammar> {
    handlers: HashMap<String, StatementHandler<G>>,
}

impl<G: CommandGrammar> StatementTable<G> {
    /// A table with no statement forms; every line is a command.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The built-in statement forms.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        base::register(&mut table);
        control_flow::register(&mut table);
        subroutine::register(&mut table);
        table
    }

    /// Register `handler` for `keyword`, replacing any previous one.
    pub fn register(&mut self, keyword: &str, handler: StatementHandler<G>) {
        self.handlers.insert(keyword.to_string(), handler);
    }

    pub fn get(&self, keyword: &str) -> Option<&StatementHandler<G>> {
        self.handlers.get(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.handlers.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<G: CommandGrammar> Default for StatementTable<G> {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Result of parsing a whole function.
#[derive(Debug, Clone)]
pub struct ParseOutput<A> {
    pub ast: TopLevel<A>,
    /// Feature flags as left by the last pragma.
    pub features: FeatureSet,
}

pub struct Parser<'c, G: CommandGrammar> {
    grammar: &'c G,
    statements: &'c StatementTable<G>,
    cursor: LineCursor,
    diagnostics: &'c mut Diagnostics,
    features: FeatureSet,
}

impl<'c, G: CommandGrammar> Parser<'c, G> {
    pub fn new(
        grammar: &'c G,
        statements: &'c StatementTable<G>,
        lines: Vec<SourceLine>,
        diagnostics: &'c mut Diagnostics,
        features: FeatureSet,
    ) -> Self {
        Self {
            grammar,
            statements,
            cursor: LineCursor::new(lines),
            diagnostics,
            features,
        }
    }

    pub fn grammar(&self) -> &'c G {
        self.grammar
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut *self.diagnostics
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut FeatureSet {
        &mut self.features
    }

    /// Move past the current line. Handlers call this once they have
    /// committed to a statement.
    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Parse the whole input, hoisting top-level subroutine definitions out
    /// of the main body.
    pub fn parse_top_level(mut self) -> ParseOutput<G::Action> {
        let mut children = Vec::new();
        let mut subroutines: Vec<SubroutineDefinition<G::Action>> = Vec::new();

        while !self.cursor.is_at_end() {
            match self.parse_statement(true, false) {
                Some(Node::SubroutineDefinition(definition)) => subroutines.push(definition),
                Some(node) => children.push(node),
                None => {}
            }
        }

        tracing::debug!(
            statements = children.len(),
            subroutines = subroutines.len(),
            "parsed top level"
        );

        ParseOutput {
            ast: TopLevel::new(Block::new(children), subroutines),
            features: self.features,
        }
    }

    /// Parse statements until a line equal to `terminator` (consumed) or
    /// end of input. Running out of input reports `unclosed` at
    /// `opened_at` and returns what was parsed so far.
    pub fn parse_block(
        &mut self,
        opened_at: usize,
        terminator: &str,
        unclosed: &str,
        in_subroutine: bool,
    ) -> Block<G::Action> {
        let mut children = Vec::new();

        while let Some(current) = self.cursor.current() {
            if current.text == terminator {
                self.cursor.advance();
                return Block::new(children);
            }

            if let Some(node) = self.parse_statement(false, in_subroutine) {
                children.push(node);
            }
        }

        self.diagnostics.error(opened_at, unclosed);
        Block::new(children)
    }

    /// Parse exactly one logical line. Returns `None` at end of input, for
    /// lines that produce no node, and for lines that failed to parse.
    pub fn parse_statement(&mut self, top_level: bool, in_subroutine: bool) -> Option<Node<G::Action>> {
        let current = self.cursor.current()?;
        let statement = Statement {
            text: current.text.clone(),
            line: current.number,
            top_level,
            in_subroutine,
        };
        let start = self.cursor.position();
        let keyword = leading_keyword(&statement.text).unwrap_or_default();

        let statements = self.statements;
        if let Some(handler) = statements.get(keyword) {
            match handler.gate {
                Some(gate) if !(gate.enabled)(&self.features) => {
                    self.diagnostics.warning(statement.line, gate.message);
                }
                _ => match (handler.parse)(self, &statement) {
                    Outcome::Node(node) => {
                        self.assert_advanced(start, keyword);
                        return Some(node);
                    }
                    Outcome::Consumed => {
                        self.assert_advanced(start, keyword);
                        return None;
                    }
                    Outcome::Fallthrough => {
                        if self.cursor.position() != start {
                            panic!(
                                "internal error: handler for '{}' advanced the cursor and fell through",
                                keyword
                            );
                        }
                    }
                },
            }
        }

        self.parse_command(&statement)
    }

    /// Hand `statement` to the host grammar as a plain command.
    pub fn parse_command(&mut self, statement: &Statement) -> Option<Node<G::Action>> {
        self.cursor.advance();

        match self.grammar.parse_command(&statement.text) {
            Ok(action) => Some(Node::Command(action)),
            Err(err) => {
                self.diagnostics
                    .error(statement.line, format!("failed to parse command: {}", err));
                None
            }
        }
    }

    fn assert_advanced(&self, start: usize, keyword: &str) {
        if self.cursor.position() <= start {
            panic!("internal error: parser failed to advance past '{}'", keyword);
        }
    }
}
